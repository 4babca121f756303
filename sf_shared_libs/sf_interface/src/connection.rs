/*
Serial forwarder client connection.

Once connected the connection owns two tasks:
    - writer: drains queued frames onto the socket, then half-closes it when the queue closes
    - reader: routes inbound frames to dispatchers and notices when the forwarder goes away

send() only queues a frame, disconnect() closes the queue and waits for the writer to
drain it. That wait can block for as long as the socket refuses to take the bytes.
*/
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use common::constants::{SF_HANDSHAKE_MAGIC, SF_PROTOCOL_VERSION};
use log::{debug, error, info, warn};
use message_structure::{serialize_msg, AmMsg};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::dispatcher::Dispatcher;
use crate::error::SfError;
use crate::Session;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of a connection. Only connect() leaves Disconnected again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Unconnected,
    Connected,
    /// Disconnect requested, queued frames are still being written
    Disconnecting,
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConnectionState::Unconnected => write!(f, "unconnected"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnecting => write!(f, "disconnecting"),
            ConnectionState::Disconnected => write!(f, "disconnected"),
        }
    }
}

type SharedState = Arc<Mutex<ConnectionState>>;
type SharedDispatchers = Arc<Mutex<HashMap<u8, Arc<dyn Dispatcher>>>>;

fn load_state(state: &SharedState) -> ConnectionState {
    *state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn store_state(state: &SharedState, new_state: ConnectionState) {
    let mut current = state.lock().unwrap_or_else(PoisonError::into_inner);
    if *current != new_state {
        debug!("connection {} -> {}", *current, new_state);
        *current = new_state;
    }
}

/// Handles owned while a socket is open
struct Link {
    frames: UnboundedSender<Vec<u8>>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

/// Client side of a serial forwarder session
pub struct SfConnection {
    state: SharedState,
    dispatchers: SharedDispatchers,
    link: tokio::sync::Mutex<Option<Link>>,
}

impl Default for SfConnection {
    fn default() -> Self {
        SfConnection::new()
    }
}

impl SfConnection {
    pub fn new() -> SfConnection {
        SfConnection {
            state: Arc::new(Mutex::new(ConnectionState::Unconnected)),
            dispatchers: Arc::new(Mutex::new(HashMap::new())),
            link: tokio::sync::Mutex::new(None),
        }
    }

    /// Register a dispatcher for inbound frames. Replaces any dispatcher with the same id.
    pub fn add_dispatcher(&self, dispatcher: Arc<dyn Dispatcher>) {
        let id = dispatcher.dispatch_id();
        let mut dispatchers = self
            .dispatchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if dispatchers.insert(id, dispatcher).is_some() {
            warn!("replacing dispatcher for dispatch id {:02X}", id);
        }
    }

    pub fn state(&self) -> ConnectionState {
        load_state(&self.state)
    }
}

impl Session for SfConnection {
    async fn connect(&self, host: &str, port: u16) -> Result<(), SfError> {
        let mut link = self.link.lock().await;
        if matches!(
            self.state(),
            ConnectionState::Connected | ConnectionState::Disconnecting
        ) {
            return Err(SfError::AlreadyConnected);
        }
        // leftovers from a link the forwarder closed on us
        if let Some(stale) = link.take() {
            stale.writer.abort();
            stale.reader.abort();
        }

        let mut stream =
            TcpStream::connect((host, port))
                .await
                .map_err(|source| SfError::Connect {
                    host: host.to_string(),
                    port,
                    source,
                })?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("could not set TCP_NODELAY: {}", e);
        }

        let version = timeout(HANDSHAKE_TIMEOUT, handshake(&mut stream))
            .await
            .map_err(|_| SfError::Handshake("timed out".to_string()))??;
        debug!(
            "handshake with {}:{} complete, protocol version {:02X}",
            host, port, version
        );

        let (read_half, write_half) = stream.into_split();
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        store_state(&self.state, ConnectionState::Connected);
        let writer = tokio::spawn(write_frames(frames_rx, write_half, self.state.clone()));
        let reader = tokio::spawn(read_frames(
            read_half,
            self.dispatchers.clone(),
            self.state.clone(),
        ));
        *link = Some(Link {
            frames: frames_tx,
            writer,
            reader,
        });
        Ok(())
    }

    async fn send(&self, msg: &AmMsg) -> Result<(), SfError> {
        // serialization caps the packet at one frame
        let frame = serialize_msg(msg).map_err(SfError::Encode)?;
        if self.state() != ConnectionState::Connected {
            return Err(SfError::NotConnected);
        }
        let link = self.link.lock().await;
        let link = link.as_ref().ok_or(SfError::NotConnected)?;
        link.frames
            .send(frame)
            .map_err(|_| SfError::Send("writer has stopped".to_string()))?;
        debug!("queued {}", msg);
        Ok(())
    }

    fn connected(&self) -> bool {
        matches!(
            self.state(),
            ConnectionState::Connected | ConnectionState::Disconnecting
        )
    }

    async fn disconnect(&self) {
        let mut link = self.link.lock().await;
        let Some(Link {
            frames,
            writer,
            reader,
        }) = link.take()
        else {
            return;
        };

        if self.state() == ConnectionState::Connected {
            store_state(&self.state, ConnectionState::Disconnecting);
        }
        // closing the queue lets the writer finish what is queued and exit
        drop(frames);
        if let Err(e) = writer.await {
            warn!("writer task ended abnormally: {}", e);
        }
        reader.abort();
        let _ = reader.await;

        store_state(&self.state, ConnectionState::Disconnected);
        info!("disconnected");
    }
}

/// Exchange greetings, returns the forwarder's protocol version
async fn handshake(stream: &mut TcpStream) -> Result<u8, SfError> {
    stream
        .write_all(&[SF_HANDSHAKE_MAGIC, SF_PROTOCOL_VERSION])
        .await
        .map_err(|e| SfError::Handshake(e.to_string()))?;
    let mut greeting = [0u8; 2];
    stream
        .read_exact(&mut greeting)
        .await
        .map_err(|e| SfError::Handshake(e.to_string()))?;
    if greeting[0] != SF_HANDSHAKE_MAGIC {
        return Err(SfError::Handshake(format!(
            "unexpected greeting {:02X}",
            greeting[0]
        )));
    }
    if greeting[1] < SF_PROTOCOL_VERSION {
        return Err(SfError::Handshake(format!(
            "unsupported protocol version {:02X}",
            greeting[1]
        )));
    }
    Ok(greeting[1])
}

async fn write_frames(
    mut frames: UnboundedReceiver<Vec<u8>>,
    mut stream: OwnedWriteHalf,
    state: SharedState,
) {
    while let Some(frame) = frames.recv().await {
        if let Err(e) = write_frame(&mut stream, &frame).await {
            error!("write failed: {}", e);
            store_state(&state, ConnectionState::Disconnected);
            return;
        }
        debug!("wrote {} byte frame", frame.len());
    }
    if let Err(e) = stream.shutdown().await {
        debug!("socket shutdown: {}", e);
    }
}

async fn write_frame(stream: &mut OwnedWriteHalf, frame: &[u8]) -> io::Result<()> {
    let mut buf = Vec::with_capacity(frame.len() + 1);
    buf.push(frame.len() as u8);
    buf.extend_from_slice(frame);
    stream.write_all(&buf).await?;
    stream.flush().await
}

async fn read_frames(mut stream: OwnedReadHalf, dispatchers: SharedDispatchers, state: SharedState) {
    loop {
        match read_frame(&mut stream).await {
            Ok(Some(frame)) => route_frame(&dispatchers, &frame),
            Ok(None) => {
                info!("connection closed by serial forwarder");
                break;
            }
            Err(e) => {
                warn!("read failed: {}", e);
                break;
            }
        }
    }
    store_state(&state, ConnectionState::Disconnected);
}

/// Ok(None) on a clean end of stream between frames
async fn read_frame(stream: &mut OwnedReadHalf) -> io::Result<Option<Vec<u8>>> {
    let len = match stream.read_u8().await {
        Ok(len) => len,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut frame = vec![0u8; len as usize];
    stream.read_exact(&mut frame).await?;
    Ok(Some(frame))
}

fn route_frame(dispatchers: &SharedDispatchers, frame: &[u8]) {
    let Some(&dispatch_id) = frame.first() else {
        debug!("ignoring empty frame");
        return;
    };
    let dispatcher = dispatchers
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&dispatch_id)
        .cloned();
    match dispatcher {
        Some(dispatcher) => {
            if let Err(e) = dispatcher.receive(frame) {
                warn!("dispatcher {:02X} rejected frame: {}", dispatch_id, e);
            }
        }
        None => debug!("no dispatcher for dispatch id {:02X}", dispatch_id),
    }
}
