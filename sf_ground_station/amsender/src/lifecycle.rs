/*
Connect, send one packet, then wait for the session to wind down.

The shutdown loop wakes every poll interval. While the session still reports
connected it starts a disconnect in a separate task and keeps polling, so a slow
disconnect never holds up the loop; once connected() is false the loop exits.
A termination signal ends the loop at once after an inline disconnect. A second
signal while that disconnect is stuck abandons it.

    Polling --tick, still connected--> Draining --tick, still connected--> Draining
    Polling/Draining --tick, not connected--> Exiting
    Polling/Draining --signal--> Exiting
*/

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use message_structure::AmMsg;
use sf_interface::{Dispatcher, Session, SfError};

use crate::error::AppError;
use crate::packet_builder::{build_packet, PacketFields};
use crate::shutdown::{ShutdownListener, ShutdownSignal};

pub const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Polling,
    Draining,
    Exiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Disconnected,
    Signalled(ShutdownSignal),
    /// A second signal arrived before the inline disconnect finished
    Forced(ShutdownSignal),
}

/// How the shutdown loop ended and after how many poll intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownOutcome {
    pub reason: ShutdownReason,
    pub ticks: u32,
}

impl fmt::Display for ShutdownOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.reason {
            ShutdownReason::Disconnected => write!(f, "disconnected after {} polls", self.ticks),
            ShutdownReason::Signalled(signal) => {
                write!(f, "stopped by {} after {} polls", signal, self.ticks)
            }
            ShutdownReason::Forced(signal) => {
                write!(f, "disconnect abandoned on {} after {} polls", signal, self.ticks)
            }
        }
    }
}

pub struct LifecycleManager<S: Session> {
    session: Arc<S>,
    poll_interval: Duration,
}

impl<S: Session> LifecycleManager<S> {
    pub fn new(session: Arc<S>) -> Self {
        LifecycleManager {
            session,
            poll_interval: SHUTDOWN_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub async fn connect(&self, host: &str, port: u16) -> Result<(), AppError> {
        self.session
            .connect(host, port)
            .await
            .map_err(|source| AppError::Connect {
                host: host.to_string(),
                port,
                source,
            })?;
        info!("connected to {}:{}", host, port);
        Ok(())
    }

    /// A failed send is logged and returned, the session stays up either way
    pub async fn send(&self, msg: AmMsg) -> Result<(), SfError> {
        match self.session.send(&msg).await {
            Ok(()) => {
                info!("sent {}", msg);
                Ok(())
            }
            Err(e) => {
                info!("send error {}", e);
                Err(e)
            }
        }
    }

    pub async fn run_shutdown_loop(&self, shutdown: &mut ShutdownListener) -> ShutdownOutcome {
        let mut state = ShutdownState::Polling;
        let mut ticks: u32 = 0;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {
                    ticks += 1;
                    if !self.session.connected() {
                        shutdown.stop();
                        transition(&mut state, ShutdownState::Exiting);
                        return ShutdownOutcome {
                            reason: ShutdownReason::Disconnected,
                            ticks,
                        };
                    }
                    if state == ShutdownState::Draining {
                        debug!("still connected after {} polls, disconnecting again", ticks);
                    }
                    transition(&mut state, ShutdownState::Draining);
                    let session = Arc::clone(&self.session);
                    tokio::spawn(async move { session.disconnect().await });
                }
                Some(signal) = shutdown.recv() => {
                    info!("signal {}", signal);
                    let reason = tokio::select! {
                        _ = self.session.disconnect() => ShutdownReason::Signalled(signal),
                        Some(again) = shutdown.recv() => {
                            info!("signal {} during disconnect, exiting without it", again);
                            ShutdownReason::Forced(again)
                        }
                    };
                    shutdown.stop();
                    transition(&mut state, ShutdownState::Exiting);
                    return ShutdownOutcome { reason, ticks };
                }
            }
        }
    }

    /// Whole tool run. `listen` is only called once the packet went out, so
    /// signals during connect keep their default behaviour.
    pub async fn run<D, F>(
        &self,
        host: &str,
        port: u16,
        dispatcher: &D,
        fields: PacketFields,
        listen: F,
    ) -> Result<ShutdownOutcome, AppError>
    where
        D: Dispatcher + ?Sized,
        F: FnOnce() -> ShutdownListener,
    {
        self.connect(host, port).await?;

        // already logged, teardown is the same either way
        let _ = self.send(build_packet(dispatcher, fields)).await;

        let mut shutdown = listen();
        Ok(self.run_shutdown_loop(&mut shutdown).await)
    }
}

fn transition(state: &mut ShutdownState, next: ShutdownState) {
    if *state != next {
        debug!("shutdown state {:?} -> {:?}", state, next);
        *state = next;
    }
}
