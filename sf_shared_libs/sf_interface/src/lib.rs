use std::future::Future;

use message_structure::AmMsg;

pub mod connection;
pub mod connection_string;
pub mod dispatcher;
pub mod error;

pub use connection::{ConnectionState, SfConnection};
pub use connection_string::parse_sf_connection_string;
pub use dispatcher::{Dispatcher, MessageDispatcher};
pub use error::SfError;

/// Session trait to be implemented by connections that carry AM packets to a gateway.
/// All methods take &self so one session can be shared between tasks, e.g. to
/// disconnect from a spawned task while another keeps polling connected().
pub trait Session: Send + Sync + 'static {
    /// Open the transport and perform any protocol handshake
    fn connect(&self, host: &str, port: u16) -> impl Future<Output = Result<(), SfError>> + Send;
    /// Submit a packet. Returns once the packet is accepted for transmission.
    fn send(&self, msg: &AmMsg) -> impl Future<Output = Result<(), SfError>> + Send;
    /// True until a disconnect has completed or the peer went away
    fn connected(&self) -> bool;
    /// Flush what was accepted and close. Safe to call repeatedly and concurrently.
    fn disconnect(&self) -> impl Future<Output = ()> + Send;
}
