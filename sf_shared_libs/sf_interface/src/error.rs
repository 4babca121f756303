use std::io;

use thiserror::Error;

/// Errors raised by the serial forwarder connection and its helpers
#[derive(Debug, Error)]
pub enum SfError {
    #[error("invalid connection string '{input}': {reason}")]
    ConnectionString { input: String, reason: String },
    #[error("unable to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("handshake with serial forwarder failed: {0}")]
    Handshake(String),
    #[error("already connected")]
    AlreadyConnected,
    #[error("not connected")]
    NotConnected,
    #[error("unable to encode packet: {0}")]
    Encode(#[source] io::Error),
    #[error("send failed: {0}")]
    Send(String),
}

impl SfError {
    pub(crate) fn connection_string(input: &str, reason: impl Into<String>) -> Self {
        SfError::ConnectionString {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
