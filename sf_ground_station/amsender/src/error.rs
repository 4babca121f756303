use logging::LoggingError;
use sf_interface::SfError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Argument(String),
    #[error(transparent)]
    ConnectionString(SfError),
    #[error("unable to connect to {host}:{port}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: SfError,
    },
    #[error(transparent)]
    Logging(#[from] LoggingError),
}
