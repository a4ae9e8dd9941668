use thiserror::Error;

#[derive(Debug, Error)]
pub enum SortError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SortError>;
