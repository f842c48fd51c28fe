use kainet_crypto::CryptoError;
use thiserror::Error;

/// Failures talking to the message store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store rejected request: {0}")]
    Service(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Unexpected store response: {0}")]
    Protocol(String),

    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Not connected")]
    Disconnected,
}
