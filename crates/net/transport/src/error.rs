//! Transport error types.

use std::time::Duration;

/// Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors from talking to a peer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The call did not complete in time.
    #[error("request to {addr} timed out after {after:?}")]
    Timeout { addr: String, after: Duration },

    /// Nothing answered at the address.
    #[error("peer {0} unreachable")]
    Unreachable(String),

    /// The connection or HTTP exchange failed.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// The peer answered with an error.
    #[error("peer {addr} returned error: {message}")]
    Remote { addr: String, message: String },

    /// A message could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<postcard::Error> for TransportError {
    fn from(err: postcard::Error) -> Self {
        TransportError::Codec(err.to_string())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            TransportError::Unreachable(
                err.url().map(|u| u.to_string()).unwrap_or_default(),
            )
        } else {
            TransportError::TransportFailure(err.to_string())
        }
    }
}
