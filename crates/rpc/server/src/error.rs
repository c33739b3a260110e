//! Errors returned by the HTTP surface.

use std::{io, net::SocketAddr};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hyrule_net_transport::TransportError;
use hyrule_primitives::FingerprintParseError;
use hyrule_storage::StoreError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(#[from] FingerprintParseError),

    #[error("missing query parameter `{0}`")]
    MissingParam(&'static str),

    #[error("object not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("malformed request body: {0}")]
    Decode(#[from] postcard::Error),

    #[error("failed to encode response: {0}")]
    Encode(#[source] postcard::Error),

    #[error(transparent)]
    Peer(#[from] TransportError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

impl RpcError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidFingerprint(_) | Self::MissingParam(_) | Self::Decode(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Store(StoreError::CapacityExceeded { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Store(StoreError::InsufficientSpace { .. }) => StatusCode::INSUFFICIENT_STORAGE,
            Self::Store(StoreError::InvalidObject(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Peer(TransportError::Remote { .. }) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Encode(_) | Self::Peer(_) | Self::Bind { .. } | Self::Serve(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
