//! Peer protocol endpoints.
//!
//! Bodies are postcard in both directions, mirroring
//! [`HttpTransport`](hyrule_net_transport::HttpTransport).

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use hyrule_net_transport::{HandshakeRequest, PeerService, protocol};
use hyrule_primitives::{Fingerprint, RepositoryObject};
use serde::Serialize;
use tracing::trace;

use crate::RpcError;

pub(crate) type PeerState = Arc<dyn PeerService>;

fn encode<T: Serialize>(value: &T) -> Result<Response, RpcError> {
    let body = postcard::to_allocvec(value).map_err(RpcError::Encode)?;
    Ok(([(header::CONTENT_TYPE, protocol::CONTENT_TYPE)], body).into_response())
}

pub(crate) async fn handshake(
    State(service): State<PeerState>,
    body: Bytes,
) -> Result<Response, RpcError> {
    let request: HandshakeRequest = postcard::from_bytes(&body)?;
    trace!(peer = %request.info.id, address = %request.info.address, "Handshake request");
    encode(&service.handshake(request.info).await?)
}

pub(crate) async fn manifest(State(service): State<PeerState>) -> Result<Response, RpcError> {
    encode(&service.manifest().await?)
}

pub(crate) async fn fetch(
    State(service): State<PeerState>,
    Path(fingerprint): Path<String>,
) -> Result<Response, RpcError> {
    let fingerprint: Fingerprint = fingerprint.parse()?;
    encode(&service.fetch(fingerprint).await?)
}

pub(crate) async fn push(
    State(service): State<PeerState>,
    body: Bytes,
) -> Result<Response, RpcError> {
    let object: RepositoryObject = postcard::from_bytes(&body)?;
    trace!(fingerprint = %object.fingerprint(), size = object.size(), "Push request");
    encode(&service.push(object).await?)
}
