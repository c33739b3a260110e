//! HTTP server for Hyrule nodes.
//!
//! One listener serves two surfaces:
//!
//! - the status API (`/status`, `/health`, `/repos`, object endpoints), JSON
//!   or raw payloads, backed by a [`NodeApi`]
//! - the peer protocol under `/peer`, postcard-encoded, backed by a
//!   [`PeerService`](hyrule_net_transport::PeerService)

mod api;
mod error;
mod handlers;
mod peer;
mod server;

pub use api::{NodeApi, NodeStatus, PeerStatus, PutObjectResponse, RepoObjects, RepoSummary};
pub use error::RpcError;
pub use server::{MAX_BODY_BYTES, RpcServer};
