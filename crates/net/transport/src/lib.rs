//! Peer-to-peer transport for the storage node.
//!
//! The wire protocol has four requests, described in [`protocol`]:
//! handshake, manifest, fetch and push. [`PeerTransport`] is the outbound
//! side and [`PeerService`] the inbound side. Two transports are provided:
//!
//! - [`HttpTransport`] - postcard over HTTP, optionally through a SOCKS5 proxy
//! - [`MemoryNetwork`] - in-process routing with fault injection, for tests
//!
//! [`TimeoutTransport`] bounds every call of any transport.

mod error;
mod http;
pub mod memory;
pub mod protocol;
mod timeout;
mod traits;

pub use error::{TransportError, TransportResult};
pub use http::{HttpTransport, HttpTransportConfig};
pub use memory::MemoryNetwork;
pub use protocol::{FetchResponse, HandshakeRequest, HandshakeResponse, PushResponse, RejectReason};
pub use timeout::TimeoutTransport;
pub use traits::{PeerService, PeerTransport};
