//! Node assembly.
//!
//! [`NodeBuilder`] turns a [`NodeConfig`](hyrule_node_core::NodeConfig) into a
//! [`Node`]: a content store, a membership table, and the discovery and sync
//! services sharing one transport. [`Node::launch`] spawns the background
//! loops and the HTTP server and returns a [`NodeHandle`].

mod components;
mod handle;
mod maintenance;
mod node;
mod service;

pub use components::NodeComponents;
pub use handle::NodeHandle;
pub use maintenance::{UsageLevel, check_integrity};
pub use node::{Node, NodeBuilder};
pub use service::NodeService;
