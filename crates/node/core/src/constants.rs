//! Constants used throughout the Hyrule node.
//!
//! All magic numbers and default values should be defined here or at the top
//! of specific modules if they are tightly coupled to that module's logic.

// =============================================================================
// Version
// =============================================================================

/// Crate version, reported by `/status`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Network
// =============================================================================

/// Default HTTP port, serving both the status API and peer RPC.
pub const DEFAULT_PORT: u16 = 8080;

/// Default listen address (all interfaces).
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0";

/// Default timeout for a single outbound peer request in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default SOCKS5 proxy (a local Tor daemon).
pub const DEFAULT_PROXY_ADDR: &str = "127.0.0.1:9050";

// =============================================================================
// Discovery
// =============================================================================

/// Default time between discovery rounds in seconds.
pub const DEFAULT_DISCOVERY_INTERVAL_SECS: u64 = 30;

pub use hyrule_net_discovery::DEFAULT_FANOUT;

/// Default time after which a silent peer is dropped, in seconds.
pub const DEFAULT_LIVENESS_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// Sync
// =============================================================================

/// Default time between sync rounds in seconds.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;

/// Default object transfers in flight per peer.
pub const DEFAULT_MAX_CONCURRENT_TRANSFERS: usize = 10;

/// Default number of peers synced at once.
pub const DEFAULT_MAX_CONCURRENT_PEERS: usize = 4;

// =============================================================================
// Storage
// =============================================================================

/// Default storage directory.
pub const DEFAULT_STORAGE_PATH: &str = "node-storage";

/// Default capacity budget in GiB.
pub const DEFAULT_CAPACITY_GIB: u64 = 10;

/// Database file inside the storage directory.
pub const DB_FILE_NAME: &str = "objects.redb";

// =============================================================================
// Maintenance
// =============================================================================

/// Default time between integrity checks in seconds.
pub const DEFAULT_VERIFY_INTERVAL_SECS: u64 = 3600;

/// Default time between storage usage checks in seconds.
pub const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 300;

/// Usage above which the storage monitor warns.
pub const STORAGE_WARN_PERCENT: f64 = 80.0;

/// Usage above which the storage monitor logs an error.
pub const STORAGE_CRITICAL_PERCENT: f64 = 90.0;

// =============================================================================
// File System
// =============================================================================

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "hyrule-node.toml";
