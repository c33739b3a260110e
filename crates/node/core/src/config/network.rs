//! Network configuration for TOML persistence.

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::constants::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Listening address
    #[serde(default = "default_addr")]
    pub addr: IpAddr,

    /// Listening port for the HTTP API and peer RPC
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address advertised to peers (default: 127.0.0.1:<port>)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertise_addr: Option<String>,

    /// Whether this node is an anchor
    #[serde(default)]
    pub anchor: bool,

    /// Anchor to bootstrap from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_addr: Option<String>,

    /// Timeout for one outbound peer request, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
            advertise_addr: None,
            anchor: false,
            anchor_addr: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_addr() -> IpAddr {
    DEFAULT_LISTEN_ADDR
        .parse()
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// SOCKS5 proxy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Route outbound peer requests through the proxy
    #[serde(default)]
    pub enabled: bool,

    /// Proxy address
    #[serde(default = "default_proxy_addr")]
    pub addr: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_proxy_addr(),
        }
    }
}

fn default_proxy_addr() -> String {
    DEFAULT_PROXY_ADDR.to_string()
}
