//! Proxy CLI arguments.

use clap::Args;

#[derive(Debug, Args, Clone, Default)]
#[command(next_help_heading = "Proxy")]
pub struct ProxyArgs {
    /// Route every outbound peer request through a SOCKS5 proxy.
    #[arg(long)]
    pub enable_proxy: bool,

    /// SOCKS5 proxy address.
    #[arg(long, value_name = "ADDR")]
    pub proxy_addr: Option<String>,
}
