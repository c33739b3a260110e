//! Network CLI arguments.

use std::net::IpAddr;

use clap::Args;

/// Listening, addressing and anchor settings.
#[derive(Debug, Args, Clone, Default)]
#[command(next_help_heading = "Networking")]
pub struct NetworkArgs {
    /// Port for the HTTP API and peer RPC.
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Address to listen on.
    #[arg(long = "listen-addr", value_name = "IP")]
    pub addr: Option<IpAddr>,

    /// Address other peers use to reach this node (`host:port` or an onion
    /// address). Defaults to `127.0.0.1:<port>`.
    #[arg(long, value_name = "ADDR")]
    pub advertise_addr: Option<String>,

    /// Run as an anchor: the well-known entry point new peers bootstrap from.
    #[arg(long)]
    pub anchor: bool,

    /// Anchor to bootstrap from.
    #[arg(long, value_name = "ADDR", conflicts_with = "anchor")]
    pub anchor_addr: Option<String>,

    /// Timeout for a single peer request, in seconds.
    #[arg(long, value_name = "SECS")]
    pub request_timeout: Option<u64>,
}
