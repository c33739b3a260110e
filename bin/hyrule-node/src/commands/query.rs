//! `hyrule-node status` and `hyrule-node repos`: query a running node.

use eyre::{Result, WrapErr, bail};
use hyrule_rpc_server::{NodeStatus, RepoSummary};
use serde::de::DeserializeOwned;

use crate::cli::QueryArgs;

async fn get<T: DeserializeOwned>(args: &QueryArgs, path: &str) -> Result<T> {
    let url = format!("{}{path}", args.node.trim_end_matches('/'));
    let response = reqwest::get(&url)
        .await
        .wrap_err_with(|| format!("failed to reach {url}"))?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        bail!("{url} returned {status}: {body}");
    }
    serde_json::from_str(&body).wrap_err_with(|| format!("unexpected response from {url}"))
}

pub(crate) async fn status(args: &QueryArgs) -> Result<()> {
    let status: NodeStatus = get(args, "/status").await?;

    println!("node      {} ({})", status.node_id, status.role);
    println!("address   {}", status.address);
    println!("version   {} (up {}s)", status.version, status.uptime_secs);
    println!(
        "storage   {} objects, {} bytes, {:.1}% of {}",
        status.objects, status.bytes_used, status.percent_used, status.capacity
    );
    println!("manifest  v{}", status.manifest_version);
    println!("proxy     {}", if status.proxy_enabled { "on" } else { "off" });
    println!("peers     {}", status.peer_count);
    for peer in &status.peers {
        println!(
            "  {} {} {} v{} {}",
            peer.id, peer.address, peer.role, peer.manifest_version, peer.sync_state
        );
    }
    Ok(())
}

pub(crate) async fn repos(args: &QueryArgs) -> Result<()> {
    let repos: Vec<RepoSummary> = get(args, "/repos").await?;
    if repos.is_empty() {
        println!("no repositories stored");
    }
    for repo in repos {
        println!("{}  {} objects", repo.repo, repo.objects);
    }
    Ok(())
}
