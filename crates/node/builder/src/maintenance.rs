//! Periodic store maintenance: integrity checks and the usage monitor.

use std::{sync::Arc, time::Duration};

use hyrule_node_core::constants::{STORAGE_CRITICAL_PERCENT, STORAGE_WARN_PERCENT};
use hyrule_storage::{ContentStore, StoreResult, VerifyReport};
use hyrule_tasks::Shutdown;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

/// How full the store is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum UsageLevel {
    Normal,
    /// Above the warning threshold.
    High,
    /// Above the critical threshold.
    Critical,
}

impl UsageLevel {
    pub fn of(percent_used: f64) -> Self {
        if percent_used > STORAGE_CRITICAL_PERCENT {
            Self::Critical
        } else if percent_used > STORAGE_WARN_PERCENT {
            Self::High
        } else {
            Self::Normal
        }
    }
}

/// Verify every object and drop the ones that failed, so sync can fetch
/// intact copies again.
pub fn check_integrity(store: &ContentStore) -> StoreResult<VerifyReport> {
    let report = store.verify()?;
    if report.is_clean() {
        debug!(checked = report.checked, "Integrity check passed");
        return Ok(report);
    }

    warn!(
        checked = report.checked,
        corrupted = report.corrupted.len(),
        missing = report.missing.len(),
        "Integrity check found damaged objects"
    );
    let purged = store.purge(&report)?;
    info!(purged, "Dropped damaged objects");
    Ok(report)
}

fn report_usage(store: &ContentStore) -> UsageLevel {
    let stats = store.stats();
    let percent = stats.percent_used();
    let level = UsageLevel::of(percent);
    match level {
        UsageLevel::Critical => error!(
            percent = format_args!("{percent:.1}"),
            used = stats.used,
            budget = %stats.budget,
            "Storage almost full"
        ),
        UsageLevel::High => warn!(
            percent = format_args!("{percent:.1}"),
            used = stats.used,
            budget = %stats.budget,
            "Storage usage high"
        ),
        UsageLevel::Normal => debug!(percent = format_args!("{percent:.1}"), "Storage usage"),
    }
    level
}

pub(crate) async fn run_integrity_checks(
    store: Arc<ContentStore>,
    every: Duration,
    shutdown: Shutdown,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(err) = check_integrity(&store) {
                    error!(error = %err, "Integrity check failed");
                }
            }
        }
    }
}

pub(crate) async fn run_storage_monitor(
    store: Arc<ContentStore>,
    every: Duration,
    shutdown: Shutdown,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                report_usage(&store);
            }
        }
    }
}
