use crate::fingerprints::FileDelta;
use crate::health::{self, IndexingState};
use crate::manager::IndexManager;
use crate::stats::IndexStats;
use crate::Result;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const SCAN_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_STARTUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct DriftReport {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
    pub in_sync: bool,
    pub last_checked_unix_ms: u64,
}

impl DriftReport {
    #[must_use]
    pub fn drift_count(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }
}

/// Compares the persisted fingerprints against freshly hashed bytes on disk.
/// The scan itself is bounded by [`SCAN_TIMEOUT`]; a timed-out scan reports
/// no drift rather than leaving an orphaned background task, since the next
/// invocation will simply re-scan.
pub async fn check_drift(manager: &IndexManager) -> Result<DriftReport> {
    let delta = match tokio::time::timeout(SCAN_TIMEOUT, manager.compute_delta()).await {
        Ok(result) => result?,
        Err(_) => {
            log::warn!("integrity scan for {} timed out after {SCAN_TIMEOUT:?}", manager.root().display());
            FileDelta::default()
        }
    };
    let in_sync = delta.added.is_empty() && delta.modified.is_empty() && delta.removed.is_empty();
    Ok(DriftReport {
        added: delta.added,
        modified: delta.modified,
        removed: delta.removed,
        in_sync,
        last_checked_unix_ms: unix_now_ms(),
    })
}

pub async fn reconcile(manager: &IndexManager, report: DriftReport) -> Result<IndexStats> {
    manager
        .apply_delta(FileDelta {
            added: report.added,
            modified: report.modified,
            removed: report.removed,
        })
        .await
}

/// Runs in the background without blocking the RPC surface. Refuses to run
/// while an index is already in progress, since `checkDrift`'s filesystem
/// scan would race the writer the indexing run already holds.
pub fn spawn_startup_check(manager: Arc<IndexManager>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(DEFAULT_STARTUP_INTERVAL);
        loop {
            ticker.tick().await;
            let snapshot = health::read_health_snapshot(manager.store_dir()).await.unwrap_or_default();
            if snapshot.state == IndexingState::InProgress {
                log::debug!("skipping periodic integrity check: indexing already in progress");
                continue;
            }
            match check_drift(&manager).await {
                Ok(report) if !report.in_sync => {
                    log::info!("periodic integrity check found {} drifted file(s)", report.drift_count());
                    if let Err(e) = reconcile(&manager, report).await {
                        log::warn!("periodic integrity reconcile failed: {e}");
                    }
                }
                Ok(_) => {}
                Err(e) => log::warn!("periodic integrity check failed: {e}"),
            }
        }
    })
}

fn unix_now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drift_count_sums_all_three_buckets() {
        let report = DriftReport {
            added: vec!["a".into()],
            modified: vec!["b".into(), "c".into()],
            removed: vec![],
            in_sync: false,
            last_checked_unix_ms: 0,
        };
        assert_eq!(report.drift_count(), 3);
    }
}
