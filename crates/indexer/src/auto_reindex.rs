use crate::integrity::{check_drift, reconcile};
use crate::manager::IndexManager;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy)]
pub struct AutoReindexConfig {
    pub enabled: bool,
    pub check_every_n_searches: u64,
    pub max_auto_reindex_files: usize,
    pub staleness_threshold: Duration,
}

impl Default for AutoReindexConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_every_n_searches: 10,
            max_auto_reindex_files: 5,
            staleness_threshold: Duration::from_secs(5 * 60),
        }
    }
}

/// Invoked at the start of every search. Drift checks are gated both by a
/// search counter and by a minimum wall-clock gap, so a burst of queries
/// never runs more than one scan per [`AutoReindexConfig::staleness_threshold`].
pub struct AutoReindexer {
    config: AutoReindexConfig,
    searches: AtomicU64,
    last_check: Mutex<Option<Instant>>,
}

impl AutoReindexer {
    #[must_use]
    pub fn new(config: AutoReindexConfig) -> Self {
        Self {
            config,
            searches: AtomicU64::new(0),
            last_check: Mutex::new(None),
        }
    }

    /// Call before running a search's retrieval step. Never blocks the
    /// search on a reindex it chooses not to perform; a drift count above
    /// `maxAutoReindexFiles` is logged and the search proceeds unchanged.
    pub async fn before_search(&self, manager: &IndexManager) {
        if !self.config.enabled {
            return;
        }
        let count = self.searches.fetch_add(1, Ordering::SeqCst) + 1;
        if count % self.config.check_every_n_searches != 0 {
            return;
        }

        {
            let mut last_check = self.last_check.lock().await;
            let now = Instant::now();
            if let Some(previous) = *last_check {
                if now.duration_since(previous) < self.config.staleness_threshold {
                    return;
                }
            }
            *last_check = Some(now);
        }

        match check_drift(manager).await {
            Ok(report) if report.in_sync => {}
            Ok(report) if report.drift_count() <= self.config.max_auto_reindex_files => {
                log::info!("auto-reindexing {} drifted file(s) before search", report.drift_count());
                if let Err(e) = reconcile(manager, report).await {
                    log::warn!("auto-reindex reconcile failed: {e}");
                }
            }
            Ok(report) => {
                log::info!(
                    "skipping auto-reindex: {} drifted file(s) exceeds the {} auto-reindex ceiling",
                    report.drift_count(),
                    self.config.max_auto_reindex_files
                );
            }
            Err(e) => log::warn!("auto-reindex drift check failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gating_skips_checks_between_the_configured_cadence() {
        let config = AutoReindexConfig { check_every_n_searches: 10, ..Default::default() };
        for n in 1..10_u64 {
            assert_ne!(n % config.check_every_n_searches, 0);
        }
        assert_eq!(10_u64 % config.check_every_n_searches, 0);
    }
}
