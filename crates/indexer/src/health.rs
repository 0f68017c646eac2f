use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const HEALTH_FILE_NAME: &str = "health.json";
const MAX_ALERT_LOG_ENTRIES: usize = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexingState {
    Idle,
    InProgress,
    Failed,
}

/// Persisted indexer health, read by `getIndexStatus` and updated after
/// every indexing run, reindex, or watcher-driven delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub state: IndexingState,
    pub last_success_unix_ms: Option<u64>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub last_duration_ms: Option<u64>,
    #[serde(default)]
    pub alert_log: Vec<String>,
}

impl Default for HealthSnapshot {
    fn default() -> Self {
        Self {
            state: IndexingState::Idle,
            last_success_unix_ms: None,
            last_error: None,
            consecutive_failures: 0,
            last_duration_ms: None,
            alert_log: Vec::new(),
        }
    }
}

impl HealthSnapshot {
    pub fn record_success(&mut self, duration_ms: u64) {
        self.state = IndexingState::Idle;
        self.last_success_unix_ms = Some(unix_now_ms());
        self.last_error = None;
        self.consecutive_failures = 0;
        self.last_duration_ms = Some(duration_ms);
    }

    pub fn record_failure(&mut self, reason: impl Into<String>) {
        self.state = IndexingState::Failed;
        self.consecutive_failures += 1;
        append_failure_reason(&mut self.alert_log, reason.into());
        self.last_error = self.alert_log.last().cloned();
    }
}

/// Pushes a failure message onto the bounded alert log, dropping the
/// oldest entries once [`MAX_ALERT_LOG_ENTRIES`] is exceeded.
pub fn append_failure_reason(log: &mut Vec<String>, reason: String) {
    log.push(reason);
    if log.len() > MAX_ALERT_LOG_ENTRIES {
        let overflow = log.len() - MAX_ALERT_LOG_ENTRIES;
        log.drain(0..overflow);
    }
}

#[must_use]
pub fn health_file_path(store_dir: &Path) -> PathBuf {
    store_dir.join(HEALTH_FILE_NAME)
}

pub async fn write_health_snapshot(store_dir: &Path, snapshot: &HealthSnapshot) -> Result<()> {
    tokio::fs::create_dir_all(store_dir).await?;
    let path = health_file_path(store_dir);
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?).await?;
    tokio::fs::rename(&tmp, &path).await?;
    Ok(())
}

pub async fn read_health_snapshot(store_dir: &Path) -> Result<HealthSnapshot> {
    let path = health_file_path(store_dir);
    if !path.exists() {
        return Ok(HealthSnapshot::default());
    }
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes).unwrap_or_default()),
        Err(_) => Ok(HealthSnapshot::default()),
    }
}

fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_log_is_bounded() {
        let mut log = Vec::new();
        for i in 0..(MAX_ALERT_LOG_ENTRIES + 10) {
            append_failure_reason(&mut log, format!("err-{i}"));
        }
        assert_eq!(log.len(), MAX_ALERT_LOG_ENTRIES);
        assert_eq!(log.last().unwrap(), &format!("err-{}", MAX_ALERT_LOG_ENTRIES + 9));
    }

    #[tokio::test]
    async fn round_trips_snapshot_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut snapshot = HealthSnapshot::default();
        snapshot.record_success(123);
        write_health_snapshot(dir.path(), &snapshot).await.unwrap();

        let loaded = read_health_snapshot(dir.path()).await.unwrap();
        assert_eq!(loaded.last_duration_ms, Some(123));
        assert_eq!(loaded.state, IndexingState::Idle);
    }
}
