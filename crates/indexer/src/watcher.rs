use crate::indexer::ProjectIndexer;
use crate::Result;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};

/// Files are coalesced for this long after their last write before a
/// reindex fires, so a save-in-progress editor doesn't trigger a reindex
/// per intermediate flush.
const DEBOUNCE: Duration = Duration::from_millis(500);
/// Upper bound on distinct paths awaiting debounce; past this the oldest
/// pending path is flushed immediately to bound memory under event storms.
const MAX_PENDING: usize = 10_000;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Upsert,
    Delete,
}

/// Watches a project tree and keeps a [`ProjectIndexer`] in sync via
/// debounced, coalesced filesystem events. `ignoreInitial`: the underlying
/// watch only reports events from the moment it starts, the initial full
/// index is always a separate, explicit call.
pub struct ProjectWatcher {
    root: PathBuf,
    indexer: Arc<ProjectIndexer>,
    pending: Arc<Mutex<HashMap<String, (PendingKind, Instant)>>>,
}

impl ProjectWatcher {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, indexer: Arc<ProjectIndexer>) -> Self {
        Self {
            root: root.into(),
            indexer,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Runs until the returned task is dropped or aborted. Restarts the
    /// underlying OS watcher with exponential backoff if it errors out
    /// (inotify limits hit, watched directory removed, and similar).
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut backoff = INITIAL_BACKOFF;
            loop {
                match self.clone().run_once().await {
                    Ok(()) => break,
                    Err(e) => {
                        log::warn!("watcher for {} failed ({e}), retrying in {backoff:?}", self.root.display());
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(MAX_BACKOFF);
                    }
                }
            }
        })
    }

    async fn run_once(self: Arc<Self>) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if let Ok(event) = res {
                    let _ = tx.send(event);
                }
            },
            notify::Config::default(),
        )
        .map_err(|e| crate::IndexerError::Other(format!("watcher init failed: {e}")))?;
        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(|e| crate::IndexerError::Other(format!("watch failed: {e}")))?;

        let flusher = self.clone();
        let flush_task = tokio::spawn(async move { flusher.flush_loop().await });

        while let Some(event) = rx.recv().await {
            self.handle_event(event).await;
        }
        flush_task.abort();
        Ok(())
    }

    async fn handle_event(&self, event: Event) {
        let kind = match event.kind {
            EventKind::Remove(_) => PendingKind::Delete,
            EventKind::Create(_) | EventKind::Modify(_) => PendingKind::Upsert,
            _ => return,
        };
        let mut pending = self.pending.lock().await;
        for path in event.paths {
            let Some(relative) = relative_path(&self.root, &path) else {
                continue;
            };
            if pending.len() >= MAX_PENDING && !pending.contains_key(&relative) {
                if let Some(oldest) = pending.iter().min_by_key(|(_, (_, t))| *t).map(|(p, _)| p.clone()) {
                    let (oldest_kind, _) = pending.remove(&oldest).unwrap();
                    drop(pending);
                    self.apply(&oldest, oldest_kind).await;
                    pending = self.pending.lock().await;
                }
            }
            pending.insert(relative, (kind, Instant::now()));
        }
    }

    async fn flush_loop(&self) {
        let mut ticker = tokio::time::interval(Duration::from_millis(100));
        loop {
            ticker.tick().await;
            let ready: Vec<(String, PendingKind)> = {
                let mut pending = self.pending.lock().await;
                let now = Instant::now();
                let ready_keys: Vec<String> = pending
                    .iter()
                    .filter(|(_, (_, seen))| now.duration_since(*seen) >= DEBOUNCE)
                    .map(|(path, _)| path.clone())
                    .collect();
                ready_keys
                    .into_iter()
                    .filter_map(|path| pending.remove(&path).map(|(kind, _)| (path, kind)))
                    .collect()
            };
            for (path, kind) in ready {
                self.apply(&path, kind).await;
            }
        }
    }

    async fn apply(&self, relative_path: &str, kind: PendingKind) {
        let result = match kind {
            PendingKind::Upsert => self.indexer.reindex_file(relative_path).await,
            PendingKind::Delete => self.indexer.delete_file(relative_path).await,
        };
        if let Err(e) = result {
            log::warn!("failed to apply {relative_path} ({kind:?}): {e}");
        }
    }
}

fn relative_path(root: &Path, absolute: &Path) -> Option<String> {
    absolute.strip_prefix(root).ok().map(|p| p.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_strips_root_prefix() {
        let root = Path::new("/proj");
        let absolute = Path::new("/proj/src/main.rs");
        assert_eq!(relative_path(root, absolute), Some("src/main.rs".to_string()));
    }

    #[test]
    fn relative_path_is_none_outside_root() {
        let root = Path::new("/proj");
        let other = Path::new("/elsewhere/main.rs");
        assert_eq!(relative_path(root, other), None);
    }
}
