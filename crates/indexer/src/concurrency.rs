use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// FIFO mutex with timeout-aware acquire. Built on `tokio::sync::Mutex`,
/// whose internal semaphore already gives us what the model asks for: a
/// waiter that times out never steals or loses a wakeup, because a permit
/// handed to a future that's being dropped is returned to the queue instead
/// of leaking.
pub struct AsyncMutex<T> {
    inner: Mutex<T>,
}

impl<T> AsyncMutex<T> {
    pub fn new(value: T) -> Self {
        Self { inner: Mutex::new(value) }
    }

    pub async fn acquire(&self) -> tokio::sync::MutexGuard<'_, T> {
        self.inner.lock().await
    }

    /// Returns `None` on timeout; the mutex is left exactly as if this
    /// waiter had never joined the queue.
    pub async fn acquire_timeout(&self, timeout: Duration) -> Option<tokio::sync::MutexGuard<'_, T>> {
        tokio::time::timeout(timeout, self.inner.lock()).await.ok()
    }
}

/// Unlimited concurrent readers, or one writer. `tokio::sync::RwLock` is
/// write-preferring: once a writer is queued, new read acquisitions block
/// behind it rather than continuing to starve the writer.
pub struct ReadWriteLock<T> {
    inner: RwLock<T>,
}

impl<T> ReadWriteLock<T> {
    pub fn new(value: T) -> Self {
        Self { inner: RwLock::new(value) }
    }

    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, T> {
        self.inner.read().await
    }

    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, T> {
        self.inner.write().await
    }
}

static PROJECT_LOCKS: Lazy<std::sync::Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    Lazy::new(|| std::sync::Mutex::new(HashMap::new()));

/// Process-wide singleton ensuring at most one full-index or bulk-reconcile
/// runs per project root at a time.
pub struct IndexingLock {
    project_root: PathBuf,
    mutex: Arc<Mutex<()>>,
}

pub struct IndexingGuard {
    _guard: OwnedMutexGuard<()>,
}

impl IndexingLock {
    #[must_use]
    pub fn for_project(root: &Path) -> Self {
        let root = root.to_path_buf();
        let mutex = {
            let mut registry = PROJECT_LOCKS.lock().expect("lock registry poisoned");
            registry.entry(root.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        Self { project_root: root, mutex }
    }

    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Non-blocking: returns `None` if an index run is already in progress
    /// for this project rather than queuing behind it.
    #[must_use]
    pub fn try_acquire(&self) -> Option<IndexingGuard> {
        self.mutex.clone().try_lock_owned().ok().map(|_guard| IndexingGuard { _guard })
    }

    pub async fn acquire(&self) -> IndexingGuard {
        let guard = self.mutex.clone().lock_owned().await;
        IndexingGuard { _guard: guard }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn try_acquire_fails_while_already_held() {
        let dir = tempfile::tempdir().unwrap();
        let lock_a = IndexingLock::for_project(dir.path());
        let guard = lock_a.try_acquire().expect("first acquire should succeed");

        let lock_b = IndexingLock::for_project(dir.path());
        assert!(lock_b.try_acquire().is_none());

        drop(guard);
        assert!(lock_b.try_acquire().is_some());
    }

    #[tokio::test]
    async fn acquire_timeout_returns_none_without_losing_the_mutex() {
        let mutex = AsyncMutex::new(0_i32);
        let held = mutex.acquire().await;
        assert!(mutex.acquire_timeout(Duration::from_millis(20)).await.is_none());
        drop(held);
        assert!(mutex.acquire_timeout(Duration::from_millis(20)).await.is_some());
    }
}
