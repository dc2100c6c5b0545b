//! Path lock manager: in-process exclusive locks keyed by normalized path.
//!
//! Locks are created on first use and kept for the life of the manager. Every
//! acquisition goes through a [`PathLockGuard`], so a lock is returned on every
//! exit path of its holder, unwinding included.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError};

use crate::utils::config::{DIR_LOCK_NAME, PREDICTED_DIR_BUCKETS};

use super::tools::{clean_path, path_to_key_string};

/// Normalized lock key. Two paths that clean to the same string share a lock.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockKey(String);

impl LockKey {
    /// Key for a file or directory path (lexically cleaned, `/` separators).
    pub fn path(path: impl AsRef<Path>) -> Self {
        LockKey(path_to_key_string(&clean_path(path.as_ref())))
    }

    /// Token for a directory that may not exist yet: `<dir>/.dir_lock`.
    pub fn directory(dir: impl AsRef<Path>) -> Self {
        Self::path(dir.as_ref().join(DIR_LOCK_NAME))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Path> for LockKey {
    fn from(p: &Path) -> Self {
        LockKey::path(p)
    }
}

impl From<PathBuf> for LockKey {
    fn from(p: PathBuf) -> Self {
        LockKey::path(p)
    }
}

/// Predicted destination directory for `source` under `base`: one of
/// [`PREDICTED_DIR_BUCKETS`] subdirectories chosen by the first byte of the
/// blake3 hash of the source path. Used when a handler cannot plan its real
/// destination before locking.
pub fn predicted_dir_token(base: &Path, source: &Path) -> LockKey {
    let hash = blake3::hash(path_to_key_string(&clean_path(source)).as_bytes());
    let bucket = hash.as_bytes()[0] as usize % PREDICTED_DIR_BUCKETS;
    LockKey::directory(base.join(format!("{bucket:02x}")))
}

/// One exclusive lock. A `Mutex<bool>` + `Condvar` pair so the guard can own an
/// `Arc` instead of borrowing from the table.
#[derive(Default)]
struct KeyLock {
    held: Mutex<bool>,
    freed: Condvar,
}

impl KeyLock {
    fn state(&self) -> MutexGuard<'_, bool> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) {
        let mut held = self.state();
        while *held {
            held = self
                .freed
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *held = true;
    }

    fn try_lock(&self) -> bool {
        let mut held = self.state();
        if *held {
            return false;
        }
        *held = true;
        true
    }

    fn unlock(&self) {
        *self.state() = false;
        self.freed.notify_one();
    }
}

/// Table of path locks shared by all workers.
#[derive(Default)]
pub struct PathLockManager {
    locks: Mutex<HashMap<LockKey, Arc<KeyLock>>>,
}

static GLOBAL_LOCKS: OnceLock<Arc<PathLockManager>> = OnceLock::new();

impl PathLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide manager. Survives across orchestrator calls in one process.
    pub fn global() -> Arc<PathLockManager> {
        Arc::clone(GLOBAL_LOCKS.get_or_init(|| Arc::new(PathLockManager::new())))
    }

    fn entry(&self, key: &LockKey) -> Arc<KeyLock> {
        // Table mutex is only held for the lookup, never while waiting on a key.
        let mut table = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(table.entry(key.clone()).or_default())
    }

    /// Block until `key` is held exclusively. Never fails, never times out.
    pub fn acquire(&self, key: impl Into<LockKey>) -> PathLockGuard {
        let key = key.into();
        let lock = self.entry(&key);
        lock.lock();
        PathLockGuard { key, lock }
    }

    /// Take `key` if nobody holds it.
    pub fn try_acquire(&self, key: impl Into<LockKey>) -> Option<PathLockGuard> {
        let key = key.into();
        let lock = self.entry(&key);
        if lock.try_lock() {
            Some(PathLockGuard { key, lock })
        } else {
            None
        }
    }

    /// Acquire every key in sorted, de-duplicated order and return them as one set.
    /// Sorting gives all callers the same global order, so two workers can never
    /// wait on each other's keys.
    pub fn acquire_all<I, K>(&self, keys: I) -> LockSet
    where
        I: IntoIterator<Item = K>,
        K: Into<LockKey>,
    {
        let mut keys: Vec<LockKey> = keys.into_iter().map(Into::into).collect();
        keys.sort();
        keys.dedup();
        let guards = keys.into_iter().map(|k| self.acquire(k)).collect();
        LockSet { guards }
    }

    /// Run `f` while holding all `keys`. Locks are released in reverse acquisition
    /// order however `f` exits.
    pub fn with_locks<I, K, F, T>(&self, keys: I, f: F) -> T
    where
        I: IntoIterator<Item = K>,
        K: Into<LockKey>,
        F: FnOnce() -> T,
    {
        let _set = self.acquire_all(keys);
        f()
    }

    /// Number of distinct keys ever locked.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive hold on one key. Dropping it releases the key.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct PathLockGuard {
    key: LockKey,
    lock: Arc<KeyLock>,
}

impl PathLockGuard {
    pub fn key(&self) -> &LockKey {
        &self.key
    }

    /// Release explicitly (same as dropping).
    pub fn release(self) {}
}

impl Drop for PathLockGuard {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

/// Set of held keys, released last-acquired first.
#[must_use = "the locks are released as soon as the set is dropped"]
pub struct LockSet {
    guards: Vec<PathLockGuard>,
}

impl LockSet {
    pub fn keys(&self) -> impl Iterator<Item = &LockKey> {
        self.guards.iter().map(PathLockGuard::key)
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

impl Drop for LockSet {
    fn drop(&mut self) {
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn keys_are_lexically_normalized() {
        assert_eq!(LockKey::path("/a/b/../c/./d"), LockKey::path("/a/c/d"));
        assert_eq!(LockKey::path("/a/c/d/"), LockKey::path("/a/c/d"));
        assert_ne!(LockKey::path("/a/c"), LockKey::path("/a/d"));
    }

    #[test]
    fn directory_token_is_distinct_from_directory() {
        let dir = LockKey::path("/dest/2024");
        let tok = LockKey::directory("/dest/2024");
        assert_ne!(dir, tok);
        assert!(tok.as_str().ends_with(DIR_LOCK_NAME));
    }

    #[test]
    fn predicted_token_is_deterministic() {
        let base = Path::new("/dest");
        let a = predicted_dir_token(base, Path::new("/src/x.jpg"));
        let b = predicted_dir_token(base, Path::new("/src/./x.jpg"));
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("/dest/"));
    }

    #[test]
    fn try_acquire_fails_while_held() {
        let mgr = PathLockManager::new();
        let g = mgr.acquire(Path::new("/x"));
        assert!(mgr.try_acquire(Path::new("/x")).is_none());
        assert!(mgr.try_acquire(Path::new("/y")).is_some());
        g.release();
        assert!(mgr.try_acquire(Path::new("/x")).is_some());
    }

    #[test]
    fn acquire_all_dedups_and_sorts() {
        let mgr = PathLockManager::new();
        let set = mgr.acquire_all([
            PathBuf::from("/b"),
            PathBuf::from("/a"),
            PathBuf::from("/a/../b"),
        ]);
        let keys: Vec<_> = set.keys().map(|k| k.as_str().to_string()).collect();
        assert_eq!(keys, vec!["/a".to_string(), "/b".to_string()]);
    }

    #[test]
    fn with_locks_releases_on_panic() {
        let mgr = Arc::new(PathLockManager::new());
        let m = Arc::clone(&mgr);
        let r = thread::spawn(move || {
            let _: () = m.with_locks([PathBuf::from("/p")], || panic!("boom"));
        })
        .join();
        assert!(r.is_err());
        assert!(mgr.try_acquire(Path::new("/p")).is_some());
    }

    #[test]
    fn exclusive_across_threads() {
        let mgr = Arc::new(PathLockManager::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let mgr = Arc::clone(&mgr);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    for _ in 0..20 {
                        mgr.with_locks([PathBuf::from("/shared")], || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            thread::sleep(Duration::from_micros(50));
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(mgr.len(), 1);
    }
}
