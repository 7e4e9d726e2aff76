//! Reader/writer lock capability guarding the cache backing file.
//!
//! Acquire and release are separate calls so a lock can be taken on one
//! thread and released on another, which the async region relies on.

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::warn;

/// Lock capability handed to a cache region.
///
/// `acquire_*` returns `false` only when `wait` is `false` and the lock is
/// contended.
pub trait FileLock: Send + Sync {
    fn acquire_read(&self, wait: bool) -> bool;
    fn acquire_write(&self, wait: bool) -> bool;
    fn release_read(&self);
    fn release_write(&self);
}

/// Builds the lock for a given backing file.
pub type LockFactory = fn(&Path) -> Arc<dyn FileLock>;

#[derive(Debug, Default)]
struct LockState {
    readers: usize,
    writer: bool,
}

/// Process-local reader/writer lock.
///
/// Any number of readers, or one writer. A writer that is waiting for
/// readers to drain already blocks new readers.
#[derive(Debug, Default)]
pub struct MutexLock {
    state: Mutex<LockState>,
    cond: Condvar,
}

impl MutexLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// `LockFactory` for regions; the file name is not needed.
    pub fn factory(_path: &Path) -> Arc<dyn FileLock> {
        Arc::new(Self::new())
    }

    pub fn readers(&self) -> usize {
        self.state.lock().readers
    }

    pub fn is_write_locked(&self) -> bool {
        self.state.lock().writer
    }
}

impl FileLock for MutexLock {
    fn acquire_read(&self, wait: bool) -> bool {
        let mut st = self.state.lock();
        if st.writer && !wait {
            return false;
        }
        while st.writer {
            self.cond.wait(&mut st);
        }
        st.readers += 1;
        true
    }

    fn acquire_write(&self, wait: bool) -> bool {
        let mut st = self.state.lock();
        if st.writer && !wait {
            return false;
        }
        while st.writer {
            self.cond.wait(&mut st);
        }
        st.writer = true;

        if st.readers > 0 {
            if !wait {
                st.writer = false;
                self.cond.notify_all();
                return false;
            }
            while st.readers > 0 {
                self.cond.wait(&mut st);
            }
        }
        true
    }

    fn release_read(&self) {
        let mut st = self.state.lock();
        if st.readers == 0 {
            warn!("release_read called without a held read lock");
            return;
        }
        st.readers -= 1;
        if st.readers == 0 {
            self.cond.notify_all();
        }
    }

    fn release_write(&self) {
        let mut st = self.state.lock();
        if !st.writer {
            warn!("release_write called without a held write lock");
            return;
        }
        st.writer = false;
        self.cond.notify_all();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Read,
    Write,
}

/// Releases the held mode on drop.
pub struct LockGuard {
    lock: Arc<dyn FileLock>,
    mode: LockMode,
}

impl LockGuard {
    /// Try to take the lock without blocking.
    pub fn try_acquire(lock: &Arc<dyn FileLock>, mode: LockMode) -> Option<Self> {
        let acquired = match mode {
            LockMode::Read => lock.acquire_read(false),
            LockMode::Write => lock.acquire_write(false),
        };
        acquired.then(|| Self {
            lock: Arc::clone(lock),
            mode,
        })
    }

    /// Take the lock, waiting on the blocking pool if it is contended.
    ///
    /// Cancel-safe: the blocking task hands over a guard, so a lock taken
    /// after the caller went away is released when the guard is dropped.
    pub async fn acquire(lock: &Arc<dyn FileLock>, mode: LockMode) -> Result<Self, String> {
        if let Some(guard) = Self::try_acquire(lock, mode) {
            return Ok(guard);
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        let blocking = Arc::clone(lock);
        tokio::task::spawn_blocking(move || {
            let acquired = match mode {
                LockMode::Read => blocking.acquire_read(true),
                LockMode::Write => blocking.acquire_write(true),
            };
            if acquired {
                // Err hands the guard back, and dropping it releases.
                let _ = tx.send(Self {
                    lock: blocking,
                    mode,
                });
            }
        });

        rx.await.map_err(|_| format!("{mode:?} lock not acquired"))
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        match self.mode {
            LockMode::Read => self.lock.release_read(),
            LockMode::Write => self.lock.release_write(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn readers_share_the_lock() {
        let lock = MutexLock::new();
        assert!(lock.acquire_read(false));
        assert!(lock.acquire_read(false));
        assert_eq!(lock.readers(), 2);
        lock.release_read();
        lock.release_read();
        assert_eq!(lock.readers(), 0);
    }

    #[test]
    fn writer_excludes_readers_and_writers() {
        let lock = MutexLock::new();
        assert!(lock.acquire_write(false));
        assert!(!lock.acquire_read(false));
        assert!(!lock.acquire_write(false));
        lock.release_write();
        assert!(lock.acquire_read(false));
        lock.release_read();
    }

    #[test]
    fn nonblocking_writer_backs_off_from_readers() {
        let lock = MutexLock::new();
        assert!(lock.acquire_read(false));
        assert!(!lock.acquire_write(false));
        // The failed attempt must not leave the writer flag behind.
        assert!(!lock.is_write_locked());
        assert!(lock.acquire_read(false));
        lock.release_read();
        lock.release_read();
    }

    #[test]
    fn waiting_writer_gets_lock_after_readers_release() {
        let lock = Arc::new(MutexLock::new());
        assert!(lock.acquire_read(true));

        let (tx, rx) = mpsc::channel();
        let writer = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                assert!(lock.acquire_write(true));
                tx.send(()).unwrap();
                lock.release_write();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        lock.release_read();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        writer.join().unwrap();
        assert!(!lock.is_write_locked());
    }

    #[test]
    fn release_without_acquire_is_a_noop() {
        let lock = MutexLock::new();
        lock.release_read();
        lock.release_write();
        assert!(lock.acquire_write(false));
        lock.release_write();
    }

    #[tokio::test]
    async fn abandoned_acquire_does_not_leak_the_lock() {
        let state = Arc::new(MutexLock::new());
        let lock: Arc<dyn FileLock> = state.clone();
        let writer = LockGuard::try_acquire(&lock, LockMode::Write).unwrap();

        let waited =
            tokio::time::timeout(Duration::from_millis(20), LockGuard::acquire(&lock, LockMode::Read))
                .await;
        assert!(waited.is_err());
        drop(writer);

        for _ in 0..100 {
            if let Some(guard) = LockGuard::try_acquire(&lock, LockMode::Write) {
                drop(guard);
                assert_eq!(state.readers(), 0);
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("read lock taken by the abandoned acquire was never released");
    }

    #[tokio::test]
    async fn acquire_waits_for_contended_lock() {
        let lock: Arc<dyn FileLock> = Arc::new(MutexLock::new());
        let writer = LockGuard::try_acquire(&lock, LockMode::Write).unwrap();

        let waiting = {
            let lock = Arc::clone(&lock);
            tokio::spawn(async move { LockGuard::acquire(&lock, LockMode::Read).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        drop(writer);
        let reader = waiting.await.unwrap().unwrap();
        assert_eq!(reader.mode(), LockMode::Read);
    }

    #[test]
    fn guard_releases_on_drop() {
        let lock: Arc<dyn FileLock> = Arc::new(MutexLock::new());
        {
            let guard = LockGuard::try_acquire(&lock, LockMode::Write).unwrap();
            assert_eq!(guard.mode(), LockMode::Write);
            assert!(LockGuard::try_acquire(&lock, LockMode::Read).is_none());
        }
        assert!(LockGuard::try_acquire(&lock, LockMode::Read).is_some());
    }
}
