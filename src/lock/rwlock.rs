/*!
 * Reader-Preferring Readers/Writer Lock
 *
 * Composed from two [`ReentrantMutex`] instances: one serializing reader
 * count changes, one representing "a writer or at least one reader is
 * active". Once any reader is active the writer mutex stays held until the
 * last reader leaves, so arriving readers never wait behind a parked writer.
 * A writer can therefore be delayed indefinitely under sustained read
 * arrival; that is the documented policy, not a bug.
 *
 * Not reentrant across modes: a thread holding a write guard must not call
 * `acquire_read` (and vice versa) or it deadlocks against itself.
 */

use super::mutex::{MutexGuard, ReentrantMutex};
use crate::errors::LockResult;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct ReadersWriterLock {
    /// Live readers; mutated only under `counter`.
    readers: AtomicUsize,
    counter: ReentrantMutex,
    writer: ReentrantMutex,
}

impl ReadersWriterLock {
    pub const fn new() -> Self {
        Self {
            readers: AtomicUsize::new(0),
            counter: ReentrantMutex::new(),
            writer: ReentrantMutex::new(),
        }
    }

    /// Block until shared (read) access is granted.
    ///
    /// Succeeds immediately whenever any reader is already active, even if a
    /// writer is parked waiting.
    pub fn acquire_read(&self) -> ReadGuard<'_> {
        let gate = self.counter.acquire();
        if self.readers.fetch_add(1, Ordering::Relaxed) == 0 {
            // First reader in: hold the writer mutex on behalf of the whole
            // group. The last reader out releases it, possibly from a
            // different thread, so this is a group acquisition.
            self.writer.lock_group();
            tracing::debug!("reader group took the writer mutex");
        }
        drop(gate);
        ReadGuard {
            lock: self,
            released: false,
        }
    }

    /// Block until exclusive (write) access is granted.
    pub fn acquire_write(&self) -> WriteGuard<'_> {
        WriteGuard {
            inner: self.writer.acquire(),
        }
    }

    /// Attempt exclusive access without blocking.
    pub fn try_acquire_write(&self) -> Option<WriteGuard<'_>> {
        self.writer
            .try_acquire()
            .map(|inner| WriteGuard { inner })
    }

    /// Number of live readers. Diagnostic; stale the moment it returns.
    pub fn active_readers(&self) -> usize {
        self.readers.load(Ordering::Relaxed)
    }

    fn release_read(&self) {
        let gate = self.counter.acquire();
        if self.readers.fetch_sub(1, Ordering::Relaxed) == 1 {
            self.writer.unlock_group();
            tracing::debug!("last reader returned the writer mutex");
        }
        drop(gate);
    }
}

impl Default for ReadersWriterLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared-access token. Releases on drop; may be released from any thread
/// (the counter mutex serializes the bookkeeping).
#[must_use = "read access ends as soon as the guard is dropped"]
pub struct ReadGuard<'a> {
    lock: &'a ReadersWriterLock,
    released: bool,
}

impl ReadGuard<'_> {
    /// Release this read acquisition. Idempotent after the first call.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.lock.release_read();
        self.released = true;
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Exclusive-access token. Thread-affine like the mutex guard it wraps.
#[must_use = "write access ends as soon as the guard is dropped"]
pub struct WriteGuard<'a> {
    inner: MutexGuard<'a>,
}

impl WriteGuard<'_> {
    /// Release this write acquisition. Idempotent after the first success.
    pub fn release(&mut self) -> LockResult<()> {
        self.inner.release()
    }

    pub fn is_released(&self) -> bool {
        self.inner.is_released()
    }
}
