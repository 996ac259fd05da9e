/*!
 * Reentrant Fast-Path Mutex
 *
 * A lock that costs a single atomic increment/decrement when uncontended and
 * parks on a semaphore only under genuine contention. The owning thread may
 * acquire again without deadlocking; the lock is released externally after
 * the matching number of releases.
 *
 * # Algorithm
 *
 * Every acquire bumps an entry counter. A post-increment of one means the
 * lock was free and the caller claims it directly, never touching the wait
 * primitive. Anything else parks on the semaphore; a woken waiter claims
 * ownership with a CAS on the owner word and parks again if it loses. The
 * CAS claim also absorbs permits stranded by timed-out waiters, so a stale
 * wakeup can never hand the lock to two threads. Release decrements the
 * entry counter and posts one permit iff other threads are still queued.
 */

use super::wait::Semaphore;
use crate::errors::{LockError, LockResult};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Owner word for an unheld lock.
const UNOWNED: u64 = 0;

/// Owner word while a reader group holds the lock (see `rwlock`). Reserved so
/// no individual thread can match it and take the reentrant path.
pub(crate) const GROUP_OWNER: u64 = u64::MAX;

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

/// Stable per-thread identifier; never `UNOWNED` or `GROUP_OWNER`.
fn current_thread_id() -> u64 {
    THREAD_ID.with(|id| *id)
}

/// Reentrant mutex with an atomic fast path.
///
/// Carries no data: it is a raw exclusion primitive handing out release
/// tokens, composed by [`ReadersWriterLock`](crate::ReadersWriterLock) and
/// usable on its own wherever a reentrant critical section is needed.
pub struct ReentrantMutex {
    /// Thread id of the current owner, `UNOWNED` when free.
    owner: AtomicU64,
    /// Threads currently inside acquire, contended or not.
    entries: AtomicUsize,
    /// Reentrant depth; written only by the owning thread.
    recursion: AtomicUsize,
    waiter: Semaphore,
}

impl ReentrantMutex {
    pub const fn new() -> Self {
        Self {
            owner: AtomicU64::new(UNOWNED),
            entries: AtomicUsize::new(0),
            recursion: AtomicUsize::new(0),
            waiter: Semaphore::new(),
        }
    }

    /// Block until this thread owns the lock.
    ///
    /// Reentrant: a thread already holding the lock acquires again without
    /// parking, and the lock is released once the matching number of guards
    /// have been released.
    pub fn acquire(&self) -> MutexGuard<'_> {
        let me = current_thread_id();
        if self.reenter(me) {
            return MutexGuard::new(self);
        }
        if self.entries.fetch_add(1, Ordering::Acquire) == 0 {
            self.claim(me);
            return MutexGuard::new(self);
        }
        loop {
            self.waiter.wait();
            if self.try_claim(me) {
                return MutexGuard::new(self);
            }
        }
    }

    /// Acquire without blocking. Never touches the wait primitive.
    pub fn try_acquire(&self) -> Option<MutexGuard<'_>> {
        let me = current_thread_id();
        if self.reenter(me) {
            return Some(MutexGuard::new(self));
        }
        if self
            .entries
            .compare_exchange(0, 1, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            self.claim(me);
            return Some(MutexGuard::new(self));
        }
        None
    }

    /// Acquire with a bounded wait.
    ///
    /// On expiry the entry ticket is withdrawn and `None` returned, leaving
    /// the lock exactly as if the attempt had never been made.
    pub fn try_acquire_for(&self, timeout: Duration) -> Option<MutexGuard<'_>> {
        let me = current_thread_id();
        if self.reenter(me) {
            return Some(MutexGuard::new(self));
        }
        if self.entries.fetch_add(1, Ordering::Acquire) == 0 {
            self.claim(me);
            return Some(MutexGuard::new(self));
        }
        let deadline = Instant::now() + timeout;
        loop {
            if !self.waiter.wait_until(deadline) {
                // Withdraw. A release racing with this can strand one permit;
                // the claim CAS in the wait loop absorbs it later.
                self.entries.fetch_sub(1, Ordering::Release);
                return None;
            }
            if self.try_claim(me) {
                return Some(MutexGuard::new(self));
            }
        }
    }

    /// Whether the calling thread currently owns the lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        self.owner.load(Ordering::Relaxed) == current_thread_id()
    }

    /// Current reentrant depth as seen by the owning thread.
    pub fn recursion_depth(&self) -> usize {
        self.recursion.load(Ordering::Relaxed)
    }

    /// Reentrant fast path: only our own stores can make `owner` equal `me`.
    fn reenter(&self, me: u64) -> bool {
        if self.owner.load(Ordering::Relaxed) == me {
            self.entries.fetch_add(1, Ordering::Relaxed);
            self.recursion.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Take ownership after winning the entry counter race.
    fn claim(&self, me: u64) {
        self.owner.store(me, Ordering::Relaxed);
        self.recursion.store(1, Ordering::Relaxed);
    }

    /// Take ownership after a wakeup. Fails if another claimant won, which
    /// happens only when the consumed permit was stale.
    fn try_claim(&self, me: u64) -> bool {
        if self
            .owner
            .compare_exchange(UNOWNED, me, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            self.recursion.store(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Release one acquisition. Called by the guard.
    pub(crate) fn unlock(&self) -> LockResult<()> {
        if self.owner.load(Ordering::Relaxed) != current_thread_id() {
            return Err(LockError::NotOwner);
        }
        if self.recursion.fetch_sub(1, Ordering::Relaxed) > 1 {
            // Still reentrantly held
            self.entries.fetch_sub(1, Ordering::Relaxed);
            return Ok(());
        }
        // Release: a waiter that consumed a stranded permit claims ownership
        // through this store alone, without passing through the semaphore.
        self.owner.store(UNOWNED, Ordering::Release);
        if self.entries.fetch_sub(1, Ordering::Release) > 1 {
            self.waiter.post();
        }
        Ok(())
    }

    /// Acquire on behalf of a reader group rather than a thread.
    ///
    /// Serialized by the rwlock's counter mutex; the matching
    /// [`Self::unlock_group`] may run on a different thread.
    pub(crate) fn lock_group(&self) {
        if self.entries.fetch_add(1, Ordering::Acquire) == 0 {
            self.owner.store(GROUP_OWNER, Ordering::Relaxed);
            self.recursion.store(1, Ordering::Relaxed);
            return;
        }
        loop {
            self.waiter.wait();
            if self
                .owner
                .compare_exchange(UNOWNED, GROUP_OWNER, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                self.recursion.store(1, Ordering::Relaxed);
                return;
            }
        }
    }

    /// Release a group acquisition, from whichever thread the last reader
    /// happens to be on.
    pub(crate) fn unlock_group(&self) {
        debug_assert_eq!(self.owner.load(Ordering::Relaxed), GROUP_OWNER);
        self.recursion.store(0, Ordering::Relaxed);
        // Release for the same stale-permit claim path as `unlock`
        self.owner.store(UNOWNED, Ordering::Release);
        if self.entries.fetch_sub(1, Ordering::Release) > 1 {
            self.waiter.post();
        }
    }
}

impl Default for ReentrantMutex {
    fn default() -> Self {
        Self::new()
    }
}

/// Acquisition token for [`ReentrantMutex`].
///
/// Releases its acquisition on drop. [`MutexGuard::release`] may be called
/// early and is idempotent. The token may be sent to another thread, but
/// releasing it there reports [`LockError::NotOwner`]: the lock is
/// thread-affine even though the token is not.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct MutexGuard<'a> {
    lock: &'a ReentrantMutex,
    released: bool,
}

impl<'a> MutexGuard<'a> {
    fn new(lock: &'a ReentrantMutex) -> Self {
        Self {
            lock,
            released: false,
        }
    }

    /// Release this acquisition. Idempotent after the first success.
    pub fn release(&mut self) -> LockResult<()> {
        if self.released {
            return Ok(());
        }
        self.lock.unlock()?;
        self.released = true;
        Ok(())
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Drop cannot fail loudly; an ownership violation here means the
        // guard crossed threads and the lock stays held.
        if let Err(err) = self.lock.unlock() {
            tracing::error!(?err, "mutex guard dropped by a non-owning thread");
        }
    }
}
