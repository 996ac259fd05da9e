/*!
 * Wait Primitive
 *
 * Counting semaphore built from parking_lot's mutex + condvar, the
 * cross-platform parking path for the contended side of [`super::mutex`].
 * The mutex protocol keeps at most one permit outstanding; the counting form
 * tolerates the transient extra permit a timed-out waiter can strand, which
 * the mutex claim loop absorbs.
 */

use parking_lot::{Condvar, Mutex};
use std::time::Instant;

pub(crate) struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    pub(crate) const fn new() -> Self {
        Self {
            permits: Mutex::new(0),
            available: Condvar::new(),
        }
    }

    /// Release one permit and wake a single parked thread.
    pub(crate) fn post(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        self.available.notify_one();
    }

    /// Park until a permit is available, then consume it.
    pub(crate) fn wait(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Park until a permit is available or the deadline passes.
    ///
    /// Returns `true` if a permit was consumed. Deadline-based, so repeated
    /// spurious wakeups never stretch the total wait.
    pub(crate) fn wait_until(&self, deadline: Instant) -> bool {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            if self.available.wait_until(&mut permits, deadline).timed_out() {
                // A post can land between the timeout firing and the mutex
                // being reacquired: honor it.
                if *permits > 0 {
                    break;
                }
                return false;
            }
        }
        *permits -= 1;
        true
    }
}
