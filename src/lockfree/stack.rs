/*!
 * Lock-Free LIFO Stack
 *
 * Treiber stack: a singly linked chain hanging off one atomic root pointer.
 * Push and pop are each a single CAS on the root, retried until it lands.
 * LIFO ordering is exact; the size counter is updated by a separate atomic
 * after the CAS, so it can trail by the handful of operations in flight.
 *
 * Reclamation matches the queue: unlinked nodes are defer-destroyed through
 * crossbeam-epoch and values are cloned out, never moved, so pinned peekers
 * cannot observe a freed value.
 */

use crossbeam_epoch::{self as epoch, Atomic, Owned, Shared};
use std::sync::atomic::{AtomicUsize, Ordering};

struct Node<T> {
    value: T,
    next: Atomic<Node<T>>,
}

/// Unbounded MPMC LIFO on a single atomic compare-and-swap. Never blocks.
pub struct LockFreeStack<T> {
    head: Atomic<Node<T>>,
    len: AtomicUsize,
}

impl<T> LockFreeStack<T> {
    pub fn new() -> Self {
        Self {
            head: Atomic::null(),
            len: AtomicUsize::new(0),
        }
    }

    /// Create pre-filled from an initial element sequence; the last item
    /// pushed is the first popped.
    pub fn with_items<I: IntoIterator<Item = T>>(items: I) -> Self {
        let stack = Self::new();
        for item in items {
            stack.push(item);
        }
        stack
    }

    /// Push a value. Retries the root CAS until it lands.
    pub fn push(&self, value: T) {
        let guard = &epoch::pin();
        let mut node = Owned::new(Node {
            value,
            next: Atomic::null(),
        });

        loop {
            let head = self.head.load(Ordering::Relaxed, guard);
            node.next.store(head, Ordering::Relaxed);
            match self
                .head
                .compare_exchange(head, node, Ordering::Release, Ordering::Relaxed, guard)
            {
                Ok(_) => {
                    self.len.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                Err(err) => node = err.new,
            }
        }
    }

    /// Drop every element in one atomic step: the whole chain is unlinked by
    /// a single swap of the root and reclaimed together.
    pub fn clear(&self) {
        let guard = &epoch::pin();
        let mut node = self.head.swap(Shared::null(), Ordering::AcqRel, guard);
        let mut drained = 0usize;
        while let Some(node_ref) = unsafe { node.as_ref() } {
            let next = node_ref.next.load(Ordering::Relaxed, guard);
            unsafe { guard.defer_destroy(node) };
            node = next;
            drained += 1;
        }
        if drained > 0 {
            // A racing push may not have bumped the counter yet; saturate so
            // the approximate count can go stale but never wrap.
            let _ = self
                .len
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |len| {
                    Some(len.saturating_sub(drained))
                });
            tracing::debug!(drained, "lock-free stack cleared");
        }
    }

    /// Element count; exact up to the operations still in flight.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Whether the stack was empty at some instant during the call.
    pub fn is_empty(&self) -> bool {
        let guard = &epoch::pin();
        self.head.load(Ordering::Acquire, guard).is_null()
    }
}

impl<T: Clone> LockFreeStack<T> {
    /// Remove and return the most recently pushed value, or `None` if empty.
    pub fn try_pop(&self) -> Option<T> {
        let guard = &epoch::pin();
        loop {
            let head = self.head.load(Ordering::Acquire, guard);
            let head_ref = unsafe { head.as_ref() }?;
            let next = head_ref.next.load(Ordering::Relaxed, guard);

            if self
                .head
                .compare_exchange(head, next, Ordering::Release, Ordering::Relaxed, guard)
                .is_ok()
            {
                self.len.fetch_sub(1, Ordering::Relaxed);
                let value = head_ref.value.clone();
                unsafe { guard.defer_destroy(head) };
                return Some(value);
            }
        }
    }

    /// Read the top value without removing it. Success means "was on top at
    /// some instant", nothing more.
    pub fn try_peek(&self) -> Option<T> {
        let guard = &epoch::pin();
        let head = self.head.load(Ordering::Acquire, guard);
        unsafe { head.as_ref() }.map(|node| node.value.clone())
    }
}

impl<T> Default for LockFreeStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for LockFreeStack<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::with_items(iter)
    }
}

impl<T> Drop for LockFreeStack<T> {
    fn drop(&mut self) {
        // &mut self: no concurrent readers, free the chain directly
        unsafe {
            let guard = epoch::unprotected();
            let mut node = self.head.load(Ordering::Relaxed, guard);
            while !node.is_null() {
                let next = node.deref().next.load(Ordering::Relaxed, guard);
                drop(node.into_owned());
                node = next;
            }
        }
    }
}

// Safety: same reasoning as the queue
unsafe impl<T: Send + Sync> Send for LockFreeStack<T> {}
unsafe impl<T: Send + Sync> Sync for LockFreeStack<T> {}
