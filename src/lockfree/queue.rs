/*!
 * Lock-Free FIFO Queue
 *
 * Michael & Scott queue: a singly linked list behind a permanent sentinel
 * node, with atomic head and tail pointers. Enqueue links onto `tail.next`
 * with a CAS; any thread that observes a lagging tail helps advance it
 * instead of retrying blindly, which is what makes the structure lock-free.
 * Dequeue advances head past the sentinel, so the node after head is always
 * the logical front.
 *
 * # Reclamation
 *
 * Node memory is reclaimed through crossbeam-epoch: an unlinked node is
 * defer-destroyed and freed only after every thread pinned at unlink time
 * has moved on. Values are cloned out rather than moved, so a concurrently
 * pinned `try_peek` can never observe a freed value; the original is dropped
 * with its node.
 */

use crossbeam_epoch::{self as epoch, Atomic, Owned, Shared};
use std::sync::atomic::{AtomicUsize, Ordering};

struct Node<T> {
    /// `None` only for the original sentinel; every linked node carries a
    /// value until its node is destroyed.
    value: Option<T>,
    next: Atomic<Node<T>>,
}

/// Unbounded MPMC FIFO on atomic compare-and-swap. Never blocks.
pub struct LockFreeQueue<T> {
    head: Atomic<Node<T>>,
    tail: Atomic<Node<T>>,
    /// Approximate: maintained by separate atomic ops outside the pointer
    /// CAS, so concurrent readers may observe a transiently stale count.
    len: AtomicUsize,
}

impl<T> LockFreeQueue<T> {
    pub fn new() -> Self {
        let queue = Self {
            head: Atomic::null(),
            tail: Atomic::null(),
            len: AtomicUsize::new(0),
        };
        let sentinel = Owned::new(Node {
            value: None,
            next: Atomic::null(),
        });
        unsafe {
            let sentinel = sentinel.into_shared(epoch::unprotected());
            queue.head.store(sentinel, Ordering::Relaxed);
            queue.tail.store(sentinel, Ordering::Relaxed);
        }
        queue
    }

    /// Create pre-filled from an initial element sequence.
    pub fn with_items<I: IntoIterator<Item = T>>(items: I) -> Self {
        let queue = Self::new();
        for item in items {
            queue.enqueue(item);
        }
        queue
    }

    /// Append a value. Lock-free: retries only while other enqueuers are
    /// making progress.
    pub fn enqueue(&self, value: T) {
        let guard = &epoch::pin();
        let new = Owned::new(Node {
            value: Some(value),
            next: Atomic::null(),
        })
        .into_shared(guard);

        loop {
            let tail = self.tail.load(Ordering::Acquire, guard);
            let tail_ref = unsafe { tail.deref() };
            let next = tail_ref.next.load(Ordering::Acquire, guard);

            if !next.is_null() {
                // Tail is lagging behind a finished link: help complete the
                // other thread's advance, then retry.
                let _ = self
                    .tail
                    .compare_exchange(tail, next, Ordering::Release, Ordering::Relaxed, guard);
                continue;
            }

            if tail_ref
                .next
                .compare_exchange(Shared::null(), new, Ordering::Release, Ordering::Relaxed, guard)
                .is_ok()
            {
                // Linked. Advancing tail is best-effort; a failure means
                // someone already helped us.
                let _ = self
                    .tail
                    .compare_exchange(tail, new, Ordering::Release, Ordering::Relaxed, guard);
                self.len.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
    }

    /// Approximate number of elements.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Whether the queue was empty at some instant during the call.
    pub fn is_empty(&self) -> bool {
        let guard = &epoch::pin();
        let head = self.head.load(Ordering::Acquire, guard);
        unsafe { head.deref() }
            .next
            .load(Ordering::Acquire, guard)
            .is_null()
    }
}

impl<T: Clone> LockFreeQueue<T> {
    /// Remove and return the front value, or `None` if empty.
    pub fn try_dequeue(&self) -> Option<T> {
        let guard = &epoch::pin();
        loop {
            let head = self.head.load(Ordering::Acquire, guard);
            let head_ref = unsafe { head.deref() };
            let next = head_ref.next.load(Ordering::Acquire, guard);
            let tail = self.tail.load(Ordering::Acquire, guard);

            if next.is_null() {
                // Sentinel has no successor: empty at this instant
                return None;
            }
            if head == tail {
                // An enqueue finished linking but has not advanced tail yet;
                // help it along before unlinking from under it.
                let _ = self
                    .tail
                    .compare_exchange(tail, next, Ordering::Release, Ordering::Relaxed, guard);
                continue;
            }

            if self
                .head
                .compare_exchange(head, next, Ordering::Release, Ordering::Relaxed, guard)
                .is_ok()
            {
                self.len.fetch_sub(1, Ordering::Relaxed);
                // `next` is the new sentinel; its value stays in place until
                // the node is destroyed, so pinned peekers stay safe.
                let value = unsafe { next.deref() }.value.clone();
                unsafe { guard.defer_destroy(head) };
                return value;
            }
        }
    }

    /// Read the front value without removing it.
    ///
    /// A successful peek means the value was at the front at some instant;
    /// a concurrent dequeue may already have claimed it by the time the
    /// caller acts on it.
    pub fn try_peek(&self) -> Option<T> {
        let guard = &epoch::pin();
        let head = self.head.load(Ordering::Acquire, guard);
        let next = unsafe { head.deref() }.next.load(Ordering::Acquire, guard);
        let front = unsafe { next.as_ref() }?;
        front.value.clone()
    }
}

impl<T> Default for LockFreeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for LockFreeQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::with_items(iter)
    }
}

impl<T> Drop for LockFreeQueue<T> {
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

// Safety: values move between threads (Send) and are cloned from shared
// nodes (Sync); the pointer structure itself is epoch-protected.
unsafe impl<T: Send + Sync> Send for LockFreeQueue<T> {}
unsafe impl<T: Send + Sync> Sync for LockFreeQueue<T> {}
