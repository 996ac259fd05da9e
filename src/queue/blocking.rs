/*!
 * Blocking FIFO Queue
 *
 * Monitor-based queue with an optional fixed capacity. Producers block while
 * full, consumers block while empty, both with deadline-based timed variants.
 * Every operation holds one mutex for its full duration; waits release it
 * and re-check their predicate in a loop on wake, so spurious wakeups and
 * waiter races cannot break the capacity invariant.
 */

use crate::errors::{QueueError, QueueResult};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub struct BlockingQueue<T> {
    inner: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: Option<usize>,
}

impl<T> BlockingQueue<T> {
    /// Create an unbounded queue. Producers never block.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: None,
        }
    }

    /// Create a bounded queue. The capacity is fixed for the queue's
    /// lifetime; zero is a construction error.
    pub fn with_capacity(capacity: usize) -> QueueResult<Self> {
        if capacity == 0 {
            return Err(QueueError::InvalidCapacity(capacity));
        }
        Ok(Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: Some(capacity),
        })
    }

    /// Append an item, blocking while the queue is full.
    pub fn enqueue(&self, item: T) {
        let mut queue = self.inner.lock();
        if let Some(capacity) = self.capacity {
            while queue.len() >= capacity {
                self.not_full.wait(&mut queue);
            }
        }
        queue.push_back(item);
        self.not_empty.notify_one();
    }

    /// Append an item, waiting at most `timeout` for space.
    ///
    /// The item is handed back on timeout so nothing is lost. The budget is
    /// a deadline: repeated wakeups never stretch the total wait.
    pub fn try_enqueue(&self, item: T, timeout: Duration) -> Result<(), T> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.inner.lock();
        if let Some(capacity) = self.capacity {
            while queue.len() >= capacity {
                if self.not_full.wait_until(&mut queue, deadline).timed_out() {
                    if queue.len() < capacity {
                        break;
                    }
                    return Err(item);
                }
            }
        }
        queue.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Append an item only if space is immediately available.
    pub fn try_add(&self, item: T) -> Result<(), T> {
        let mut queue = self.inner.lock();
        if let Some(capacity) = self.capacity {
            if queue.len() >= capacity {
                return Err(item);
            }
        }
        queue.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the front item, blocking while the queue is empty.
    pub fn dequeue(&self) -> T {
        let mut queue = self.inner.lock();
        loop {
            if let Some(item) = queue.pop_front() {
                self.not_full.notify_one();
                return item;
            }
            self.not_empty.wait(&mut queue);
        }
    }

    /// Remove the front item, waiting at most `timeout` for one to arrive.
    pub fn try_dequeue(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.inner.lock();
        loop {
            if let Some(item) = queue.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            if self.not_empty.wait_until(&mut queue, deadline).timed_out() {
                // One last racing producer may have slipped in
                let item = queue.pop_front();
                if item.is_some() {
                    self.not_full.notify_one();
                }
                return item;
            }
        }
    }

    /// Remove the front item only if one is immediately available.
    pub fn try_take(&self) -> Option<T> {
        let mut queue = self.inner.lock();
        let item = queue.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Remove every element in one step, waking any blocked producers.
    pub fn clear(&self) {
        let mut queue = self.inner.lock();
        let drained = queue.len();
        queue.clear();
        drop(queue);
        if drained > 0 {
            tracing::debug!(drained, "blocking queue cleared");
            self.not_full.notify_all();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Configured capacity; `None` for unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Free slots under the configured bound; `None` for unbounded.
    pub fn remaining_capacity(&self) -> Option<usize> {
        self.capacity
            .map(|capacity| capacity.saturating_sub(self.inner.lock().len()))
    }
}

impl<T: Clone> BlockingQueue<T> {
    /// Read the front element without removing it. Never blocks.
    pub fn peek(&self) -> QueueResult<T> {
        self.inner.lock().front().cloned().ok_or(QueueError::Empty)
    }

    /// Non-failing form of [`Self::peek`].
    pub fn try_peek(&self) -> Option<T> {
        self.inner.lock().front().cloned()
    }

    /// Snapshot of the queue in dequeue order.
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.lock().iter().cloned().collect()
    }

    /// Copy the whole queue into `dest` starting at `offset`, in dequeue
    /// order. The snapshot is taken under the same mutex as mutation.
    ///
    /// An `offset` past the end of `dest` leaves zero destination slots; that
    /// is only an error when there is something to copy.
    pub fn copy_to(&self, dest: &mut [T], offset: usize) -> QueueResult<()> {
        let queue = self.inner.lock();
        let slots = dest.get_mut(offset..).unwrap_or(&mut []);
        if slots.len() < queue.len() {
            return Err(QueueError::InsufficientSpace {
                needed: queue.len(),
                available: slots.len(),
            });
        }
        for (slot, item) in slots.iter_mut().zip(queue.iter()) {
            *slot = item.clone();
        }
        Ok(())
    }
}

impl<T: PartialEq> BlockingQueue<T> {
    /// Whether any queued element equals `item`, as a consistent snapshot.
    pub fn contains(&self, item: &T) -> bool {
        self.inner.lock().iter().any(|queued| queued == item)
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for BlockingQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            inner: Mutex::new(iter.into_iter().collect()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let queue = BlockingQueue::new();
        for i in 0..10 {
            queue.enqueue(i);
        }
        for i in 0..10 {
            assert_eq!(queue.dequeue(), i);
        }
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            BlockingQueue::<u32>::with_capacity(0).err(),
            Some(QueueError::InvalidCapacity(0))
        );
    }

    #[test]
    fn test_bounded_try_add() {
        let queue = BlockingQueue::with_capacity(2).unwrap();
        assert!(queue.try_add(1).is_ok());
        assert!(queue.try_add(2).is_ok());
        assert_eq!(queue.try_add(3), Err(3));
        assert_eq!(queue.remaining_capacity(), Some(0));
    }

    #[test]
    fn test_backpressure_timeout() {
        let queue = BlockingQueue::with_capacity(1).unwrap();
        queue.enqueue(1);

        let start = Instant::now();
        let result = queue.try_enqueue(2, Duration::from_millis(50));
        let elapsed = start.elapsed();

        assert_eq!(result, Err(2));
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(500));
        assert_eq!(queue.len(), 1); // untouched by the failed attempt
    }

    #[test]
    fn test_dequeue_timeout_accounting() {
        let queue = BlockingQueue::<u32>::new();

        let start = Instant::now();
        let result = queue.try_dequeue(Duration::from_millis(100));
        let elapsed = start.elapsed();

        assert_eq!(result, None);
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(500));
    }

    #[test]
    fn test_blocked_producer_released_by_dequeue() {
        let queue = Arc::new(BlockingQueue::with_capacity(1).unwrap());
        queue.enqueue(1);

        let queue_clone = queue.clone();
        let producer = thread::spawn(move || queue_clone.enqueue(2));

        thread::sleep(Duration::from_millis(50));
        assert_eq!(queue.dequeue(), 1);

        producer.join().unwrap();
        assert_eq!(queue.dequeue(), 2);
    }

    #[test]
    fn test_clear_releases_blocked_producer() {
        let queue = Arc::new(BlockingQueue::with_capacity(1).unwrap());
        queue.enqueue(1);

        let queue_clone = queue.clone();
        let producer = thread::spawn(move || queue_clone.enqueue(2));

        thread::sleep(Duration::from_millis(50));
        queue.clear();

        producer.join().unwrap();
        assert_eq!(queue.try_take(), Some(2));
    }

    #[test]
    fn test_peek_does_not_remove() {
        let queue = BlockingQueue::new();
        assert_eq!(queue.peek(), Err(QueueError::Empty));
        assert_eq!(queue.try_peek(), None);

        queue.enqueue(7);
        assert_eq!(queue.peek(), Ok(7));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_snapshot_reads() {
        let queue: BlockingQueue<u32> = [1, 2, 3].into_iter().collect();

        assert!(queue.contains(&2));
        assert!(!queue.contains(&9));
        assert_eq!(queue.to_vec(), vec![1, 2, 3]);

        let mut dest = [0u32; 5];
        queue.copy_to(&mut dest, 1).unwrap();
        assert_eq!(dest, [0, 1, 2, 3, 0]);

        let mut small = [0u32; 2];
        assert_eq!(
            queue.copy_to(&mut small, 0),
            Err(QueueError::InsufficientSpace {
                needed: 3,
                available: 2
            })
        );
    }

    #[test]
    fn test_copy_to_offset_past_end() {
        let queue = BlockingQueue::<u32>::new();
        let mut dest = [0u32; 2];

        // Nothing to copy: an out-of-range offset is not a failure
        assert_eq!(queue.copy_to(&mut dest, 5), Ok(()));

        queue.enqueue(1);
        assert_eq!(
            queue.copy_to(&mut dest, 5),
            Err(QueueError::InsufficientSpace {
                needed: 1,
                available: 0
            })
        );
    }

    #[test]
    fn test_producer_consumer() {
        let queue = Arc::new(BlockingQueue::with_capacity(4).unwrap());

        let producer_queue = queue.clone();
        let producer = thread::spawn(move || {
            for i in 0..1_000 {
                producer_queue.enqueue(i);
            }
        });

        let consumer_queue = queue.clone();
        let consumer = thread::spawn(move || {
            (0..1_000)
                .map(|_| consumer_queue.dequeue())
                .collect::<Vec<_>>()
        });

        producer.join().unwrap();
        let received = consumer.join().unwrap();
        assert_eq!(received, (0..1_000).collect::<Vec<_>>());
    }
}
