/*!
 * Queue and Stack Integration Tests
 *
 * Multiset conservation under full producer/consumer contention, ordering
 * properties, and timeout accounting.
 */

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use threadkit::{BlockingQueue, LockFreeQueue, LockFreeStack};

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

#[test]
fn test_lockfree_queue_mpmc_conservation() {
    const PRODUCERS: u64 = 8;
    const PER_PRODUCER: u64 = 10_000;

    init_tracing();
    let queue = Arc::new(LockFreeQueue::new());

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    queue.enqueue(producer * PER_PRODUCER + i);
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let queue = queue.clone();
            thread::spawn(move || {
                let mut seen = Vec::with_capacity(PER_PRODUCER as usize);
                while seen.len() < PER_PRODUCER as usize {
                    match queue.try_dequeue() {
                        Some(value) => seen.push(value),
                        None => thread::yield_now(),
                    }
                }
                seen
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }

    let mut all = HashSet::new();
    for consumer in consumers {
        for value in consumer.join().unwrap() {
            assert!(all.insert(value), "value {value} dequeued twice");
        }
    }

    assert_eq!(all.len(), (PRODUCERS * PER_PRODUCER) as usize);
    assert!(queue.is_empty());
}

#[test]
fn test_lockfree_stack_mpmc_conservation() {
    const PUSHERS: u64 = 8;
    const PER_PUSHER: u64 = 10_000;

    let stack = Arc::new(LockFreeStack::new());

    let pushers: Vec<_> = (0..PUSHERS)
        .map(|pusher| {
            let stack = stack.clone();
            thread::spawn(move || {
                for i in 0..PER_PUSHER {
                    stack.push(pusher * PER_PUSHER + i);
                }
            })
        })
        .collect();

    let poppers: Vec<_> = (0..PUSHERS)
        .map(|_| {
            let stack = stack.clone();
            thread::spawn(move || {
                let mut seen = Vec::with_capacity(PER_PUSHER as usize);
                while seen.len() < PER_PUSHER as usize {
                    match stack.try_pop() {
                        Some(value) => seen.push(value),
                        None => thread::yield_now(),
                    }
                }
                seen
            })
        })
        .collect();

    for pusher in pushers {
        pusher.join().unwrap();
    }

    let mut all = HashSet::new();
    for popper in poppers {
        for value in popper.join().unwrap() {
            assert!(all.insert(value), "value {value} popped twice");
        }
    }

    assert_eq!(all.len(), (PUSHERS * PER_PUSHER) as usize);
    assert!(stack.is_empty());
}

#[test]
fn test_blocking_queue_bounded_mpmc_conservation() {
    const PRODUCERS: u32 = 4;
    const PER_PRODUCER: u32 = 2_500;

    let queue = Arc::new(BlockingQueue::with_capacity(4).unwrap());

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    queue.enqueue(producer * PER_PRODUCER + i);
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let queue = queue.clone();
            thread::spawn(move || {
                (0..PER_PRODUCER)
                    .map(|_| queue.dequeue())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }

    let mut all = HashSet::new();
    for consumer in consumers {
        for value in consumer.join().unwrap() {
            assert!(all.insert(value), "value {value} dequeued twice");
        }
    }

    assert_eq!(all.len(), (PRODUCERS * PER_PRODUCER) as usize);
    assert!(queue.is_empty());
}

#[test]
fn test_blocking_queue_timeout_accounting() {
    let queue = BlockingQueue::<u32>::new();

    let start = Instant::now();
    let result = queue.try_dequeue(Duration::from_millis(100));
    let elapsed = start.elapsed();

    assert_eq!(result, None);
    // Approximately 100ms: not near-instant, not unbounded
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(600));
}

#[test]
fn test_blocking_queue_backpressure_window() {
    let queue = Arc::new(BlockingQueue::with_capacity(1).unwrap());
    queue.enqueue(1);

    let queue_clone = queue.clone();
    let start = Instant::now();
    let blocked = thread::spawn(move || queue_clone.try_enqueue(2, Duration::from_millis(50)));

    let result = blocked.join().unwrap();
    assert_eq!(result, Err(2));
    // The producer unblocked within the timeout window, not indefinitely
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[test]
fn test_blocking_queue_random_ops_match_model() {
    let mut rng = StdRng::seed_from_u64(7);
    let queue = BlockingQueue::with_capacity(8).unwrap();
    let mut model = VecDeque::new();

    for i in 0..10_000u32 {
        if rng.gen_bool(0.55) {
            match queue.try_add(i) {
                Ok(()) => model.push_back(i),
                Err(_) => assert_eq!(model.len(), 8),
            }
        } else {
            assert_eq!(queue.try_take(), model.pop_front());
        }
    }

    assert_eq!(queue.to_vec(), model.into_iter().collect::<Vec<_>>());
}

proptest! {
    #[test]
    fn prop_blocking_queue_fifo(items in proptest::collection::vec(any::<u32>(), 0..200)) {
        let queue = BlockingQueue::new();
        for &item in &items {
            queue.try_add(item).unwrap();
        }

        let mut drained = Vec::new();
        while let Some(item) = queue.try_take() {
            drained.push(item);
        }
        prop_assert_eq!(drained, items);
    }

    #[test]
    fn prop_lockfree_queue_fifo(items in proptest::collection::vec(any::<u32>(), 0..200)) {
        let queue = LockFreeQueue::with_items(items.iter().copied());

        let mut drained = Vec::new();
        while let Some(item) = queue.try_dequeue() {
            drained.push(item);
        }
        prop_assert_eq!(drained, items);
    }

    #[test]
    fn prop_lockfree_stack_lifo(items in proptest::collection::vec(any::<u32>(), 0..200)) {
        let stack = LockFreeStack::with_items(items.iter().copied());

        let mut drained = Vec::new();
        while let Some(item) = stack.try_pop() {
            drained.push(item);
        }
        let mut expected = items;
        expected.reverse();
        prop_assert_eq!(drained, expected);
    }
}
