/*!
 * Blocking Queue
 *
 * Monitor-based bounded/unbounded FIFO. For the non-blocking structures see
 * [`crate::lockfree`].
 */

mod blocking;

pub use blocking::BlockingQueue;
