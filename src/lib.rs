/*!
 * threadkit
 *
 * A small toolkit of low-level concurrency primitives:
 *
 * - [`ReentrantMutex`]: reentrant hybrid lock; one atomic op when
 *   uncontended, parks on a wait primitive only under contention
 * - [`ReadersWriterLock`]: reader-preferring RW lock composed from two
 *   reentrant mutexes
 * - [`BlockingQueue`]: monitor-based FIFO with optional bound, blocking,
 *   timed, and non-blocking operation families
 * - [`LockFreeQueue`]: Michael & Scott MPMC FIFO on atomic head/tail CAS
 * - [`LockFreeStack`]: Treiber MPMC LIFO on a single atomic root CAS
 * - [`ScopedRelease`]: run a cleanup action at most once, on release or drop
 *
 * All five primitives are independent and composable; they share no runtime
 * state. The blocking types may truly block the calling thread; the
 * lock-free types only retry compare-and-swap and never block.
 */

pub mod errors;
pub mod guard;
pub mod lock;
pub mod lockfree;
pub mod queue;

pub use errors::{LockError, LockResult, QueueError, QueueResult};
pub use guard::ScopedRelease;
pub use lock::{MutexGuard, ReadGuard, ReadersWriterLock, ReentrantMutex, WriteGuard};
pub use lockfree::{LockFreeQueue, LockFreeStack};
pub use queue::BlockingQueue;
