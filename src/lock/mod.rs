/*!
 * Lock Primitives
 *
 * - [`ReentrantMutex`]: reentrant hybrid lock, atomic fast path, semaphore
 *   parking only under contention
 * - [`ReadersWriterLock`]: reader-preferring RW lock composed from two
 *   reentrant mutexes
 */

mod mutex;
mod rwlock;
mod wait;

pub use mutex::{MutexGuard, ReentrantMutex};
pub use rwlock::{ReadGuard, ReadersWriterLock, WriteGuard};
