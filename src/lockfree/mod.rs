/*!
 * Lock-Free Collections
 *
 * Non-blocking structures built directly on atomic compare-and-swap:
 * - [`LockFreeQueue`]: Michael & Scott FIFO with cooperative tail advance
 * - [`LockFreeStack`]: Treiber LIFO on a single atomic root
 *
 * Both are lock-free, not wait-free: an individual operation may retry its
 * CAS indefinitely under contention, but every failed retry means some other
 * thread's operation succeeded. Node reclamation is epoch-based
 * (crossbeam-epoch), applied uniformly to both structures.
 */

mod queue;
mod stack;

pub use queue::LockFreeQueue;
pub use stack::LockFreeStack;
