//! Concurrency primitives shared by edit tool invocations.
//!
//! - [`LockManager`]: per-key multi-reader/single-writer locks with FIFO,
//!   writer-priority queuing and cancel-safe acquisition.
//! - [`Semaphore`]: bounded concurrency for expensive operations.
//!
//! Both suspend the calling task rather than blocking a thread, and both hand
//! out guard objects that release on drop.

pub mod errors;
pub mod lock;
pub mod semaphore;

pub use errors::SyncError;
pub use lock::{LockHandle, LockManager, LockMode, LockStats};
pub use semaphore::{Permit, Semaphore};
