//! Synchronization primitives.
//!
//! The reservation registry is guarded by a single [`SpinLock`]. Both the
//! system call path and the timer interrupt take it, so the lock masks local
//! interrupts while held.
pub mod atomic;
pub mod spinlock;

pub use spinlock::{SpinLock, SpinLockGuard, WouldBlock};
