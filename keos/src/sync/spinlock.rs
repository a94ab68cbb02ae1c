//! SMP-supported spinlock.
//!
//! On a single core it is enough to keep the lock holder from being
//! preempted. With several cores, tasks on other cores reach the protected
//! data concurrently, so a core acquiring the lock atomically tests and sets
//! a flag and spins while another core owns it.
//!
//! The reservation registry is touched from two contexts: system calls made
//! by tasks, and the periodic timer interrupt. The lock therefore also masks
//! interrupts on the local core for as long as the guard lives; otherwise the
//! timer interrupt could spin forever on a lock owned by the very task it
//! interrupted.

pub use abyss::spinlock::WouldBlock;

/// A mutual exclusion primitive useful for protecting shared data
///
/// This spinlock will block threads waiting for the lock to become available.
/// The spinlock can be created via a [`new`] constructor. Each spinlock has a
/// type parameter which represents the data that it is protecting. The data can
/// only be accessed through the guards returned from [`lock`] and
/// [`try_lock`], which guarantees that the data is only ever accessed when the
/// spinlock is locked.
///
/// [`new`]: Self::new
/// [`lock`]: Self::lock
/// [`try_lock`]: Self::try_lock
///
/// # Examples
///
/// ```ignore
/// use alloc::sync::Arc;
/// use keos::sync::SpinLock;
///
/// // The number of periods that elapsed, shared between the timer interrupt
/// // and the task that waits for the next period.
/// let periods = Arc::new(SpinLock::new(0u64));
///
/// let mut guard = periods.lock();
/// *guard += 1;
/// // the lock must be "explicitly" unlocked.
/// guard.unlock();
/// ```
///
/// A guard may be moved into a closure, and unlocked there:
///
/// ```ignore
/// let guard = periods.lock();
/// current.park_with(move |handle| {
///     // publish `handle` while the lock is still held.
///     guard.unlock();
/// });
/// ```
pub use abyss::spinlock::SpinLock;
pub use abyss::spinlock::SpinLockGuard;
