//! Thread abstraction, as seen by the reservation subsystem.
//!
//! ## The threading model
//!
//! An executing kernel consists of a collection of threads, each identified
//! by a [`Tid`]. The reservation subsystem never owns a thread: it refers to
//! one by id, asks the [`TaskDirectory`] which thread is running and whether
//! an id is live, and blocks the running thread through [`Park`].
//!
//! Blocking is split in two halves. [`Park::park_with`] hands the caller a
//! [`ParkHandle`] for the running thread and suspends it once the closure
//! returns. Whoever holds the handle wakes the thread with
//! [`ParkHandle::unpark`]. Because the handle is published inside the closure,
//! a thread can store its handle in a lock-protected structure and release
//! the lock before it is suspended, and still never miss its wake-up.
pub mod scheduler;

use crate::KernelError;
use alloc::boxed::Box;

/// Thread identifier.
///
/// `0` never names a thread; system calls use it to mean "the caller".
pub type Tid = u64;

/// A handle that represent the parked thread.
pub struct ParkHandle {
    tid: Tid,
    waker: Box<dyn FnOnce() + Send>,
}

impl ParkHandle {
    /// Creates a handle for the thread `tid`, woken by running `waker`.
    ///
    /// `waker` must make the thread runnable again even if it runs before the
    /// thread has actually been suspended.
    pub fn new(tid: Tid, waker: impl FnOnce() + Send + 'static) -> Self {
        Self {
            tid,
            waker: Box::new(waker),
        }
    }

    /// The thread this handle wakes.
    pub fn tid(&self) -> Tid {
        self.tid
    }

    /// Consume the handle and unpark the underlying thread.
    pub fn unpark(self) {
        (self.waker)()
    }
}

impl core::fmt::Debug for ParkHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ParkHandle").field("tid", &self.tid).finish()
    }
}

/// Resolves thread identities.
pub trait TaskDirectory {
    /// The thread running on the calling core, if any.
    ///
    /// Returns `None` in interrupt context on an idle core.
    fn current(&self) -> Option<Tid>;

    /// Resolves `tid` to a live thread.
    ///
    /// # Errors
    /// [`KernelError::NoSuchTask`] if no live thread has that id.
    fn lookup(&self, tid: Tid) -> Result<Tid, KernelError>;
}

/// Suspends the running thread.
pub trait Park {
    /// Run a function `f` with [`ParkHandle`] for current thread, and then park
    /// the current thread.
    ///
    /// Returns once the handle has been unparked. `f` must not block.
    fn park_with(&self, f: impl FnOnce(ParkHandle));
}
