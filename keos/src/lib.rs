//! # KeOS kernel services for periodic CPU reservations
//!
//! This crate is the layer between the hardware-facing [`abyss`] crate and the
//! reservation subsystem in `keos-rsv`. It provides the pieces a reservation
//! needs from the rest of the kernel, and nothing more:
//!
//! - [`KernelError`]: the error type shared by every kernel operation, with
//!   its errno encoding for system call return values.
//! - [`sync`]: the SMP spinlock and sequentially consistent atomics.
//! - [`thread`]: task identities, the [`ParkHandle`] used to block and wake a
//!   task, and the [`TaskDirectory`] that resolves task ids.
//! - [`thread::scheduler`]: scheduling policies and the [`PriorityHook`]
//!   through which real-time priorities are handed to the scheduler.
//! - [`signal`]: signal numbers and the [`SignalSink`] that delivers them.
//! - [`timer`]: monotonic time, `struct timespec`, and the one-shot
//!   [`TimerQueue`] that periodic timers are built on.
//!
//! The scheduler, the task table, signal delivery and the clock are owned by
//! the rest of the kernel. They are reached only through the traits above, so
//! a kernel plugs its own implementations in and a host test harness plugs in
//! simulated ones.
//!
//! ## Locking
//!
//! [`SpinLock`] does **not** release the lock when its guard is dropped.
//! Every guard must be released with [`SpinLockGuard::unlock`]; dropping a
//! locked guard panics and reports where the lock was taken. This makes the
//! point where a critical section ends visible in the code, which matters
//! when a guard is handed to a closure that runs while the caller is being
//! parked.
//!
//! ## Console
//!
//! [`info!`], [`warning!`], [`alert!`] and [`debug!`] print to the console
//! registered with [`console::register_console`]. Before a console is
//! registered the messages are dropped.
//!
//! ## Interrupts
//!
//! Local interrupts are masked through the platform's
//! [`interrupt::InterruptControl`], registered once with
//! [`interrupt::register_control`]. Without one, masking does nothing and
//! every caller runs on core 0.
//!
//! [`ParkHandle`]: thread::ParkHandle
//! [`TaskDirectory`]: thread::TaskDirectory
//! [`PriorityHook`]: thread::scheduler::PriorityHook
//! [`SignalSink`]: signal::SignalSink
//! [`TimerQueue`]: timer::TimerQueue
//! [`SpinLock`]: sync::SpinLock
//! [`SpinLockGuard::unlock`]: sync::SpinLockGuard::unlock

#![cfg_attr(not(test), no_std)]
#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

extern crate alloc;

pub mod signal;
pub mod sync;
pub mod thread;
pub mod timer;

pub use abyss::{MAX_CPU, alert, debug, info, print, println, warning};

/// Processor intrinsics.
pub mod intrinsics {
    pub use abyss::cpuid;
}

/// The kernel console.
pub mod console {
    pub use abyss::kprint::{Console, register_console};
}

/// Local interrupt control.
pub mod interrupt {
    pub use abyss::interrupt::{
        InterruptControl, InterruptGuard, InterruptState, register_control,
    };
}

/// Enum representing errors that can occur during a kernel operation.
///
/// This enum is used to categorize errors encountered by the kernel operation.
/// Each variant corresponds to a specific type of error that might
/// occur during the handling of a kernel operation. These errors can be
/// returned to the user program to indicate the nature of the failure.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum KernelError {
    /// The caller has no reservation to operate on. (ENOENT)
    NoSuchReservation,
    /// No such task. (ESRCH)
    NoSuchTask,
    /// Out of memory. (ENOMEM)
    NoMemory,
    /// Bad address. (EFAULT)
    BadAddress,
    /// The target already holds a reservation. (EBUSY)
    AlreadyExists,
    /// Invalid argument. (EINVAL)
    InvalidArgument,
    /// Invalid system call number. (ENOSYS)
    NoSuchSyscall,
}

impl KernelError {
    /// Converts the [`KernelError`] enum into a corresponding `isize` error
    /// code.
    pub fn into_isize(self) -> isize {
        match self {
            KernelError::NoSuchReservation => -2,
            KernelError::NoSuchTask => -3,
            KernelError::NoMemory => -12,
            KernelError::BadAddress => -14,
            KernelError::AlreadyExists => -16,
            KernelError::InvalidArgument => -22,
            KernelError::NoSuchSyscall => -38,
        }
    }

    /// Converts the [`KernelError`] enum into a corresponding `usize` error
    /// code. The result is cast to `usize` for use as a return value in
    /// system calls.
    pub fn into_usize(self) -> usize {
        self.into_isize() as usize
    }
}

impl core::fmt::Display for KernelError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            KernelError::NoSuchReservation => "no such reservation",
            KernelError::NoSuchTask => "no such task",
            KernelError::NoMemory => "out of memory",
            KernelError::BadAddress => "bad address",
            KernelError::AlreadyExists => "reservation already exists",
            KernelError::InvalidArgument => "invalid argument",
            KernelError::NoSuchSyscall => "no such system call",
        };
        write!(f, "{msg} ({})", self.into_isize())
    }
}

/// The given `isize` does not indicate an [`KernelError`].
#[derive(Debug, Eq, PartialEq)]
pub struct TryFromError {
    e: isize,
}

impl TryFrom<isize> for KernelError {
    type Error = TryFromError;

    fn try_from(value: isize) -> Result<Self, Self::Error> {
        match value {
            -2 => Ok(Self::NoSuchReservation),
            -3 => Ok(Self::NoSuchTask),
            -12 => Ok(Self::NoMemory),
            -14 => Ok(Self::BadAddress),
            -16 => Ok(Self::AlreadyExists),
            -22 => Ok(Self::InvalidArgument),
            -38 => Ok(Self::NoSuchSyscall),
            e => Err(TryFromError { e }),
        }
    }
}

impl TryFrom<usize> for KernelError {
    type Error = TryFromError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::try_from(value as isize)
    }
}
