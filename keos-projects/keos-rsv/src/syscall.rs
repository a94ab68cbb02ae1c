//! # System calls for reservations.
//!
//! | number | call | arguments |
//! |---|---|---|
//! | 397 | `set_rsv` | `pid`, `const struct timespec *budget`, `const struct timespec *period` |
//! | 398 | `cancel_rsv` | `pid` |
//! | 399 | `wait_until_next_period` | none |
//!
//! `pid` 0 is the calling task. Each call returns 0 on success, or a negated
//! errno (see [`KernelError::into_usize`]).
//!
//! The kernel's system call entry builds a [`SyscallAbi`] from the registers
//! of the calling task, and hands it to [`ReservationManager::syscall`]
//! together with a [`UserMemory`] that can read the caller's address space.

use crate::{Kernel, ReservationManager};
use keos::{KernelError, thread::Tid, timer::Timespec};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// System call numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(usize)]
pub enum SyscallNumber {
    /// `set_rsv(pid, budget, period)`.
    SetRsv = 397,
    /// `cancel_rsv(pid)`.
    CancelRsv = 398,
    /// `wait_until_next_period()`.
    WaitUntilNextPeriod = 399,
}

/// A struct representing the system call ABI (Application Binary Interface).
///
/// It stores the system call number and up to six arguments that are passed
/// to the kernel during a system call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyscallAbi {
    /// The system call number that identifies the requested system service.
    pub sysno: usize,
    /// First argument for the system call.
    pub arg1: usize,
    /// Second argument for the system call.
    pub arg2: usize,
    /// Third argument for the system call.
    pub arg3: usize,
    /// Fourth argument for the system call.
    pub arg4: usize,
    /// Fifth argument for the system call.
    pub arg5: usize,
    /// Sixth argument for the system call.
    pub arg6: usize,
}

impl SyscallAbi {
    /// Constructs a [`SyscallAbi`] from the system call number and the
    /// argument registers, in ABI order.
    pub fn new(sysno: usize, args: [usize; 6]) -> Self {
        let [arg1, arg2, arg3, arg4, arg5, arg6] = args;
        Self {
            sysno,
            arg1,
            arg2,
            arg3,
            arg4,
            arg5,
            arg6,
        }
    }

    /// The value to leave in the return register: the success value, or the
    /// error code from [`KernelError::into_usize`].
    pub fn return_value(return_val: Result<usize, KernelError>) -> usize {
        match return_val {
            Ok(v) => v,
            Err(e) => e.into_usize(),
        }
    }

    /// Reads `arg` as a `pid_t`. A negative pid names no task.
    fn pid(arg: usize) -> Result<Tid, KernelError> {
        let pid = arg as u32 as i32;
        Tid::try_from(pid).map_err(|_| KernelError::NoSuchTask)
    }
}

/// Access to the calling task's address space.
pub trait UserMemory {
    /// Reads a `struct timespec` at user address `addr`.
    ///
    /// # Errors
    /// [`KernelError::BadAddress`] if the address is not readable.
    fn read_timespec(&self, addr: usize) -> Result<Timespec, KernelError>;
}

impl<K: Kernel> ReservationManager<K> {
    /// Serves a reservation system call.
    ///
    /// Returns the value for the caller's return register.
    pub fn syscall(&self, abi: &SyscallAbi, mem: &impl UserMemory) -> usize {
        SyscallAbi::return_value(self.dispatch(abi, mem))
    }

    fn dispatch(&self, abi: &SyscallAbi, mem: &impl UserMemory) -> Result<usize, KernelError> {
        let sysno =
            SyscallNumber::try_from(abi.sysno).map_err(|_| KernelError::NoSuchSyscall)?;
        match sysno {
            SyscallNumber::SetRsv => {
                let budget = mem.read_timespec(abi.arg2)?;
                let period = mem.read_timespec(abi.arg3)?;
                self.set_reservation(SyscallAbi::pid(abi.arg1)?, budget, period)?;
            }
            SyscallNumber::CancelRsv => self.cancel_reservation(SyscallAbi::pid(abi.arg1)?)?,
            SyscallNumber::WaitUntilNextPeriod => self.wait_until_next_period()?,
        }
        Ok(0)
    }
}
