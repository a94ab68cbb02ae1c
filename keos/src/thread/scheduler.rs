//! Thread scheduler interface.
//!
//! The scheduler itself belongs to the rest of the kernel. The reservation
//! subsystem only decides *which* real-time priority each reserved thread
//! deserves, and hands the decision over through a [`PriorityHook`].

use super::Tid;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The highest real-time priority a thread can be given.
pub const MAX_RT_PRIORITY: u8 = 99;

/// The lowest real-time priority a thread can be given.
pub const MIN_RT_PRIORITY: u8 = 1;

/// Scheduling policy of a thread.
///
/// The discriminants are the `SCHED_*` constants of the system call ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum SchedPolicy {
    /// Time-shared scheduling. Its priority is always 0.
    Normal = 0,
    /// Real-time, first-in first-out within a priority level.
    Fifo = 1,
    /// Real-time, round robin within a priority level.
    RoundRobin = 2,
}

impl SchedPolicy {
    /// Whether this is one of the real-time policies.
    pub fn is_realtime(self) -> bool {
        !matches!(self, SchedPolicy::Normal)
    }
}

/// A trait through which priorities are handed to the thread scheduler.
///
/// The scheduler is expected to honor the priority on its next scheduling
/// decision. The hook is called with the reservation registry locked, so it
/// must neither block nor call back into the reservation subsystem.
pub trait PriorityHook {
    /// Sets the policy and priority of `tid`.
    ///
    /// A real-time `policy` comes with a priority in
    /// [`MIN_RT_PRIORITY`]`..=`[`MAX_RT_PRIORITY`];
    /// [`SchedPolicy::Normal`] comes with 0.
    fn set_priority(&self, tid: Tid, policy: SchedPolicy, priority: u8);
}
