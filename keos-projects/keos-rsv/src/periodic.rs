//! Periodic timers and period boundaries.
//!
//! Every reservation has its own timer. The first boundary comes one period
//! after the reservation was made, so reservations made at different times
//! are not aligned to each other.
//!
//! When the timer fires, the boundary is handled in this order, with the
//! registry locked:
//!
//! 1. If the owner consumed more than its budget, it is sent the overrun
//!    signal.
//! 2. The consumed time is reset to zero.
//! 3. The owner is woken if it is waiting for this boundary.
//! 4. The timer is armed again one period after the moment it fired.
//!
//! The timer is re-armed relative to when the tick actually handled it, not
//! to the deadline it was armed for. A boundary handled one tick late shifts
//! all later boundaries by that tick; the delay accumulates rather than being
//! corrected against the creation time.
//!
//! Overrun is only sampled at boundaries. A task can run far past its budget
//! inside a period and is told about it only when the period ends.

use crate::reservation::Reservation;
use core::time::Duration;
use keos::{
    signal::{Signal, SignalSink},
    thread::Tid,
    timer::{Instant, TimerId, TimerQueue},
};

bitflags::bitflags! {
    /// What happened at a period boundary.
    pub struct FireFlags: u8 {
        /// The owner overran its budget and was signalled.
        const OVERRUN = 1 << 0;
        /// The owner was waiting for the boundary and was woken.
        const WOKE = 1 << 1;
    }
}

/// The timer of a single reservation.
#[derive(Debug)]
pub struct PeriodicTimer {
    period: Duration,
    armed: Option<(TimerId, Instant)>,
}

impl PeriodicTimer {
    pub(crate) fn new(period: Duration) -> Self {
        Self {
            period,
            armed: None,
        }
    }

    /// The interval between two fires.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// When the timer fires next, if it is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.armed.map(|(_, deadline)| deadline)
    }

    pub(crate) fn id(&self) -> Option<TimerId> {
        self.armed.map(|(id, _)| id)
    }

    /// Arms the timer to fire one period after `from`.
    ///
    /// The queue must have room for one more timer.
    pub(crate) fn arm(&mut self, queue: &mut TimerQueue<Tid>, owner: Tid, from: Instant) {
        self.cancel(queue);
        let deadline = from + self.period;
        self.armed = Some((queue.arm(deadline, owner), deadline));
    }

    pub(crate) fn cancel(&mut self, queue: &mut TimerQueue<Tid>) {
        if let Some((id, _)) = self.armed.take() {
            queue.cancel(id);
        }
    }
}

/// A period boundary, as handled by [`fire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    /// The reservation's owner.
    pub owner: Tid,
    /// CPU time consumed in the period that just ended.
    pub consumed: Duration,
    /// `consumed` as a percentage of the budget. `None` for a zero budget.
    pub utilization: Option<u64>,
    /// What was done.
    pub flags: FireFlags,
}

/// `consumed` as a percentage of `budget`, or `None` when `budget` is zero.
pub fn utilization(consumed: Duration, budget: Duration) -> Option<u64> {
    let budget = budget.as_nanos();
    if budget == 0 {
        return None;
    }
    Some(u64::try_from(consumed.as_nanos() * 100 / budget).unwrap_or(u64::MAX))
}

/// Handles a period boundary of `record`.
///
/// Performs steps 1 to 3 of the boundary; re-arming is left to the registry,
/// which owns the timer queue. Never fails.
pub fn fire(record: &mut Reservation, signals: &impl SignalSink, signal: Signal) -> Boundary {
    let mut flags = FireFlags::empty();
    let consumed = record.consumed;
    let mut usage = None;

    if record.is_overrun() {
        signals.send_signal(record.owner(), signal);
        usage = utilization(consumed, record.budget());
        record.overruns += 1;
        flags |= FireFlags::OVERRUN;
    }

    record.consumed = Duration::ZERO;
    record.periods += 1;

    if let Some(waiter) = record.waiter.take() {
        waiter.unpark();
        flags |= FireFlags::WOKE;
    }

    Boundary {
        owner: record.owner(),
        consumed,
        utilization: usage,
        flags,
    }
}
