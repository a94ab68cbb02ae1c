//! The reservation record.

use crate::periodic::PeriodicTimer;
use core::time::Duration;
use keos::{
    sync::atomic::AtomicU64,
    thread::{ParkHandle, Tid},
    timer::Instant,
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A CPU reservation held by one task.
///
/// `budget` and `period` never change once the record is created. A task
/// that wants different parameters cancels its reservation and makes a new
/// one.
///
/// The record's timer is armed for as long as the record is in a
/// [`Registry`](crate::Registry).
#[derive(Debug)]
pub struct Reservation {
    id: u64,
    owner: Tid,
    budget: Duration,
    period: Duration,
    created_at: Instant,
    pub(crate) consumed: Duration,
    pub(crate) timer: PeriodicTimer,
    pub(crate) waiter: Option<ParkHandle>,
    pub(crate) periods: u64,
    pub(crate) overruns: u64,
    pub(crate) priority: Option<u8>,
}

impl Reservation {
    /// Creates a record for `owner`, starting its first period at
    /// `created_at`.
    ///
    /// The record gets a generation id no other record ever had.
    pub fn new(owner: Tid, budget: Duration, period: Duration, created_at: Instant) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1),
            owner,
            budget,
            period,
            created_at,
            consumed: Duration::ZERO,
            timer: PeriodicTimer::new(period),
            waiter: None,
            periods: 0,
            overruns: 0,
            priority: None,
        }
    }

    /// Generation id of this record.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The task holding the reservation.
    pub fn owner(&self) -> Tid {
        self.owner
    }

    /// When the reservation was made.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// CPU time the owner may use per period.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Length of a period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// CPU time charged to the owner in the current period.
    pub fn consumed(&self) -> Duration {
        self.consumed
    }

    /// Adds `elapsed` to the time consumed in the current period.
    pub fn charge(&mut self, elapsed: Duration) {
        self.consumed = self.consumed.saturating_add(elapsed);
    }

    /// Whether the owner has used more than its budget in the current period.
    pub fn is_overrun(&self) -> bool {
        self.consumed > self.budget
    }

    /// Number of period boundaries seen so far.
    pub fn periods(&self) -> u64 {
        self.periods
    }

    /// Number of those boundaries at which the owner had overrun.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// The record's periodic timer.
    pub fn timer(&self) -> &PeriodicTimer {
        &self.timer
    }

    /// Takes a point-in-time copy of the record.
    pub fn stat(&self) -> ReservationStat {
        ReservationStat {
            owner: self.owner,
            budget: self.budget,
            period: self.period,
            consumed: self.consumed,
            created_at: self.created_at,
            next_boundary: self.timer.deadline(),
            periods: self.periods,
            overruns: self.overruns,
            priority: self.priority,
            waiting: self.waiter.is_some(),
        }
    }
}

/// A snapshot of a [`Reservation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationStat {
    /// The task holding the reservation.
    pub owner: Tid,
    /// CPU time the owner may use per period.
    pub budget: Duration,
    /// Length of a period.
    pub period: Duration,
    /// CPU time charged in the current period.
    pub consumed: Duration,
    /// When the reservation was made.
    pub created_at: Instant,
    /// When the current period ends, if the timer is armed.
    pub next_boundary: Option<Instant>,
    /// Number of period boundaries seen so far.
    pub periods: u64,
    /// Number of those boundaries at which the owner had overrun.
    pub overruns: u64,
    /// The real-time priority last handed to the scheduler.
    pub priority: Option<u8>,
    /// Whether the owner is blocked until its next period.
    pub waiting: bool,
}
