//! The reservation registry.
//!
//! The registry owns every [`Reservation`] and the [`TimerQueue`] their
//! periodic timers live in. Records are kept sorted by owner, at most one per
//! task.
//!
//! The registry itself does no locking. The
//! [`ReservationManager`](crate::ReservationManager) keeps it behind one
//! spinlock, taken both by the system call path and by the timer interrupt.

use crate::{
    periodic::{self, Boundary},
    priority::{self, Assignment, Rank},
    reservation::Reservation,
};
use alloc::vec::Vec;
use keos::{
    KernelError,
    signal::{Signal, SignalSink},
    thread::Tid,
    timer::{Instant, TimerQueue},
};

/// The set of active reservations.
#[derive(Debug, Default)]
pub struct Registry {
    records: Vec<Reservation>,
    timers: TimerQueue<Tid>,
    ranks: Vec<Rank>,
}

impl Registry {
    /// Creates an empty registry.
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
            timers: TimerQueue::new(),
            ranks: Vec::new(),
        }
    }

    /// Number of active reservations.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there is no active reservation.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn position(&self, owner: Tid) -> Result<usize, usize> {
        self.records.binary_search_by_key(&owner, Reservation::owner)
    }

    /// Adds `record` and arms its timer for one period after its creation.
    ///
    /// # Errors
    /// - [`KernelError::AlreadyExists`] if the owner already has a record.
    /// - [`KernelError::NoMemory`] if there is no memory for the record or its
    ///   timer. Nothing is added.
    pub fn insert(&mut self, mut record: Reservation) -> Result<(), KernelError> {
        let Err(idx) = self.position(record.owner()) else {
            return Err(KernelError::AlreadyExists);
        };
        self.records
            .try_reserve(1)
            .map_err(|_| KernelError::NoMemory)?;
        self.ranks.clear();
        self.ranks
            .try_reserve(self.records.len() + 1)
            .map_err(|_| KernelError::NoMemory)?;
        self.timers.try_reserve(1)?;

        let (owner, created_at) = (record.owner(), record.created_at());
        record.timer.arm(&mut self.timers, owner, created_at);
        self.records.insert(idx, record);
        Ok(())
    }

    /// Removes the record of `owner` and cancels its timer.
    pub fn remove(&mut self, owner: Tid) -> Option<Reservation> {
        let idx = self.position(owner).ok()?;
        let mut record = self.records.remove(idx);
        record.timer.cancel(&mut self.timers);
        Some(record)
    }

    /// The record of `owner`.
    pub fn find(&self, owner: Tid) -> Option<&Reservation> {
        self.position(owner).ok().map(|idx| &self.records[idx])
    }

    /// The record of `owner`, mutably.
    pub fn find_mut(&mut self, owner: Tid) -> Option<&mut Reservation> {
        self.position(owner).ok().map(|idx| &mut self.records[idx])
    }

    /// Calls `f` on every record, in order of owner.
    pub fn for_each(&self, f: impl FnMut(&Reservation)) {
        self.records.iter().for_each(f)
    }

    /// Iterates over the records, in order of owner.
    pub fn iter(&self) -> impl Iterator<Item = &Reservation> {
        self.records.iter()
    }

    /// Number of armed timers. Always equal to [`len`](Self::len).
    pub fn armed_timers(&self) -> usize {
        self.timers.len()
    }

    /// Handles every period boundary that is due at `now`.
    ///
    /// Each due record goes through [`periodic::fire`], then `on_boundary`
    /// sees the outcome, then the record's timer is armed again one period
    /// after `now`. Returns the number of boundaries handled.
    pub fn expire(
        &mut self,
        now: Instant,
        signals: &impl SignalSink,
        signal: Signal,
        mut on_boundary: impl FnMut(&Reservation, &Boundary),
    ) -> usize {
        let mut fired = 0;
        while let Some(expired) = self.timers.pop_expired(now) {
            let Ok(idx) = self.position(expired.payload) else {
                continue;
            };
            let record = &mut self.records[idx];
            if record.timer.id() != Some(expired.id) {
                continue;
            }
            let boundary = periodic::fire(record, signals, signal);
            on_boundary(record, &boundary);
            record.timer.arm(&mut self.timers, boundary.owner, now);
            fired += 1;
        }
        fired
    }

    /// Ranks every record rate-monotonically between `max` and `min`.
    ///
    /// Each record remembers the priority it was given. The ranking is
    /// returned in order of increasing period.
    pub fn rank(&mut self, max: u8, min: u8) -> (&[Rank], Assignment) {
        self.ranks.clear();
        self.ranks
            .extend(self.records.iter().map(|r| Rank::new(r.owner(), r.period())));
        let assignment = priority::assign(&mut self.ranks, max, min);
        for rank in self.ranks.iter() {
            if let Ok(idx) = self
                .records
                .binary_search_by_key(&rank.owner, Reservation::owner)
            {
                self.records[idx].priority = Some(rank.priority);
            }
        }
        (&self.ranks, assignment)
    }
}
