//! A bounded log of what happened to reservations.
//!
//! Events are pushed from the timer interrupt, so the log never blocks and
//! never allocates after it is created. When it is full, the oldest event is
//! overwritten.

use alloc::vec::Vec;
use core::time::Duration;
use crossbeam_queue::ArrayQueue;
use keos::{thread::Tid, timer::Instant};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A reservation was made.
    Created {
        /// Its budget.
        budget: Duration,
        /// Its period.
        period: Duration,
    },
    /// A reservation was cancelled.
    Canceled,
    /// A new period started.
    PeriodStart {
        /// How many periods have ended so far, this one included.
        index: u64,
    },
    /// The period that just ended was overrun.
    Overrun {
        /// CPU time consumed in that period.
        consumed: Duration,
        /// `consumed` as a percentage of the budget, unless the budget is
        /// zero.
        utilization: Option<u64>,
    },
}

/// A timestamped [`EventKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// When it happened.
    pub at: Instant,
    /// Whose reservation it concerns.
    pub owner: Tid,
    /// What happened.
    pub kind: EventKind,
}

/// The event ring.
pub struct EventLog {
    ring: Option<ArrayQueue<Event>>,
}

impl EventLog {
    /// Creates a log holding up to `capacity` events. A zero capacity turns
    /// the log off.
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: (capacity > 0).then(|| ArrayQueue::new(capacity)),
        }
    }

    /// Maximum number of events held.
    pub fn capacity(&self) -> usize {
        self.ring.as_ref().map_or(0, ArrayQueue::capacity)
    }

    /// Number of events held.
    pub fn len(&self) -> usize {
        self.ring.as_ref().map_or(0, ArrayQueue::len)
    }

    /// Whether no event is held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends an event, dropping the oldest one if the log is full.
    pub fn record(&self, at: Instant, owner: Tid, kind: EventKind) {
        if let Some(ring) = &self.ring {
            ring.force_push(Event { at, owner, kind });
        }
    }

    /// Removes and returns every held event, oldest first.
    pub fn drain(&self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.len());
        if let Some(ring) = &self.ring {
            while let Some(event) = ring.pop() {
                events.push(event);
            }
        }
        events
    }
}

impl core::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventLog")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
