//! Rate-monotonic priority assignment.
//!
//! Among periodic tasks, the one with the shorter period gets the higher
//! priority. Tasks with equal periods get equal priorities.
//!
//! The assignor walks the reservations in order of increasing period, giving
//! the first one the highest real-time priority and stepping one level down
//! every time the period strictly grows. There are fewer levels than there
//! may be distinct periods: once the floor is reached, every longer period
//! shares the floor, and the assignment is reported as saturated.
//!
//! The assignment is recomputed from scratch whenever a reservation is made
//! or cancelled, so it never depends on the order in which reservations were
//! made.

use core::time::Duration;
use keos::thread::Tid;

/// A reservation's place in the rate-monotonic order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rank {
    /// The reservation's owner.
    pub owner: Tid,
    /// The reservation's period.
    pub period: Duration,
    /// The assigned priority. Meaningless before [`assign`] runs.
    pub priority: u8,
}

impl Rank {
    /// An unranked entry.
    pub fn new(owner: Tid, period: Duration) -> Self {
        Self {
            owner,
            period,
            priority: 0,
        }
    }
}

/// The result of [`assign`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Assignment {
    /// Number of distinct priority levels used.
    pub levels: usize,
    /// Whether some periods had to share the lowest level with a shorter one.
    pub saturated: bool,
}

/// Sorts `ranks` by period and assigns each a priority between `max` and
/// `min`, both inclusive.
///
/// The sort is stable, so entries with equal periods keep their relative
/// order. `max` must not be below `min`.
pub fn assign(ranks: &mut [Rank], max: u8, min: u8) -> Assignment {
    debug_assert!(min <= max);
    ranks.sort_by_key(|rank| rank.period);

    let mut result = Assignment::default();
    let mut level = max;
    let mut prev: Option<Duration> = None;
    for rank in ranks.iter_mut() {
        match prev {
            None => result.levels = 1,
            Some(p) if rank.period > p => {
                if level > min {
                    level -= 1;
                    result.levels += 1;
                } else {
                    result.saturated = true;
                }
            }
            Some(_) => (),
        }
        rank.priority = level;
        prev = Some(rank.period);
    }
    result
}
