//! Time and timers.
//!
//! [`Instant`] is a point on the kernel's monotonic clock, read through a
//! [`Clock`]. [`Timespec`] is the `struct timespec` of the system call ABI.
//!
//! [`TimerQueue`] holds one-shot timers ordered by deadline. It is driven
//! from outside: the owner calls [`TimerQueue::pop_expired`] from the timer
//! interrupt with the current time and handles every timer that comes out.
//! A periodic timer is a one-shot timer that its handler arms again.

use crate::KernelError;
use alloc::{collections::BinaryHeap, vec::Vec};
use core::{cmp::Reverse, time::Duration};

/// A point on the kernel's monotonic clock, in nanoseconds since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Instant(u64);

impl Instant {
    /// The boot instant.
    pub const ZERO: Instant = Instant(0);

    /// Creates an instant `nanos` nanoseconds after boot.
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Nanoseconds since boot.
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// The time elapsed from `earlier` to `self`, or zero if `earlier` is
    /// later.
    pub fn saturating_duration_since(self, earlier: Instant) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }

    /// `self + d`, or `None` on overflow.
    pub fn checked_add(self, d: Duration) -> Option<Instant> {
        u64::try_from(d.as_nanos())
            .ok()
            .and_then(|d| self.0.checked_add(d))
            .map(Instant)
    }
}

impl core::ops::Add<Duration> for Instant {
    type Output = Instant;

    /// Saturates at the end of time.
    fn add(self, d: Duration) -> Instant {
        self.checked_add(d).unwrap_or(Instant(u64::MAX))
    }
}

/// Monotonic clock.
pub trait Clock {
    /// The current time. Never goes backwards.
    fn now(&self) -> Instant;
}

const NSEC_PER_SEC: i64 = 1_000_000_000;

/// The `struct timespec` of the system call ABI.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timespec {
    /// Seconds.
    pub tv_sec: i64,
    /// Nanoseconds, in `0..1_000_000_000`.
    pub tv_nsec: i64,
}

impl Timespec {
    /// Creates a timespec.
    pub const fn new(tv_sec: i64, tv_nsec: i64) -> Self {
        Self { tv_sec, tv_nsec }
    }

    /// Creates a timespec of `ms` milliseconds.
    pub const fn from_millis(ms: i64) -> Self {
        Self {
            tv_sec: ms / 1000,
            tv_nsec: (ms % 1000) * 1_000_000,
        }
    }

    /// Converts to a [`Duration`].
    ///
    /// # Errors
    /// [`KernelError::InvalidArgument`] if either field is negative or
    /// `tv_nsec` is not below one second.
    pub fn to_duration(self) -> Result<Duration, KernelError> {
        if self.tv_sec < 0 || !(0..NSEC_PER_SEC).contains(&self.tv_nsec) {
            return Err(KernelError::InvalidArgument);
        }
        Ok(Duration::new(self.tv_sec as u64, self.tv_nsec as u32))
    }
}

impl TryFrom<Timespec> for Duration {
    type Error = KernelError;

    fn try_from(ts: Timespec) -> Result<Self, Self::Error> {
        ts.to_duration()
    }
}

impl From<Duration> for Timespec {
    /// Saturates at `i64::MAX` seconds.
    fn from(d: Duration) -> Self {
        Self {
            tv_sec: i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
            tv_nsec: i64::from(d.subsec_nanos()),
        }
    }
}

/// Identifies an armed timer in a [`TimerQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// A timer that has expired.
#[derive(Debug)]
pub struct Expired<T> {
    /// The id the timer was armed with.
    pub id: TimerId,
    /// The deadline the timer was armed with. Not later than the `now` it was
    /// popped at.
    pub deadline: Instant,
    /// The payload the timer was armed with.
    pub payload: T,
}

#[derive(Debug)]
struct Timer<T> {
    deadline: Instant,
    id: TimerId,
    payload: T,
}

impl<T> Timer<T> {
    fn key(&self) -> (Instant, TimerId) {
        (self.deadline, self.id)
    }
}

impl<T> Ord for Timer<T> {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl<T> PartialOrd for Timer<T> {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for Timer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<T> Eq for Timer<T> {}

/// A queue of one-shot timers.
///
/// Timers with the same deadline expire in the order they were armed.
/// Cancelling a timer leaves its heap entry in place; the entry is dropped
/// when it reaches the front, or when [`try_reserve`](Self::try_reserve)
/// finds too many of them.
#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<Reverse<Timer<T>>>,
    // Ids of armed timers. Ids are handed out in increasing order, so pushing
    // keeps this sorted.
    live: Vec<TimerId>,
    next_id: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        TimerQueue::new()
    }
}

impl<T> TimerQueue<T> {
    /// Creates an empty queue.
    pub const fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: Vec::new(),
            next_id: 0,
        }
    }

    /// Number of armed timers.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether no timer is armed.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Reserves room for `additional` more timers, so that the next
    /// `additional` calls to [`arm`] do not allocate.
    ///
    /// # Errors
    /// [`KernelError::NoMemory`] if the allocation fails. The queue is
    /// unchanged.
    ///
    /// [`arm`]: Self::arm
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), KernelError> {
        self.compact();
        self.heap
            .try_reserve(additional)
            .map_err(|_| KernelError::NoMemory)?;
        self.live
            .try_reserve(additional)
            .map_err(|_| KernelError::NoMemory)
    }

    /// Arms a timer that expires at `deadline`.
    pub fn arm(&mut self, deadline: Instant, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.heap.push(Reverse(Timer {
            deadline,
            id,
            payload,
        }));
        self.live.push(id);
        id
    }

    /// Cancels the timer `id`. Returns whether it was still armed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.live.binary_search(&id) {
            Ok(idx) => {
                self.live.remove(idx);
                true
            }
            Err(_) => false,
        }
    }

    /// Whether the timer `id` is armed.
    pub fn is_armed(&self, id: TimerId) -> bool {
        self.live.binary_search(&id).is_ok()
    }

    /// The earliest deadline among the armed timers.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.drop_cancelled_head();
        self.heap.peek().map(|Reverse(t)| t.deadline)
    }

    /// Removes and returns the earliest timer whose deadline is not after
    /// `now`.
    pub fn pop_expired(&mut self, now: Instant) -> Option<Expired<T>> {
        self.drop_cancelled_head();
        if self.heap.peek()?.0.deadline > now {
            return None;
        }
        let Reverse(Timer {
            deadline,
            id,
            payload,
        }) = self.heap.pop()?;
        self.cancel(id);
        Some(Expired {
            id,
            deadline,
            payload,
        })
    }

    fn drop_cancelled_head(&mut self) {
        while let Some(Reverse(t)) = self.heap.peek() {
            if self.is_armed(t.id) {
                break;
            }
            self.heap.pop();
        }
    }

    fn compact(&mut self) {
        if self.heap.len() > 2 * self.live.len() + 16 {
            let live = &self.live;
            self.heap
                .retain(|Reverse(t)| live.binary_search(&t.id).is_ok());
        }
    }
}
