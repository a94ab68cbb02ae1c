//! The reservation manager.
//!
//! [`ReservationManager`] ties the registry, the periodic timers and the
//! priority assignor together behind one spinlock. Every operation takes the
//! lock for a bounded, non-blocking stretch:
//!
//! - [`set_reservation`] and [`cancel_reservation`] change the active set and
//!   reassign priorities before they release the lock, so a caller that sees
//!   them succeed also sees a consistent priority assignment.
//! - [`timer_tick`] charges the running task and handles the due period
//!   boundaries under the same lock, so a boundary never races with a
//!   cancellation. Once [`cancel_reservation`] returns, the cancelled
//!   reservation's timer never fires again.
//! - [`wait_until_next_period`] publishes the caller's [`ParkHandle`] and
//!   releases the lock from inside [`Park::park_with`], before the caller is
//!   suspended.
//!
//! [`set_reservation`]: ReservationManager::set_reservation
//! [`cancel_reservation`]: ReservationManager::cancel_reservation
//! [`timer_tick`]: ReservationManager::timer_tick
//! [`wait_until_next_period`]: ReservationManager::wait_until_next_period
//! [`ParkHandle`]: keos::thread::ParkHandle
//! [`Park::park_with`]: keos::thread::Park::park_with

use crate::{
    Kernel,
    config::RsvConfig,
    event::{Event, EventKind, EventLog},
    periodic::FireFlags,
    registry::Registry,
    reservation::{Reservation, ReservationStat},
};
use alloc::vec::Vec;
use arrayvec::ArrayVec;
use core::time::Duration;
use crossbeam_utils::CachePadded;
use keos::{
    KernelError, MAX_CPU, info,
    intrinsics::cpuid,
    sync::{SpinLock, SpinLockGuard, atomic::AtomicU64},
    thread::{Tid, scheduler::SchedPolicy},
    timer::{Instant, Timespec},
    warning,
};

/// Overruns a single tick reports one by one. Further ones are only counted.
const OVERRUN_REPORTS: usize = 8;

/// An overrun seen under the registry lock, logged once it is released.
#[derive(Debug, Clone, Copy)]
struct OverrunReport {
    owner: Tid,
    consumed: Duration,
    budget: Duration,
    utilization: Option<u64>,
}

/// Periodic CPU reservations over a kernel `K`.
pub struct ReservationManager<K: Kernel> {
    kernel: K,
    config: RsvConfig,
    registry: SpinLock<Registry>,
    events: EventLog,
    last_tick: [CachePadded<AtomicU64>; MAX_CPU],
}

impl<K: Kernel> ReservationManager<K> {
    /// Creates a manager with no reservation.
    ///
    /// # Errors
    /// [`KernelError::InvalidArgument`] if `config` fails
    /// [`RsvConfig::validate`].
    pub fn new(kernel: K, config: RsvConfig) -> Result<Self, KernelError> {
        config.validate()?;
        let now = kernel.now().as_nanos();
        Ok(Self {
            events: EventLog::new(config.event_capacity),
            last_tick: core::array::from_fn(|_| CachePadded::new(AtomicU64::new(now))),
            registry: SpinLock::new(Registry::new()),
            config,
            kernel,
        })
    }

    /// The kernel underneath.
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// The configuration in use.
    pub fn config(&self) -> &RsvConfig {
        &self.config
    }

    /// Number of active reservations.
    pub fn len(&self) -> usize {
        let guard = self.registry.lock();
        let len = guard.len();
        guard.unlock();
        len
    }

    /// Whether there is no active reservation.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of the reservation held by `tid`.
    pub fn stat(&self, tid: Tid) -> Option<ReservationStat> {
        let guard = self.registry.lock();
        let stat = guard.find(tid).map(Reservation::stat);
        guard.unlock();
        stat
    }

    /// Removes and returns the logged events, oldest first.
    pub fn drain_events(&self) -> Vec<Event> {
        self.events.drain()
    }

    /// Resolves a system call target: 0 is the caller.
    fn resolve(&self, target: Tid) -> Result<Tid, KernelError> {
        if target == 0 {
            self.kernel.current().ok_or(KernelError::NoSuchTask)
        } else {
            self.kernel.lookup(target)
        }
    }

    /// Reserves `budget` of CPU time every `period` for `target`.
    ///
    /// `target` 0 is the calling task. The first period starts now; its
    /// boundary comes one `period` later.
    ///
    /// # Errors
    /// - [`KernelError::InvalidArgument`] if either duration is malformed or
    ///   negative, `period` is zero, or `budget` exceeds `period` while
    ///   [`RsvConfig::reject_over_budget`] is set.
    /// - [`KernelError::NoSuchTask`] if `target` does not resolve.
    /// - [`KernelError::AlreadyExists`] if `target` already has a reservation.
    /// - [`KernelError::NoMemory`] if the record cannot be allocated. Nothing
    ///   is changed.
    pub fn set_reservation(
        &self,
        target: Tid,
        budget: Timespec,
        period: Timespec,
    ) -> Result<(), KernelError> {
        let (budget, period) = (budget.to_duration()?, period.to_duration()?);
        if period.is_zero() {
            return Err(KernelError::InvalidArgument);
        }
        if budget > period {
            if self.config.reject_over_budget {
                return Err(KernelError::InvalidArgument);
            }
            warning!(
                "Reservation budget {:?} exceeds its period {:?}; it will overrun every period",
                budget,
                period
            );
        }
        let owner = self.resolve(target)?;

        let mut guard = self.registry.lock();
        let now = self.kernel.now();
        if let Err(e) = guard.insert(Reservation::new(owner, budget, period, now)) {
            guard.unlock();
            return Err(e);
        }
        let sharing = self.reassign(&mut guard);
        guard.unlock();

        self.warn_saturated(sharing);
        self.events
            .record(now, owner, EventKind::Created { budget, period });
        let (b, p) = (Timespec::from(budget), Timespec::from(period));
        info!(
            "Reservation set for task {}: Budget ({} sec, {} nsec), Period ({} sec, {} nsec)",
            owner, b.tv_sec, b.tv_nsec, p.tv_sec, p.tv_nsec
        );
        Ok(())
    }

    /// Cancels the reservation of `target`.
    ///
    /// `target` 0 is the calling task. If the owner is blocked in
    /// [`wait_until_next_period`](Self::wait_until_next_period), it is woken
    /// and its wait fails. The owner goes back to the normal policy.
    ///
    /// # Errors
    /// - [`KernelError::NoSuchTask`] if `target` does not resolve.
    /// - [`KernelError::NoSuchReservation`] if it has no reservation.
    pub fn cancel_reservation(&self, target: Tid) -> Result<(), KernelError> {
        let owner = self.resolve(target)?;

        let mut guard = self.registry.lock();
        let Some(mut record) = guard.remove(owner) else {
            guard.unlock();
            return Err(KernelError::NoSuchReservation);
        };
        self.kernel.set_priority(owner, SchedPolicy::Normal, 0);
        let sharing = self.reassign(&mut guard);
        if let Some(waiter) = record.waiter.take() {
            waiter.unpark();
        }
        guard.unlock();

        self.warn_saturated(sharing);
        self.events
            .record(self.kernel.now(), owner, EventKind::Canceled);
        info!("Reservation canceled for task {}", owner);
        Ok(())
    }

    /// Blocks the calling task until its next period starts.
    ///
    /// # Errors
    /// [`KernelError::NoSuchReservation`] if the caller has no reservation,
    /// without blocking, or if its reservation was cancelled while it
    /// waited.
    pub fn wait_until_next_period(&self) -> Result<(), KernelError> {
        let me = self
            .kernel
            .current()
            .ok_or(KernelError::NoSuchReservation)?;

        let guard = self.registry.lock();
        let Some(id) = guard.find(me).map(Reservation::id) else {
            guard.unlock();
            return Err(KernelError::NoSuchReservation);
        };
        self.kernel.park_with(move |handle| {
            let mut guard = guard;
            match guard.find_mut(me) {
                Some(record) => record.waiter = Some(handle),
                None => handle.unpark(),
            }
            guard.unlock();
        });

        let guard = self.registry.lock();
        let same = guard.find(me).is_some_and(|r| r.id() == id);
        guard.unlock();
        if same {
            Ok(())
        } else {
            Err(KernelError::NoSuchReservation)
        }
    }

    /// Charges `elapsed` of CPU time to the reservation of `tid`.
    ///
    /// For kernels that account run time at context switch. Returns whether
    /// `tid` holds a reservation.
    pub fn charge(&self, tid: Tid, elapsed: Duration) -> bool {
        let mut guard = self.registry.lock();
        let charged = guard.find_mut(tid).map(|r| r.charge(elapsed)).is_some();
        guard.unlock();
        charged
    }

    /// Called on every timer interrupt, on every core.
    ///
    /// Charges the task running on this core with the time since this core's
    /// previous tick, then handles every period boundary that is due.
    /// Returns the number of boundaries handled.
    pub fn timer_tick(&self) -> usize {
        let now = self.kernel.now();
        let last = self.last_tick[cpuid()].swap(now.as_nanos());
        let elapsed = now.saturating_duration_since(Instant::from_nanos(last));

        let mut overruns = ArrayVec::<OverrunReport, OVERRUN_REPORTS>::new();
        let mut unreported = 0;
        let mut guard = self.registry.lock();
        if let Some(tid) = self.kernel.current() {
            if let Some(record) = guard.find_mut(tid) {
                record.charge(elapsed);
            }
        }
        let fired = guard.expire(
            now,
            &self.kernel,
            self.config.overrun_signal,
            |record, boundary| {
                if boundary.flags.contains(FireFlags::OVERRUN) {
                    self.events.record(
                        now,
                        boundary.owner,
                        EventKind::Overrun {
                            consumed: boundary.consumed,
                            utilization: boundary.utilization,
                        },
                    );
                    let report = OverrunReport {
                        owner: boundary.owner,
                        consumed: boundary.consumed,
                        budget: record.budget(),
                        utilization: boundary.utilization,
                    };
                    if overruns.try_push(report).is_err() {
                        unreported += 1;
                    }
                }
                self.events.record(
                    now,
                    boundary.owner,
                    EventKind::PeriodStart {
                        index: record.periods(),
                    },
                );
            },
        );
        guard.unlock();

        for report in overruns.iter() {
            warning!(
                "Task {} overran its budget: consumed {:?} of {:?} ({}%)",
                report.owner,
                report.consumed,
                report.budget,
                report.utilization.unwrap_or(0)
            );
        }
        if unreported > 0 {
            warning!("{} more tasks overran their budget", unreported);
        }
        fired
    }

    /// Hands the current rate-monotonic ranking to the scheduler.
    ///
    /// Returns how many reservations share the lowest priority if the
    /// ranking ran out of levels.
    fn reassign(&self, registry: &mut SpinLockGuard<'_, Registry>) -> Option<usize> {
        let (ranks, assignment) = registry.rank(self.config.max_priority, self.config.min_priority);
        for rank in ranks {
            self.kernel
                .set_priority(rank.owner, self.config.policy, rank.priority);
        }
        assignment.saturated.then(|| {
            ranks
                .iter()
                .filter(|r| r.priority == self.config.min_priority)
                .count()
        })
    }

    fn warn_saturated(&self, sharing: Option<usize>) {
        if let Some(sharing) = sharing {
            warning!(
                "Reservation priorities saturated: {} reservations share priority {}",
                sharing,
                self.config.min_priority
            );
        }
    }
}
