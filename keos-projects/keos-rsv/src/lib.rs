//! # Periodic CPU reservations
//!
//! A task may ask the kernel for a periodic CPU **reservation**: a
//! `(budget, period)` pair stating that the task needs at most `budget` of
//! CPU time in every `period`. The kernel then
//!
//! - charges the task's run time against its budget on every timer tick,
//! - checks at every period boundary whether the task **overran** its
//!   budget, and notifies the task with a signal when it did,
//! - ranks all reserved tasks **rate-monotonically** (a shorter period gets a
//!   higher real-time priority) and hands the ranking to the scheduler, and
//! - lets a task sleep until the start of its next period.
//!
//! ## Components
//!
//! - [`Reservation`]: the record kept for each reserved task.
//! - [`Registry`]: the set of records and their timers. One [`SpinLock`] in
//!   the [`ReservationManager`] guards all of it.
//! - [`periodic`]: the per-record periodic timer and what happens when it
//!   fires.
//! - [`priority`]: the rate-monotonic priority assignor.
//! - [`ReservationManager`]: the operations offered to the rest of the
//!   kernel, and the timer interrupt entry point.
//! - [`syscall`]: the `set_rsv`, `cancel_rsv` and `wait_until_next_period`
//!   system calls.
//! - [`module`]: a loadable-module front end that reserves CPU for a task
//!   given on the module's command line.
//!
//! ## The kernel underneath
//!
//! This crate does not own tasks, the scheduler, signals or the clock. It
//! reaches them through the traits in [`keos`], gathered in [`Kernel`]. A
//! kernel implements them once and hands itself to
//! [`ReservationManager::new`]; its timer interrupt handler then calls
//! [`ReservationManager::timer_tick`] on every core, nominally every
//! millisecond.
//!
//! ```ignore
//! let manager = ReservationManager::new(kernel, RsvConfig::default())?;
//!
//! // A periodic task: 1s of work every 3s.
//! manager.set_reservation(0, Timespec::new(1, 0), Timespec::new(3, 0))?;
//! loop {
//!     do_work();
//!     manager.wait_until_next_period()?;
//! }
//! ```
//!
//! [`SpinLock`]: keos::sync::SpinLock

#![cfg_attr(not(test), no_std)]
#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

extern crate alloc;

pub mod config;
pub mod event;
pub mod manager;
pub mod module;
pub mod periodic;
pub mod priority;
pub mod registry;
pub mod reservation;
pub mod syscall;

pub use config::{ModuleParams, RsvConfig};
pub use event::{Event, EventKind};
pub use manager::ReservationManager;
pub use module::ReservationModule;
pub use periodic::FireFlags;
pub use registry::Registry;
pub use reservation::{Reservation, ReservationStat};

use keos::{
    signal::SignalSink,
    thread::{Park, TaskDirectory, scheduler::PriorityHook},
    timer::Clock,
};

/// Everything the reservation subsystem needs from the kernel.
///
/// Implemented for every type that implements all of the collaborator
/// traits.
pub trait Kernel: TaskDirectory + Park + PriorityHook + SignalSink + Clock + Send + Sync {}

impl<T> Kernel for T where T: TaskDirectory + Park + PriorityHook + SignalSink + Clock + Send + Sync {}
