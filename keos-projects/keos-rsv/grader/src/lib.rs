//! Test bed for the reservation subsystem.
//!
//! [`SimKernel`] plays the part of the kernel underneath a
//! [`ReservationManager`]: host threads stand in for tasks, a manually
//! advanced counter stands in for the monotonic clock, and priorities and
//! signals handed to the kernel are recorded so tests can inspect them.
//!
//! The timer interrupt is simulated by [`tick_as`], which advances the clock
//! one [`TICK`] at a time and calls [`ReservationManager::timer_tick`] with a
//! chosen task "running" on the ticking thread.

use keos::{
    KernelError,
    console::{Console, register_console},
    signal::{Signal, SignalSink},
    sync::{
        SpinLock,
        atomic::{AtomicBool, AtomicU64},
    },
    thread::{
        Park, ParkHandle, TaskDirectory, Tid,
        scheduler::{PriorityHook, SchedPolicy},
    },
    timer::{Clock, Instant, Timespec},
};
use keos_rsv::{ReservationManager, RsvConfig};
use std::{
    cell::Cell,
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, OnceLock},
    time::Duration,
};

/// Period of the simulated timer interrupt.
pub const TICK: Duration = Duration::from_millis(1);

// Task ids are unique across every `SimKernel` of the process, so the shared
// console can tell tests apart.
static NEXT_TID: AtomicU64 = AtomicU64::new(100);

thread_local! {
    static CURRENT: Cell<Option<Tid>> = const { Cell::new(None) };
}

/// A simulated kernel.
#[derive(Default)]
pub struct SimKernel {
    clock: AtomicU64,
    tasks: SpinLock<BTreeSet<Tid>>,
    priorities: SpinLock<BTreeMap<Tid, (SchedPolicy, u8)>>,
    signals: SpinLock<Vec<(Tid, Signal)>>,
}

impl SimKernel {
    /// Creates a kernel with no task, at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a task and returns its id.
    pub fn spawn_task(&self) -> Tid {
        let tid = NEXT_TID.fetch_add(1);
        let mut tasks = self.tasks.lock();
        tasks.insert(tid);
        tasks.unlock();
        tid
    }

    /// Removes a task. Its id no longer resolves.
    pub fn exit_task(&self, tid: Tid) {
        let mut tasks = self.tasks.lock();
        tasks.remove(&tid);
        tasks.unlock();
    }

    /// Makes `tid` the task running on the calling thread. `None` makes the
    /// thread idle.
    pub fn enter(tid: Option<Tid>) {
        CURRENT.with(|c| c.set(tid));
    }

    /// Runs `f` with `tid` as the task running on the calling thread.
    pub fn run_as<R>(tid: Option<Tid>, f: impl FnOnce() -> R) -> R {
        let prev = CURRENT.with(|c| c.replace(tid));
        let r = f();
        CURRENT.with(|c| c.set(prev));
        r
    }

    /// Moves the clock forward by `d`.
    pub fn advance(&self, d: Duration) {
        self.clock.fetch_add(d.as_nanos() as u64);
    }

    /// The policy and priority last set for `tid`.
    pub fn priority_of(&self, tid: Tid) -> Option<(SchedPolicy, u8)> {
        let priorities = self.priorities.lock();
        let p = priorities.get(&tid).copied();
        priorities.unlock();
        p
    }

    /// Every signal sent to `tid`, in order.
    pub fn signals_for(&self, tid: Tid) -> Vec<Signal> {
        let signals = self.signals.lock();
        let v = signals
            .iter()
            .filter(|(t, _)| *t == tid)
            .map(|(_, s)| *s)
            .collect();
        signals.unlock();
        v
    }
}

impl TaskDirectory for SimKernel {
    fn current(&self) -> Option<Tid> {
        CURRENT.with(Cell::get)
    }

    fn lookup(&self, tid: Tid) -> Result<Tid, KernelError> {
        let tasks = self.tasks.lock();
        let found = tasks.contains(&tid);
        tasks.unlock();
        if found {
            Ok(tid)
        } else {
            Err(KernelError::NoSuchTask)
        }
    }
}

impl Park for SimKernel {
    fn park_with(&self, f: impl FnOnce(ParkHandle)) {
        let tid = self.current().unwrap_or(0);
        let woken = Arc::new(AtomicBool::new(false));
        let thread = std::thread::current();
        let handle = {
            let woken = woken.clone();
            ParkHandle::new(tid, move || {
                woken.store(true);
                thread.unpark();
            })
        };
        f(handle);
        while !woken.load() {
            std::thread::park();
        }
    }
}

impl PriorityHook for SimKernel {
    fn set_priority(&self, tid: Tid, policy: SchedPolicy, priority: u8) {
        let mut priorities = self.priorities.lock();
        priorities.insert(tid, (policy, priority));
        priorities.unlock();
    }
}

impl SignalSink for SimKernel {
    fn send_signal(&self, tid: Tid, signal: Signal) {
        let mut signals = self.signals.lock();
        signals.push((tid, signal));
        signals.unlock();
    }
}

impl Clock for SimKernel {
    fn now(&self) -> Instant {
        Instant::from_nanos(self.clock.load())
    }
}

/// A console that keeps everything printed to it.
#[derive(Default)]
pub struct CaptureConsole {
    buf: SpinLock<String>,
}

impl CaptureConsole {
    /// Whether some printed line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        let buf = self.buf.lock();
        let found = buf.lines().any(|line| line.contains(needle));
        buf.unlock();
        found
    }
}

impl Console for CaptureConsole {
    fn write_str(&self, s: &str) {
        let mut buf = self.buf.lock();
        buf.push_str(s);
        buf.unlock();
    }
}

/// The console of the test process, registered on first use.
pub fn console() -> &'static CaptureConsole {
    static CONSOLE: OnceLock<&'static CaptureConsole> = OnceLock::new();
    CONSOLE.get_or_init(|| {
        let console: &'static CaptureConsole = Box::leak(Box::new(CaptureConsole::default()));
        register_console(console);
        console
    })
}

/// A manager over a fresh [`SimKernel`], with the default configuration.
pub fn manager() -> Arc<ReservationManager<SimKernel>> {
    manager_with(RsvConfig::default())
}

/// A manager over a fresh [`SimKernel`].
pub fn manager_with(config: RsvConfig) -> Arc<ReservationManager<SimKernel>> {
    console();
    Arc::new(ReservationManager::new(SimKernel::new(), config).expect("valid configuration"))
}

/// Shorthand for a whole number of seconds.
pub fn secs(s: i64) -> Timespec {
    Timespec::new(s, 0)
}

/// Shorthand for a number of milliseconds.
pub fn millis(ms: i64) -> Timespec {
    Timespec::from_millis(ms)
}

/// Simulates the timer interrupt for `dur`, one [`TICK`] at a time, with
/// `running` on the CPU. Returns the number of period boundaries handled.
pub fn tick_as(
    manager: &ReservationManager<SimKernel>,
    running: Option<Tid>,
    dur: Duration,
) -> usize {
    let ticks = dur.as_nanos() / TICK.as_nanos();
    SimKernel::run_as(running, || {
        (0..ticks)
            .map(|_| {
                manager.kernel().advance(TICK);
                manager.timer_tick()
            })
            .sum()
    })
}

/// Simulates the timer interrupt for `dur` on an idle CPU.
pub fn tick_for(manager: &ReservationManager<SimKernel>, dur: Duration) -> usize {
    tick_as(manager, None, dur)
}

/// Spins until `cond` holds, for at most a few seconds.
pub fn wait_for(mut cond: impl FnMut() -> bool) {
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(
            std::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        std::thread::yield_now();
    }
}
