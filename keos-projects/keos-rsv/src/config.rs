//! Configuration.
//!
//! [`RsvConfig`] tunes the reservation subsystem as a whole. It is built in
//! code with the `with_*` setters, or read from the kernel command line with
//! [`RsvConfig::from_cmdline`]:
//!
//! | key | value | default |
//! |---|---|---|
//! | `rsv.max_prio` | highest priority handed out | 99 |
//! | `rsv.min_prio` | lowest priority handed out | 1 |
//! | `rsv.policy` | `fifo`, `rr`, or a policy number | `fifo` |
//! | `rsv.signal` | overrun signal number | 10 (`SIGUSR1`) |
//! | `rsv.strict` | reject `budget > period` (`0`/`1`) | 0 |
//! | `rsv.events` | event log capacity, 0 turns it off | 64 |
//!
//! [`ModuleParams`] are the parameters of the loadable module.

use core::time::Duration;
use keos::{
    KernelError,
    signal::Signal,
    thread::scheduler::{MAX_RT_PRIORITY, MIN_RT_PRIORITY, SchedPolicy},
    thread::Tid,
};

/// Configuration of a [`ReservationManager`](crate::ReservationManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsvConfig {
    /// Priority of the reservations with the shortest period.
    pub max_priority: u8,
    /// Priority floor; longer periods share it.
    pub min_priority: u8,
    /// Real-time policy reserved tasks run under.
    pub policy: SchedPolicy,
    /// Signal sent on overrun.
    pub overrun_signal: Signal,
    /// Whether a budget longer than its period is rejected rather than
    /// accepted with a warning.
    pub reject_over_budget: bool,
    /// Capacity of the event log.
    pub event_capacity: usize,
}

impl Default for RsvConfig {
    fn default() -> Self {
        Self {
            max_priority: MAX_RT_PRIORITY,
            min_priority: MIN_RT_PRIORITY,
            policy: SchedPolicy::Fifo,
            overrun_signal: Signal::Usr1,
            reject_over_budget: false,
            event_capacity: 64,
        }
    }
}

impl RsvConfig {
    /// Sets the range of priorities handed out.
    pub fn with_priorities(mut self, max: u8, min: u8) -> Self {
        self.max_priority = max;
        self.min_priority = min;
        self
    }

    /// Sets the real-time policy.
    pub fn with_policy(mut self, policy: SchedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the overrun signal.
    pub fn with_overrun_signal(mut self, signal: Signal) -> Self {
        self.overrun_signal = signal;
        self
    }

    /// Sets whether `budget > period` is rejected.
    pub fn with_reject_over_budget(mut self, reject: bool) -> Self {
        self.reject_over_budget = reject;
        self
    }

    /// Sets the capacity of the event log.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Checks that the configuration can be used.
    ///
    /// # Errors
    /// [`KernelError::InvalidArgument`] if the priority range is empty or
    /// outside the real-time range, or the policy is not a real-time one.
    pub fn validate(&self) -> Result<(), KernelError> {
        let range = MIN_RT_PRIORITY..=MAX_RT_PRIORITY;
        if !range.contains(&self.min_priority)
            || !range.contains(&self.max_priority)
            || self.min_priority > self.max_priority
            || !self.policy.is_realtime()
        {
            return Err(KernelError::InvalidArgument);
        }
        Ok(())
    }

    /// Reads the `rsv.*` keys of a kernel command line over the defaults.
    ///
    /// Words are separated by whitespace. Words that are not `rsv.*` keys are
    /// ignored.
    ///
    /// # Errors
    /// [`KernelError::InvalidArgument`] if a value does not parse, or the
    /// result fails [`validate`](Self::validate).
    pub fn from_cmdline(cmdline: &str) -> Result<Self, KernelError> {
        let mut config = Self::default();
        for (key, value) in pairs(cmdline) {
            match key {
                "rsv.max_prio" => config.max_priority = parse(value)?,
                "rsv.min_prio" => config.min_priority = parse(value)?,
                "rsv.policy" => {
                    config.policy = match value {
                        "fifo" => SchedPolicy::Fifo,
                        "rr" => SchedPolicy::RoundRobin,
                        v => SchedPolicy::try_from(parse::<u8>(v)?)
                            .map_err(|_| KernelError::InvalidArgument)?,
                    }
                }
                "rsv.signal" => {
                    config.overrun_signal = Signal::try_from(parse::<u8>(value)?)
                        .map_err(|_| KernelError::InvalidArgument)?
                }
                "rsv.strict" => config.reject_over_budget = parse_bool(value)?,
                "rsv.events" => config.event_capacity = parse(value)?,
                _ => (),
            }
        }
        config.validate()?;
        Ok(config)
    }
}

/// Parameters of the [`ReservationModule`](crate::ReservationModule).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleParams {
    /// Task to reserve for. `-1` means unset.
    pub pid: i64,
    /// Budget to reserve.
    pub budget: Duration,
    /// Period to reserve.
    pub period: Duration,
}

impl Default for ModuleParams {
    fn default() -> Self {
        Self {
            pid: -1,
            budget: Duration::from_secs(1),
            period: Duration::from_secs(3),
        }
    }
}

impl ModuleParams {
    /// Reads `pid=`, `budget_ms=` and `period_ms=` over the defaults.
    ///
    /// # Errors
    /// [`KernelError::InvalidArgument`] if a value does not parse or a key is
    /// unknown.
    pub fn parse(params: &str) -> Result<Self, KernelError> {
        let mut this = Self::default();
        for (key, value) in pairs(params) {
            match key {
                "pid" => this.pid = parse(value)?,
                "budget_ms" => this.budget = Duration::from_millis(parse(value)?),
                "period_ms" => this.period = Duration::from_millis(parse(value)?),
                _ => return Err(KernelError::InvalidArgument),
            }
        }
        Ok(this)
    }

    /// Whether a task was given.
    pub fn has_pid(&self) -> bool {
        self.pid != -1
    }

    /// The task to reserve for.
    ///
    /// # Errors
    /// [`KernelError::NoSuchTask`] if `pid` is negative.
    pub fn target(&self) -> Result<Tid, KernelError> {
        Tid::try_from(self.pid).map_err(|_| KernelError::NoSuchTask)
    }
}

fn pairs(line: &str) -> impl Iterator<Item = (&str, &str)> {
    line.split_whitespace()
        .map(|word| word.split_once('=').unwrap_or((word, "")))
}

fn parse<T: core::str::FromStr>(value: &str) -> Result<T, KernelError> {
    value.parse().map_err(|_| KernelError::InvalidArgument)
}

fn parse_bool(value: &str) -> Result<bool, KernelError> {
    match value {
        "1" | "true" | "" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(KernelError::InvalidArgument),
    }
}
