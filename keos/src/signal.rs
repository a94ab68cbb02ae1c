//! Signals.
//!
//! Only delivery is abstracted here. What a thread does on receiving a signal
//! is up to the thread.

use crate::thread::Tid;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// A signal number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Signal {
    /// Hangup. (SIGHUP)
    Hup = 1,
    /// Interrupt. (SIGINT)
    Int = 2,
    /// Kill, cannot be caught. (SIGKILL)
    Kill = 9,
    /// User-defined signal 1. (SIGUSR1)
    Usr1 = 10,
    /// User-defined signal 2. (SIGUSR2)
    Usr2 = 12,
    /// Termination. (SIGTERM)
    Term = 15,
    /// CPU time limit exceeded. (SIGXCPU)
    XCpu = 24,
}

/// Delivers signals to threads.
pub trait SignalSink {
    /// Sends `signal` to `tid`.
    ///
    /// Fire and forget: the caller does not learn whether the signal was
    /// delivered. May be called with interrupts disabled.
    fn send_signal(&self, tid: Tid, signal: Signal);
}
