//! Kernel print utilities.

use crate::spinlock::SpinLock;
use core::fmt::Write;

/// A character sink that receives kernel messages.
///
/// The serial port on real hardware, a capture buffer on a host.
pub trait Console: Send + Sync {
    /// Writes `s` to the device.
    fn write_str(&self, s: &str);
}

static CONSOLE: SpinLock<Option<&'static dyn Console>> = SpinLock::new(None);

/// Routes every kernel message to `console`.
///
/// A later registration replaces the previous one.
pub fn register_console(console: &'static dyn Console) {
    let mut guard = CONSOLE.lock();
    *guard = Some(console);
    guard.unlock();
}

struct Sink(&'static dyn Console);

impl Write for Sink {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.0.write_str(s);
        Ok(())
    }
}

#[doc(hidden)]
pub fn _print(fmt: core::fmt::Arguments<'_>) {
    let guard = CONSOLE.lock();
    if let Some(console) = *guard {
        let _ = write!(Sink(console), "{fmt}");
    }
    guard.unlock();
}

/// Prints out the message.
///
/// Use the format! syntax to write data to the standard output.
/// This first holds the lock for console device.
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::kprint::_print(format_args!($($arg)*)));
}

/// Prints out the message with a newline.
///
/// Use the format! syntax to write data to the standard output.
/// This first holds the lock for console device.
#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}

/// Display an information message.
///
/// Use the format! syntax to write data to the standard output.
/// This first holds the lock for console device.
#[macro_export]
macro_rules! info {
    () => (if !$crate::QUIET.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!("[INFO]\n") });
    ($($arg:tt)*) => (if !$crate::QUIET.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!("[INFO] {}\n", format_args!($($arg)*)) });
}

/// Display a warning message.
///
/// Use the format! syntax to write data to the standard output.
/// This first holds the lock for console device.
#[macro_export]
macro_rules! warning {
    () => (if !$crate::QUIET.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!("[WARN]\n") });
    ($($arg:tt)*) => (if !$crate::QUIET.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!("[WARN] {}\n", format_args!($($arg)*)) });
}

/// Display an alert message.
///
/// Alerts are never silenced.
#[macro_export]
macro_rules! alert {
    ($($arg:tt)*) => ($crate::print!("[ALERT] {}\n", format_args!($($arg)*)));
}

/// Display a debug message.
///
/// Use the format! syntax to write data to the standard output.
/// This first holds the lock for console device.
#[macro_export]
macro_rules! debug {
    () => (if !$crate::QUIET.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!("[DEBUG]\n") });
    ($($arg:tt)*) => (if !$crate::QUIET.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!("[DEBUG] {}\n", format_args!($($arg)*))} );
}
