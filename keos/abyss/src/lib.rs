//! The abyss of kernel that operates hardwares.
//!
//! This crate contains the lowest layer the reservation kernel is built on:
//! the interrupt guard, the SMP spinlock, and the console used by the kernel
//! print macros.
//!
//! The hardware itself is reached through a registered
//! [`InterruptControl`] and a registered [`Console`]. Until they are
//! registered, the interrupt guard does nothing and the print macros discard
//! their output, which is what allows the upper crates to run on a host.
//!
//! **YOU ARE *NOT* SUPPOSED TO DIRECTLY USE THE MODULES OF THIS CRATE.**
//! Instead, see the [`keos`] crate for the modules that are available to the
//! reservation subsystem.
//!
//! [`keos`]: ../keos/index.html
//! [`InterruptControl`]: interrupt::InterruptControl
//! [`Console`]: kprint::Console
#![cfg_attr(not(test), no_std)]
#![allow(clippy::missing_safety_doc)]

use core::sync::atomic::AtomicBool;

extern crate alloc;

#[doc(hidden)]
#[macro_use]
pub mod kprint;
#[doc(hidden)]
pub mod interrupt;
#[doc(hidden)]
pub mod spinlock;

pub use interrupt::cpuid;
#[cfg(doc)]
pub use spinlock::SpinLock;

/// Maximum number of CPU the kernel can support.
pub const MAX_CPU: usize = 4;

/// Silences `info!`, `warning!` and `debug!` while set.
#[doc(hidden)]
pub static QUIET: AtomicBool = AtomicBool::new(false);
