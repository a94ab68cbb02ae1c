//! A wrapper around the core::sync::atomic.
//!
//! Every operation is sequentially consistent, so callers never pick an
//! [`Ordering`]. The reservation subsystem uses these for its generation
//! counter and for the per-core timestamps of the last timer tick, which are
//! read and written from interrupt context on every core.
//!
//! [`Ordering`]: core::sync::atomic::Ordering

use core::sync::atomic::Ordering;

/// A boolean type which can be safely shared between threads.
#[derive(Default)]
pub struct AtomicBool(core::sync::atomic::AtomicBool);

impl AtomicBool {
    /// Creates a new `AtomicBool`.
    #[inline]
    #[must_use]
    pub const fn new(v: bool) -> AtomicBool {
        Self(core::sync::atomic::AtomicBool::new(v))
    }

    /// Loads a value from the bool.
    #[inline]
    pub fn load(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Stores a value into the bool.
    #[inline]
    pub fn store(&self, val: bool) {
        self.0.store(val, Ordering::SeqCst)
    }
}

impl core::fmt::Debug for AtomicBool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(&self.load(), f)
    }
}

macro_rules! atomic_int {
    ($int_type:ident $atomic_type:ident) => {
        #[doc = concat!("An integer type which can be safely shared between threads, wrapping [`core::sync::atomic::", stringify!($atomic_type), "`].")]
        #[repr(transparent)]
        #[derive(Default)]
        pub struct $atomic_type(core::sync::atomic::$atomic_type);

        impl core::fmt::Debug for $atomic_type {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Debug::fmt(&self.load(), f)
            }
        }

        impl $atomic_type {
            /// Creates a new atomic integer.
            #[inline]
            #[must_use]
            pub const fn new(v: $int_type) -> Self {
                Self(core::sync::atomic::$atomic_type::new(v))
            }

            /// Loads a value from the atomic integer.
            #[inline]
            pub fn load(&self) -> $int_type {
                self.0.load(Ordering::SeqCst)
            }

            /// Stores a value into the atomic integer.
            #[inline]
            pub fn store(&self, val: $int_type) {
                self.0.store(val, Ordering::SeqCst)
            }

            /// Stores a value into the atomic integer, returning the previous
            /// value.
            #[inline]
            pub fn swap(&self, val: $int_type) -> $int_type {
                self.0.swap(val, Ordering::SeqCst)
            }

            /// Adds to the current value, returning the previous value.
            ///
            /// This operation wraps around on overflow.
            #[inline]
            pub fn fetch_add(&self, val: $int_type) -> $int_type {
                self.0.fetch_add(val, Ordering::SeqCst)
            }
        }
    };
}

atomic_int!(u64 AtomicU64);

