//! Interrupt
//!
//! The kernel masks local interrupts while a [`SpinLock`] is held, so that the
//! timer interrupt never spins on a lock owned by the thread it interrupted.
//! The masking itself is done by the platform's [`InterruptControl`], which is
//! registered once at boot with [`register_control`].
//!
//! [`SpinLock`]: crate::spinlock::SpinLock
use alloc::boxed::Box;
use core::{
    ptr,
    sync::atomic::{AtomicBool, AtomicIsize, AtomicPtr, Ordering},
};

/// Platform hooks for the local interrupt flag.
///
/// # Safety
/// `enable` and `disable` change the interrupt flag of the calling core only.
pub trait InterruptControl: Send + Sync {
    /// Index of the calling core, below [`MAX_CPU`](crate::MAX_CPU).
    fn cpuid(&self) -> usize;

    /// Whether interrupts are enabled on the calling core.
    fn is_enabled(&self) -> bool;

    /// Enables interrupts on the calling core.
    unsafe fn enable(&self);

    /// Disables interrupts on the calling core.
    unsafe fn disable(&self);
}

static CONTROL: AtomicPtr<&'static dyn InterruptControl> = AtomicPtr::new(ptr::null_mut());

/// Registers the platform's interrupt controller.
///
/// The controller must be registered before any secondary core is started.
/// A later registration replaces the previous one.
pub fn register_control(control: &'static dyn InterruptControl) {
    let slot = Box::leak(Box::new(control));
    CONTROL.store(slot as *mut _, Ordering::SeqCst);
}

fn control() -> Option<&'static dyn InterruptControl> {
    // Safety: the pointer is either null or a leaked, never freed box.
    unsafe { CONTROL.load(Ordering::SeqCst).as_ref().copied() }
}

/// Returns the index of the calling core.
///
/// Always 0 until an [`InterruptControl`] is registered.
pub fn cpuid() -> usize {
    control().map(|c| c.cpuid()).unwrap_or(0)
}

static PER_CORE_STATE: [InterruptGuardInner; crate::MAX_CPU] =
    [const { InterruptGuardInner::new() }; crate::MAX_CPU];

struct InterruptGuardInner {
    initial_state: AtomicBool,
    cnt: AtomicIsize,
}

impl InterruptGuardInner {
    const fn new() -> Self {
        Self {
            initial_state: AtomicBool::new(true),
            cnt: AtomicIsize::new(0),
        }
    }

    fn save_nested_interrupt_state(&self, state: InterruptState) {
        if self.cnt.fetch_add(1, Ordering::SeqCst) == 0 {
            self.initial_state
                .store(state == InterruptState::On, Ordering::SeqCst);
        }
    }

    fn load_nested_interrupt_state(&self, control: &dyn InterruptControl) {
        let prev = self.cnt.fetch_sub(1, Ordering::SeqCst);
        assert!(prev > 0, "Mismatched InterruptGuard drop calls: {prev}");

        if prev == 1 && self.initial_state.load(Ordering::SeqCst) {
            unsafe { control.enable() };
        }
    }
}

/// Enumeration representing the interrupt state.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum InterruptState {
    /// Interrupts are enabled.
    On,
    /// Interrupts are disabled.
    Off,
}

impl InterruptState {
    /// Reads the current interrupt state.
    ///
    /// Reports [`InterruptState::On`] when no controller is registered.
    pub fn current() -> Self {
        match control() {
            Some(c) if !c.is_enabled() => Self::Off,
            _ => Self::On,
        }
    }
}

/// An RAII-based guard for managing interrupt disabling.
///
/// When an `InterruptGuard` is created, interrupts are disabled. When it is
/// dropped, the interrupt state is restored to what it was before the
/// outermost guard was created.
///
/// [`InterruptGuard`] instances **must be dropped in reverse order of their
/// creation** and on the core that created them.
pub struct InterruptGuard {
    core_id: Option<usize>,
    _not_send: core::marker::PhantomData<*const ()>,
}

impl InterruptGuard {
    /// Creates a new `InterruptGuard`, disabling interrupts.
    pub fn new() -> Self {
        let core_id = control().map(|control| {
            let state = InterruptState::current();
            unsafe { control.disable() };
            core::sync::atomic::fence(Ordering::SeqCst);

            let core_id = control.cpuid();
            PER_CORE_STATE[core_id].save_nested_interrupt_state(state);
            core_id
        });

        Self {
            core_id,
            _not_send: core::marker::PhantomData,
        }
    }

    /// Whether the calling core currently holds a guard.
    pub fn is_guarded() -> bool {
        control().is_some_and(|c| PER_CORE_STATE[c.cpuid()].cnt.load(Ordering::SeqCst) > 0)
    }
}

impl Default for InterruptGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        let (Some(core_id), Some(control)) = (self.core_id, control()) else {
            return;
        };
        if core_id != control.cpuid() {
            panic!(
                "InterruptGuard dropped on different core: {} != {}",
                core_id,
                control.cpuid()
            );
        }

        PER_CORE_STATE[core_id].load_nested_interrupt_state(control);
        core::sync::atomic::fence(Ordering::SeqCst);
    }
}
