//! Runs under an allocator that can be told to fail. The allocator is global,
//! so this file holds a single test.

use keos::{
    KernelError,
    thread::scheduler::{PriorityHook, SchedPolicy},
};
use keos_rsv::{ReservationManager, RsvConfig};
use keos_rsv_grader::{SimKernel, secs};
use std::{
    alloc::{GlobalAlloc, Layout, System},
    cell::Cell,
};

thread_local! {
    // Allocations left on this thread before one fails. `None` never fails.
    static ALLOCS_LEFT: Cell<Option<usize>> = const { Cell::new(None) };
}

/// The system allocator, failing the allocation [`fail_after`] picks.
struct FailingAlloc;

impl FailingAlloc {
    fn should_fail() -> bool {
        ALLOCS_LEFT.with(|left| match left.get() {
            Some(0) => {
                left.set(None);
                true
            }
            Some(n) => {
                left.set(Some(n - 1));
                false
            }
            None => false,
        })
    }
}

unsafe impl GlobalAlloc for FailingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if Self::should_fail() {
            return core::ptr::null_mut();
        }
        unsafe { System.alloc(layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if Self::should_fail() {
            return core::ptr::null_mut();
        }
        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if Self::should_fail() {
            return core::ptr::null_mut();
        }
        unsafe { System.realloc(ptr, layout, new_size) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static ALLOC: FailingAlloc = FailingAlloc;

/// Fails the `n`th allocation from now on the calling thread.
fn fail_after(n: usize) {
    ALLOCS_LEFT.with(|left| left.set(Some(n)));
}

/// Stops failing allocations. Returns whether one was failed.
fn disarm() -> bool {
    ALLOCS_LEFT.with(|left| left.replace(None)).is_none()
}

/// Tests running out of memory while setting a reservation.
///
/// Each round fails one more allocation into `set_reservation`, on a fresh
/// manager, until the call no longer allocates enough to fail.
///
/// This test ensures that:
/// - Every allocation the call makes can fail, with `-ENOMEM`.
/// - A failed call leaves no record behind and the task's scheduling
///   untouched.
/// - A later call succeeds.
#[test]
fn set_reservation_out_of_memory() {
    let mut failures = 0;
    for n in 0.. {
        let mgr = ReservationManager::new(SimKernel::new(), RsvConfig::default()).unwrap();
        let k = mgr.kernel();
        let a = k.spawn_task();
        k.set_priority(a, SchedPolicy::Normal, 0);

        fail_after(n);
        let result = mgr.set_reservation(a, secs(1), secs(3));
        let injected = disarm();

        match result {
            Err(e) => {
                assert_eq!(e, KernelError::NoMemory, "allocation {n}");
                assert!(injected, "allocation {n}");
                assert!(mgr.is_empty());
                assert!(mgr.stat(a).is_none());
                assert_eq!(k.priority_of(a), Some((SchedPolicy::Normal, 0)));
                assert!(mgr.drain_events().is_empty());
                assert_eq!(mgr.cancel_reservation(a), Err(KernelError::NoSuchReservation));
                failures += 1;
            }
            Ok(()) => {
                assert!(!injected, "allocation {n} failed unnoticed");
                assert_eq!(mgr.len(), 1);
                assert_eq!(k.priority_of(a), Some((SchedPolicy::Fifo, 99)));
                mgr.cancel_reservation(a).unwrap();
                break;
            }
        }
    }
    assert!(failures > 0);

    let mgr = ReservationManager::new(SimKernel::new(), RsvConfig::default()).unwrap();
    let a = mgr.kernel().spawn_task();
    fail_after(0);
    assert_eq!(mgr.set_reservation(a, secs(1), secs(3)), Err(KernelError::NoMemory));
    disarm();
    mgr.set_reservation(a, secs(1), secs(3)).unwrap();
    assert_eq!(mgr.len(), 1);
    assert!(mgr.stat(a).unwrap().next_boundary.is_some());
}
