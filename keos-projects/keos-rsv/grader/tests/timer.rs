use keos::{
    KernelError,
    timer::{Instant, Timespec, TimerQueue},
};
use std::time::Duration;

fn at(ms: u64) -> Instant {
    Instant::from_nanos(ms * 1_000_000)
}

fn drain(queue: &mut TimerQueue<&'static str>, now: Instant) -> Vec<&'static str> {
    std::iter::from_fn(|| queue.pop_expired(now))
        .map(|e| e.payload)
        .collect()
}

/// Tests the expiry order of the timer queue.
///
/// This test ensures that:
/// - Timers expire in order of deadline, and in arming order on a tie.
/// - A timer does not expire before its deadline.
#[test]
fn queue_order() {
    let mut queue = TimerQueue::new();
    queue.arm(at(30), "c");
    queue.arm(at(10), "a");
    queue.arm(at(20), "b1");
    queue.arm(at(20), "b2");
    assert_eq!(queue.len(), 4);

    assert_eq!(queue.next_deadline(), Some(at(10)));
    assert_eq!(drain(&mut queue, at(9)), Vec::<&str>::new());
    assert_eq!(drain(&mut queue, at(20)), ["a", "b1", "b2"]);
    assert_eq!(drain(&mut queue, at(100)), ["c"]);
    assert!(queue.is_empty());
    assert_eq!(queue.next_deadline(), None);
}

/// Tests cancellation.
///
/// This test ensures that:
/// - A cancelled timer never expires and no longer counts.
/// - Cancelling twice, or after expiry, reports that nothing was armed.
/// - The next deadline skips cancelled timers.
#[test]
fn queue_cancel() {
    let mut queue = TimerQueue::new();
    let a = queue.arm(at(10), "a");
    let b = queue.arm(at(20), "b");
    let c = queue.arm(at(30), "c");

    assert!(queue.cancel(a));
    assert!(!queue.cancel(a));
    assert!(!queue.is_armed(a));
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.next_deadline(), Some(at(20)));

    let expired = queue.pop_expired(at(25)).unwrap();
    assert_eq!((expired.id, expired.deadline, expired.payload), (b, at(20), "b"));
    assert!(!queue.cancel(b));
    assert!(queue.is_armed(c));
    assert_eq!(drain(&mut queue, at(100)), ["c"]);
}

/// Tests that heavy re-arming keeps the queue consistent.
#[test]
fn queue_rearm() {
    let mut queue = TimerQueue::new();
    let mut id = queue.arm(at(1), "x");
    for i in 2..1000 {
        queue.try_reserve(1).unwrap();
        queue.cancel(id);
        id = queue.arm(at(i), "x");
    }
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.next_deadline(), Some(at(999)));
    assert_eq!(drain(&mut queue, at(998)), Vec::<&str>::new());
    assert_eq!(drain(&mut queue, at(999)), ["x"]);
}

/// Tests the conversion of `struct timespec`.
///
/// This test ensures that:
/// - Well-formed values convert exactly.
/// - Negative fields and out-of-range nanoseconds are rejected.
#[test]
fn timespec() {
    assert_eq!(Timespec::new(1, 500).to_duration(), Ok(Duration::new(1, 500)));
    assert_eq!(
        Duration::try_from(Timespec::from_millis(2500)),
        Ok(Duration::from_millis(2500))
    );
    assert_eq!(Timespec::from_millis(2500), Timespec::new(2, 500_000_000));
    assert_eq!(Timespec::from(Duration::new(3, 7)), Timespec::new(3, 7));
    assert_eq!(
        Timespec::from(Duration::MAX),
        Timespec::new(i64::MAX, 999_999_999)
    );

    for bad in [
        Timespec::new(-1, 0),
        Timespec::new(0, -1),
        Timespec::new(0, 1_000_000_000),
    ] {
        assert_eq!(bad.to_duration(), Err(KernelError::InvalidArgument));
    }
}

/// Tests instant arithmetic.
#[test]
fn instant() {
    let t = at(5);
    assert_eq!(t + Duration::from_millis(5), at(10));
    assert_eq!(at(10).saturating_duration_since(t), Duration::from_millis(5));
    assert_eq!(t.saturating_duration_since(at(10)), Duration::ZERO);
    assert_eq!(Instant::from_nanos(u64::MAX).checked_add(Duration::from_nanos(1)), None);
    assert_eq!(
        Instant::from_nanos(u64::MAX) + Duration::from_secs(1),
        Instant::from_nanos(u64::MAX)
    );
}

/// Tests the errno encoding of [`KernelError`].
///
/// This test ensures that:
/// - Every error maps to its errno and back.
/// - Other values, success included, are not errors.
#[test]
fn errno() {
    let table = [
        (KernelError::NoSuchReservation, -2),
        (KernelError::NoSuchTask, -3),
        (KernelError::NoMemory, -12),
        (KernelError::BadAddress, -14),
        (KernelError::AlreadyExists, -16),
        (KernelError::InvalidArgument, -22),
        (KernelError::NoSuchSyscall, -38),
    ];
    for (e, errno) in table {
        assert_eq!(e.into_isize(), errno);
        assert_eq!(KernelError::try_from(errno), Ok(e));
        assert_eq!(KernelError::try_from(e.into_usize()), Ok(e));
    }
    assert!(KernelError::try_from(0isize).is_err());
    assert!(KernelError::try_from(-1isize).is_err());
    assert_eq!(KernelError::NoSuchTask.to_string(), "no such task (-3)");
}
