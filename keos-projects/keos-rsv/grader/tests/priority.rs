use keos::thread::scheduler::SchedPolicy;
use keos_rsv::{
    RsvConfig,
    priority::{Rank, assign},
};
use keos_rsv_grader::{console, manager, manager_with, millis, secs};
use std::time::Duration;

fn ranks(periods: &[u64]) -> Vec<Rank> {
    periods
        .iter()
        .enumerate()
        .map(|(i, p)| Rank::new(i as u64 + 1, Duration::from_millis(*p)))
        .collect()
}

/// Tests the rate-monotonic assignor on its own.
///
/// This test ensures that:
/// - Entries come back sorted by period.
/// - A strictly longer period gets a strictly lower priority.
/// - Equal periods get equal priorities, in their original order.
#[test]
fn assign_is_rate_monotonic() {
    let mut r = ranks(&[500, 100, 300, 100, 200]);
    let result = assign(&mut r, 99, 1);

    let got: Vec<_> = r.iter().map(|r| (r.owner, r.priority)).collect();
    assert_eq!(got, [(2, 99), (4, 99), (5, 98), (3, 97), (1, 96)]);
    assert_eq!(result.levels, 4);
    assert!(!result.saturated);
}

/// Tests the priority floor.
///
/// This test ensures that:
/// - Priorities never go below the floor.
/// - Periods past the floor share it, and the result is flagged saturated.
#[test]
fn assign_saturates_at_floor() {
    let mut r = ranks(&[10, 20, 30, 40, 50]);
    let result = assign(&mut r, 3, 2);

    let got: Vec<_> = r.iter().map(|r| r.priority).collect();
    assert_eq!(got, [3, 2, 2, 2, 2]);
    assert_eq!(result.levels, 2);
    assert!(result.saturated);

    let mut r = ranks(&[10, 10, 10]);
    let result = assign(&mut r, 1, 1);
    assert_eq!(r.iter().map(|r| r.priority).collect::<Vec<_>>(), [1, 1, 1]);
    assert!(!result.saturated);

    let mut empty = ranks(&[]);
    assert_eq!(assign(&mut empty, 99, 1).levels, 0);
}

/// Tests that two reservations are ranked by period.
///
/// This test ensures that:
/// - The 2s-period task holds a strictly higher priority than the 5s-period
///   task.
/// - Both run under the real-time FIFO policy.
#[test]
fn shorter_period_wins() {
    let mgr = manager();
    let k = mgr.kernel();
    let (slow, fast) = (k.spawn_task(), k.spawn_task());

    mgr.set_reservation(slow, secs(1), secs(5)).unwrap();
    mgr.set_reservation(fast, secs(1), secs(2)).unwrap();

    let (fp, f) = k.priority_of(fast).unwrap();
    let (sp, s) = k.priority_of(slow).unwrap();
    assert_eq!((fp, sp), (SchedPolicy::Fifo, SchedPolicy::Fifo));
    assert!(f > s, "2s period got {f}, 5s period got {s}");
    assert_eq!(mgr.stat(fast).unwrap().priority, Some(f));
}

/// Tests a larger population with distinct and equal periods.
///
/// This test ensures that:
/// - Priority strictly decreases as the period grows.
/// - Equal periods yield equal priorities.
#[test]
fn many_reservations() {
    let mgr = manager();
    let k = mgr.kernel();
    let periods = [700, 100, 400, 100, 900, 250, 400];
    let tasks: Vec<_> = periods.iter().map(|_| k.spawn_task()).collect();
    for (tid, p) in tasks.iter().zip(periods) {
        mgr.set_reservation(*tid, millis(10), millis(p)).unwrap();
    }

    for (i, a) in tasks.iter().enumerate() {
        for (j, b) in tasks.iter().enumerate() {
            let (pa, pb) = (k.priority_of(*a).unwrap().1, k.priority_of(*b).unwrap().1);
            match periods[i].cmp(&periods[j]) {
                std::cmp::Ordering::Less => assert!(pa > pb),
                std::cmp::Ordering::Equal => assert_eq!(pa, pb),
                std::cmp::Ordering::Greater => assert!(pa < pb),
            }
        }
    }
    assert_eq!(k.priority_of(tasks[1]).unwrap().1, 99);
}

/// Tests that priorities follow the active set.
///
/// This test ensures that:
/// - Cancelling the shortest period promotes the next one.
/// - The cancelled task is handed back to the normal policy.
#[test]
fn reassigned_on_cancel() {
    let mgr = manager();
    let k = mgr.kernel();
    let (a, b) = (k.spawn_task(), k.spawn_task());

    mgr.set_reservation(a, millis(1), millis(10)).unwrap();
    mgr.set_reservation(b, millis(1), millis(20)).unwrap();
    assert_eq!(k.priority_of(b), Some((SchedPolicy::Fifo, 98)));

    mgr.cancel_reservation(a).unwrap();
    assert_eq!(k.priority_of(a), Some((SchedPolicy::Normal, 0)));
    assert_eq!(k.priority_of(b), Some((SchedPolicy::Fifo, 99)));
}

/// Tests the configured range and policy.
///
/// This test ensures that:
/// - Priorities stay within the configured range.
/// - Saturation is logged.
/// - The configured policy is used.
#[test]
fn configured_range() {
    let config = RsvConfig::default()
        .with_priorities(50, 49)
        .with_policy(SchedPolicy::RoundRobin);
    let mgr = manager_with(config);
    let k = mgr.kernel();
    let tasks: Vec<_> = (0..3).map(|_| k.spawn_task()).collect();
    for (i, t) in tasks.iter().enumerate() {
        mgr.set_reservation(*t, millis(1), millis(10 * (i as i64 + 1)))
            .unwrap();
    }

    assert_eq!(k.priority_of(tasks[0]), Some((SchedPolicy::RoundRobin, 50)));
    assert_eq!(k.priority_of(tasks[1]), Some((SchedPolicy::RoundRobin, 49)));
    assert_eq!(k.priority_of(tasks[2]), Some((SchedPolicy::RoundRobin, 49)));
    assert!(console().contains("Reservation priorities saturated: 2 reservations share priority 49"));
}
