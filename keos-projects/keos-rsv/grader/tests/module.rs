use keos::{KernelError, timer::Timespec};
use keos_rsv::{ModuleParams, ReservationModule};
use keos_rsv_grader::{console, manager};
use std::time::Duration;

/// Tests loading the module without a pid.
///
/// This test ensures that:
/// - The load fails with `InvalidArgument`.
/// - The failure is reported on the console.
#[test]
fn load_without_pid() {
    let mgr = manager();
    assert_eq!(
        ReservationModule::init(&mgr, ModuleParams::default()).map(|m| m.pid()),
        Err(KernelError::InvalidArgument)
    );
    assert!(console().contains("[ALERT] Reservation Module: Invalid PID"));
    assert!(mgr.is_empty());
}

/// Tests a load and unload cycle.
///
/// This test ensures that:
/// - Loading reserves the default 1s every 3s for the task.
/// - Unloading cancels the reservation.
/// - Both are reported on the console.
#[test]
fn load_and_unload() {
    let mgr = manager();
    let a = mgr.kernel().spawn_task();
    let params = ModuleParams {
        pid: a as i64,
        ..ModuleParams::default()
    };

    let module = ReservationModule::init(&mgr, params).unwrap();
    assert!(module.is_reserved());
    assert_eq!(module.pid(), a as i64);
    let stat = mgr.stat(a).unwrap();
    assert_eq!(stat.budget, Duration::from_secs(1));
    assert_eq!(stat.period, Duration::from_secs(3));
    assert!(console().contains(&format!(
        "Reservation Module: Successfully set reservation for PID {a}"
    )));

    assert_eq!(module.exit(&mgr), Ok(()));
    assert!(mgr.is_empty());
    assert!(console().contains(&format!(
        "Reservation Module: Successfully canceled reservation for PID {a}"
    )));
}

/// Tests loading the module for a task that does not exist.
///
/// This test ensures that:
/// - The load itself succeeds, but reserves nothing.
/// - The error code is reported on the console.
/// - Unloading reports that there was nothing to cancel.
#[test]
fn load_for_unknown_task() {
    let mgr = manager();
    let a = mgr.kernel().spawn_task();
    mgr.kernel().exit_task(a);

    let module = ReservationModule::init(
        &mgr,
        ModuleParams {
            pid: a as i64,
            ..ModuleParams::default()
        },
    )
    .unwrap();
    assert!(!module.is_reserved());
    assert!(console().contains(&format!(
        "Reservation Module: Failed to set reservation for PID {a}, error -3"
    )));

    assert_eq!(module.exit(&mgr), Err(KernelError::NoSuchTask));
    assert!(console().contains(&format!(
        "Reservation Module: Failed to cancel reservation for PID {a}, error -3"
    )));
}

/// Tests that a task already holding a reservation keeps it.
#[test]
fn load_for_reserved_task() {
    let mgr = manager();
    let a = mgr.kernel().spawn_task();
    mgr.set_reservation(a, Timespec::from_millis(5), Timespec::from_millis(10))
        .unwrap();

    let params = ModuleParams::parse(&format!("pid={a}")).unwrap();
    let module = ReservationModule::init(&mgr, params).unwrap();
    assert!(!module.is_reserved());
    assert_eq!(mgr.stat(a).unwrap().period, Duration::from_millis(10));
    assert!(console().contains(&format!(
        "Reservation Module: Failed to set reservation for PID {a}, error -16"
    )));
}

/// Tests loading the module with a negative pid other than -1.
///
/// This test ensures that:
/// - The load succeeds without reserving anything.
/// - The reservation is reported as failing with `-ESRCH`.
/// - Unloading fails the same way.
#[test]
fn load_for_negative_pid() {
    let mgr = manager();
    let params = ModuleParams::parse("pid=-5").unwrap();
    assert!(params.has_pid());
    assert_eq!(params.target(), Err(KernelError::NoSuchTask));

    let module = ReservationModule::init(&mgr, params).unwrap();
    assert!(!module.is_reserved());
    assert_eq!(module.pid(), -5);
    assert!(console().contains(
        "Reservation Module: Failed to set reservation for PID -5, error -3"
    ));
    assert!(mgr.is_empty());

    assert_eq!(module.exit(&mgr), Err(KernelError::NoSuchTask));
    assert!(console().contains(
        "Reservation Module: Failed to cancel reservation for PID -5, error -3"
    ));
}

/// Tests parsing the module parameters.
///
/// This test ensures that:
/// - Missing keys keep their defaults.
/// - Unknown keys and malformed values are rejected.
#[test]
fn params() {
    assert_eq!(ModuleParams::parse(""), Ok(ModuleParams::default()));
    assert!(!ModuleParams::default().has_pid());

    let p = ModuleParams::parse("pid=42 period_ms=500").unwrap();
    assert!(p.has_pid());
    assert_eq!(p.target(), Ok(42));
    assert_eq!(p.budget, Duration::from_secs(1));
    assert_eq!(p.period, Duration::from_millis(500));

    let p = ModuleParams::parse("budget_ms=20 pid=7").unwrap();
    assert_eq!((p.pid, p.budget), (7, Duration::from_millis(20)));

    for bad in ["pid=abc", "budget_ms=-1", "prio=5", "pid"] {
        assert_eq!(
            ModuleParams::parse(bad),
            Err(KernelError::InvalidArgument),
            "{bad}"
        );
    }
}
