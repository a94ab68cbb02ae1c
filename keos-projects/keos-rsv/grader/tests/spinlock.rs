use keos::sync::SpinLock;
use std::{sync::Arc, thread};

/// Tests that the lock excludes concurrent holders.
#[test]
fn mutual_exclusion() {
    let counter = Arc::new(SpinLock::new(0usize));
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    let mut guard = counter.lock();
                    *guard += 1;
                    guard.unlock();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    let counter = Arc::try_unwrap(counter).ok().unwrap();
    assert_eq!(counter.into_inner(), 4000);
}

/// Tests that `try_lock` does not wait for a held lock.
#[test]
fn try_lock() {
    let lock = SpinLock::new(1);
    let guard = lock.lock();
    assert!(lock.try_lock().is_err());
    guard.unlock();

    let mut guard = lock.try_lock().unwrap();
    *guard = 2;
    guard.unlock();
    assert_eq!(lock.into_inner(), 2);
}

/// Tests that a guard dropped without `unlock` is reported.
#[test]
#[should_panic(expected = "must be explicitly called")]
fn drop_without_unlock() {
    let lock = SpinLock::new(());
    let _guard = lock.lock();
}
