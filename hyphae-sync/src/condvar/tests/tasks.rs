use super::*;
use crate::{spin::Spinlock, util::test::trace_init};
use tokio_test::{assert_pending, assert_ready, task};

#[test]
fn notify_without_waiters_is_not_remembered() {
    let _trace = trace_init();
    let lock = Spinlock::new();
    let condvar = Condvar::new();

    condvar.notify();
    assert_eq!(condvar.notify_all(), 0);
    assert_eq!(condvar.undelivered(), 0);

    lock.acquire();
    let mut wait = task::spawn(condvar.wait(&lock));
    assert_pending!(wait.poll());
    assert_eq!(condvar.waiters(), 1);
}

#[test]
fn wait_releases_and_reacquires_lock() {
    let _trace = trace_init();
    let lock = Spinlock::new();
    let condvar = Condvar::new();

    lock.acquire();
    let mut wait = task::spawn(condvar.wait(&lock));
    // the lock is only released once the future is polled.
    assert!(lock.is_locked());

    assert_pending!(wait.poll());
    assert!(!lock.is_locked());

    condvar.notify();
    assert!(wait.is_woken());
    assert_ready!(wait.poll());
    assert!(lock.is_locked());
    assert_eq!(condvar.waiters(), 0);
}

#[test]
fn notify_wakes_one() {
    let _trace = trace_init();
    let mutex = Mutex::new(());
    let condvar = Condvar::new();

    let mut wait1 = task::spawn(condvar.wait_guard(mutex.lock()));
    assert_pending!(wait1.poll());
    let mut wait2 = task::spawn(condvar.wait_guard(mutex.lock()));
    assert_pending!(wait2.poll());
    assert_eq!(condvar.waiters(), 2);

    condvar.notify();
    assert!(wait1.is_woken());
    assert!(!wait2.is_woken());
    let guard = assert_ready!(wait1.poll());
    drop(guard);

    condvar.notify();
    assert!(wait2.is_woken());
    assert_ready!(wait2.poll());
}

#[test]
fn notify_all_wakes_registered_waiters() {
    let _trace = trace_init();
    let mutex = Mutex::new(());
    let condvar = Condvar::new();

    let mut wait1 = task::spawn(condvar.wait_guard(mutex.lock()));
    assert_pending!(wait1.poll());
    let mut wait2 = task::spawn(condvar.wait_guard(mutex.lock()));
    assert_pending!(wait2.poll());

    assert_eq!(condvar.notify_all(), 2);
    assert_eq!(condvar.waiters(), 0);
    assert!(wait1.is_woken());
    assert!(wait2.is_woken());

    drop(assert_ready!(wait1.poll()));
    drop(assert_ready!(wait2.poll()));

    // waiters registered after `notify_all` are not woken by it.
    let mut wait3 = task::spawn(condvar.wait_guard(mutex.lock()));
    assert_pending!(wait3.poll());
    assert!(!wait3.is_woken());
}

#[test]
fn condvars_share_a_lock() {
    let _trace = trace_init();
    let lock = Spinlock::new();
    let not_empty = Condvar::new();
    let not_full = Condvar::new();

    lock.acquire();
    let mut wait_not_empty = task::spawn(not_empty.wait(&lock));
    assert_pending!(wait_not_empty.poll());

    lock.acquire();
    let mut wait_not_full = task::spawn(not_full.wait(&lock));
    assert_pending!(wait_not_full.poll());

    not_full.notify();
    assert!(!wait_not_empty.is_woken());
    assert!(wait_not_full.is_woken());
    assert_ready!(wait_not_full.poll());
    lock.release();

    not_empty.notify();
    assert!(wait_not_empty.is_woken());
    assert_ready!(wait_not_empty.poll());
    assert!(lock.is_locked());
}

#[test]
fn cancelled_wait_unregisters() {
    let _trace = trace_init();
    let lock = Spinlock::new();
    let condvar = Condvar::new();

    lock.acquire();
    let mut wait = task::spawn(condvar.wait(&lock));
    assert_pending!(wait.poll());
    assert_eq!(condvar.waiters(), 1);

    drop(wait);
    assert_eq!(condvar.waiters(), 0);
    assert!(!lock.is_locked());

    // nothing is left over to wake the next waiter.
    assert_eq!(condvar.notify_all(), 0);
    assert_eq!(condvar.undelivered(), 0);
    lock.acquire();
    let mut wait = task::spawn(condvar.wait(&lock));
    assert_pending!(wait.poll());
    assert!(!wait.is_woken());
}

#[test]
fn repeated_cancellation_does_not_accumulate() {
    let _trace = trace_init();
    let mutex = Mutex::new(());
    let condvar = Condvar::new();

    for _ in 0..10 {
        let mut wait = task::spawn(condvar.wait_guard(mutex.lock()));
        assert_pending!(wait.poll());
        assert_eq!(condvar.waiters(), 1);
    }

    assert_eq!(condvar.waiters(), 0);
    assert_eq!(condvar.notify_all(), 0);
    assert_eq!(condvar.undelivered(), 0);
    assert!(!mutex.is_locked());
}

#[test]
fn cancelled_after_notify_passes_it_on() {
    let _trace = trace_init();
    let mutex = Mutex::new(());
    let condvar = Condvar::new();

    let mut wait1 = task::spawn(condvar.wait_guard(mutex.lock()));
    assert_pending!(wait1.poll());
    let mut wait2 = task::spawn(condvar.wait_guard(mutex.lock()));
    assert_pending!(wait2.poll());

    condvar.notify();
    assert!(wait1.is_woken());
    drop(wait1);

    assert!(wait2.is_woken());
    assert_eq!(condvar.waiters(), 0);
    drop(assert_ready!(wait2.poll()));
    assert_eq!(condvar.undelivered(), 0);
}
