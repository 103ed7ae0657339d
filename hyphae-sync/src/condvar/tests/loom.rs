use super::*;
use crate::loom::{self, future, sync::Arc, thread};

#[test]
fn notify_is_not_lost() {
    loom::model(|| {
        let shared = Arc::new((Mutex::new(false), Condvar::new()));

        let waiter = thread::spawn({
            let shared = shared.clone();
            move || {
                let (done, condvar) = &*shared;
                let mut guard = done.lock();
                while !*guard {
                    guard = condvar.wait_guard_blocking(guard);
                }
            }
        });

        let (done, condvar) = &*shared;
        *done.lock() = true;
        condvar.notify();

        waiter.join().unwrap();
    })
}

#[test]
fn notify_all_async() {
    loom::model(|| {
        let shared = Arc::new((Mutex::new(false), Condvar::new()));

        let waiter = thread::spawn({
            let shared = shared.clone();
            move || {
                future::block_on(async {
                    let (done, condvar) = &*shared;
                    let mut guard = done.lock();
                    while !*guard {
                        guard = condvar.wait_guard(guard).await;
                    }
                })
            }
        });

        let (done, condvar) = &*shared;
        {
            let mut guard = done.lock();
            *guard = true;
            condvar.notify_all();
        }

        waiter.join().unwrap();
    })
}

#[test]
fn raw_lock_wait() {
    loom::model(|| {
        let shared = Arc::new((Spinlock::new(), Condvar::new()));

        let waiter = thread::spawn({
            let shared = shared.clone();
            move || {
                let (lock, condvar) = &*shared;
                lock.acquire();
                condvar.wait_blocking(lock);
                lock.release();
            }
        });

        let (lock, condvar) = &*shared;
        loop {
            lock.acquire();
            let waiting = condvar.waiters() == 1;
            if waiting {
                condvar.notify();
            }
            lock.release();
            if waiting {
                break;
            }
            thread::yield_now();
        }

        waiter.join().unwrap();
    })
}
