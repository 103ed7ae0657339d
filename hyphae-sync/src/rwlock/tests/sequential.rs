use super::*;
use futures_util::FutureExt;
use tokio_test::{assert_pending, assert_ready, task};

// multiple reads should be Ready
#[test]
fn read_shared() {
    let lock = RwLock::new(100);

    let mut t1 = task::spawn(lock.read());
    let _g1 = assert_ready!(t1.poll());
    let mut t2 = task::spawn(lock.read());
    let _g2 = assert_ready!(t2.poll());

    assert_eq!(lock.reader_count(), 2);
}

// When there is an active shared owner, exclusive access should not be possible
#[test]
fn write_shared_pending() {
    let lock = RwLock::new(100);
    let mut t1 = task::spawn(lock.read());

    let _g1 = assert_ready!(t1.poll());
    let mut t2 = task::spawn(lock.write());
    assert_pending!(t2.poll());
}

// When there is an active exclusive owner, shared access should not be possible
#[test]
fn read_exclusive_pending() {
    let lock = RwLock::new(100);
    let mut t1 = task::spawn(lock.write());

    let _g1 = assert_ready!(t1.poll());
    let mut t2 = task::spawn(lock.read());
    assert_pending!(t2.poll());
    assert_eq!(lock.reader_count(), 0);
}

// When there is an active exclusive owner, subsequent exclusive access should not be possible
#[test]
fn write_exclusive_pending() {
    let lock = RwLock::new(100);
    let mut t1 = task::spawn(lock.write());

    let _g1 = assert_ready!(t1.poll());
    let mut t2 = task::spawn(lock.write());
    assert_pending!(t2.poll());
}

// When there is an active shared owner, exclusive access should be possible after shared is dropped
#[test]
fn write_shared_drop() {
    let lock = RwLock::new(100);
    let mut t1 = task::spawn(lock.read());

    let g1 = assert_ready!(t1.poll());
    let mut t2 = task::spawn(lock.write());
    assert_pending!(t2.poll());
    drop(g1);
    assert!(t2.is_woken());
    let _g2 = assert_ready!(t2.poll());
}

// When there is an active shared owner, and exclusive access is requested,
// subsequent shared access should not be possible, as the writer has reserved
// the lock
#[test]
fn reader_blocks_behind_reserved_writer() {
    let lock = RwLock::new(100);
    let mut t1 = task::spawn(lock.read());
    let _g1 = assert_ready!(t1.poll());

    let mut t2 = task::spawn(lock.read());
    let _g2 = assert_ready!(t2.poll());

    let mut t3 = task::spawn(lock.write());
    assert_pending!(t3.poll());

    let mut t4 = task::spawn(lock.read());
    assert_pending!(t4.poll());
    assert!(lock.try_read().is_none());
    assert_eq!(lock.reader_count(), 2);
}

// The reserved writer gets the lock before the readers that arrived after it.
#[test]
fn reserved_writer_goes_first() {
    let lock = RwLock::new(100);
    let mut r1 = task::spawn(lock.read());
    let g1 = assert_ready!(r1.poll());

    let mut w = task::spawn(lock.write());
    assert_pending!(w.poll());

    let mut r2 = task::spawn(lock.read());
    assert_pending!(r2.poll());

    drop(g1);
    assert!(w.is_woken());
    let mut write = assert_ready!(w.poll());
    *write += 1;

    // the writer released the reservation once it acquired the lock, so the
    // reader moved on, and now waits for the writer to finish.
    assert!(r2.is_woken());
    assert_pending!(r2.poll());

    drop(write);
    assert!(r2.is_woken());
    let read = assert_ready!(r2.poll());
    assert_eq!(*read, 101);
}

// when there is an active shared owner, and exclusive access is triggered,
// reading should be possible after pending exclusive access is dropped
#[test]
fn write_read_shared_drop_pending() {
    let lock = RwLock::new(100);
    let mut t1 = task::spawn(lock.read());
    let _g1 = assert_ready!(t1.poll());

    let mut t2 = task::spawn(lock.write());
    assert_pending!(t2.poll());

    let mut t3 = task::spawn(lock.read());
    assert_pending!(t3.poll());
    drop(t2);

    assert!(t3.is_woken());
    let _t3 = assert_ready!(t3.poll());
    assert_eq!(lock.reader_count(), 2);
}

// Acquire an RwLock nonexclusively by a single task
#[tokio::test]
async fn read_uncontested() {
    let rwlock = RwLock::new(100);
    let result = *rwlock.read().await;

    assert_eq!(result, 100);
}

// Acquire an uncontested RwLock in exclusive mode
#[tokio::test]
async fn write_uncontested() {
    let rwlock = RwLock::new(100);
    let mut result = rwlock.write().await;
    *result += 50;
    assert_eq!(*result, 150);
}

// RwLocks should be acquired in the order that their Futures are waited upon.
#[tokio::test]
async fn write_order() {
    let rwlock = RwLock::<Vec<u32>>::new(vec![]);
    let fut2 = rwlock.write().map(|mut guard| guard.push(2));
    let fut1 = rwlock.write().map(|mut guard| guard.push(1));
    fut1.await;
    fut2.await;

    let g = rwlock.read().await;
    assert_eq!(*g, vec![1, 2]);
}

#[test]
fn try_write() {
    let lock = RwLock::new(0);
    let read_guard = lock.read_blocking();
    assert!(lock.try_write().is_none());
    drop(read_guard);

    let mut write_guard = lock.try_write().expect("lock is unlocked");
    *write_guard += 1;
    assert!(lock.try_write().is_none());
    assert!(lock.try_read().is_none());
    drop(write_guard);

    assert_eq!(*lock.try_read().expect("lock is unlocked"), 1);
}

#[test]
fn last_reader_releases_the_lock() {
    let lock = RwLock::new(0);

    let r1 = lock.try_read().expect("lock is unlocked");
    let r2 = lock.try_read().expect("readers share the lock");
    assert_eq!(lock.reader_count(), 2);

    drop(r1);
    assert_eq!(lock.reader_count(), 1);
    assert!(lock.try_write().is_none());

    drop(r2);
    assert_eq!(lock.reader_count(), 0);
    assert!(lock.try_write().is_some());
}

#[test]
fn get_mut_and_into_inner() {
    let mut lock = RwLock::new(String::from("hello"));
    lock.get_mut().push_str(", world");
    assert_eq!(lock.into_inner(), "hello, world");
}
