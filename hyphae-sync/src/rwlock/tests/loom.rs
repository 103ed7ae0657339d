use super::*;
use crate::loom::{self, future, sync::Arc, thread};

#[test]
fn write() {
    const WRITERS: usize = 2;

    loom::model(|| {
        let lock = Arc::new(RwLock::<usize>::new(0));
        let threads = (0..WRITERS)
            .map(|_| {
                let lock = lock.clone();
                thread::spawn(writer(lock))
            })
            .collect::<Vec<_>>();

        for thread in threads {
            thread.join().expect("writer thread mustn't panic");
        }

        let guard = lock.try_read().expect("lock is unlocked");
        assert_eq!(*guard, WRITERS, "final state must equal number of writers");
    });
}

#[test]
fn read_write() {
    loom::model(|| {
        let lock = Arc::new(RwLock::<usize>::new(0));
        let writer = thread::spawn(writer(lock.clone()));

        let guard = future::block_on(lock.read());
        assert!(*guard == 0 || *guard == 1);
        drop(guard);

        writer.join().expect("writer thread mustn't panic");
        assert_eq!(lock.reader_count(), 0);
    });
}

#[test]
fn blocking_readers_and_writer() {
    loom::model(|| {
        let lock = Arc::new(RwLock::<usize>::new(0));

        let reader = thread::spawn({
            let lock = lock.clone();
            move || {
                let value = *lock.read_blocking();
                assert!(value == 0 || value == 1);
            }
        });

        *lock.write_blocking() += 1;
        let value = *lock.read_blocking();
        assert_eq!(value, 1);

        reader.join().expect("reader thread mustn't panic");
    });
}

fn writer(lock: Arc<RwLock<usize>>) -> impl FnOnce() {
    move || {
        future::block_on(async {
            let mut guard = lock.write().await;
            *guard += 1;
        })
    }
}
