use super::*;
use crate::util::test::trace_init;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering::SeqCst},
        Arc, Barrier,
    },
    thread,
};

#[test]
fn readers_coexist() {
    const READERS: usize = 4;
    let _trace = trace_init();
    let lock = Arc::new(RwLock::new(7));
    // every reader must hold its guard at the same time to get past this.
    let all_reading = Arc::new(Barrier::new(READERS));

    let readers = (0..READERS)
        .map(|_| {
            let lock = lock.clone();
            let all_reading = all_reading.clone();
            thread::spawn(move || {
                let guard = lock.read_blocking();
                all_reading.wait();
                assert_eq!(*guard, 7);
            })
        })
        .collect::<Vec<_>>();

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(lock.reader_count(), 0);
}

#[test]
fn two_writers_serialize() {
    const ITERATIONS: usize = 100;
    let _trace = trace_init();
    let lock = Arc::new(RwLock::new(0usize));
    let writing = Arc::new(AtomicUsize::new(0));

    let writers = (0..2)
        .map(|_| {
            let lock = lock.clone();
            let writing = writing.clone();
            thread::spawn(move || {
                for _ in 0..ITERATIONS {
                    let mut guard = lock.write_blocking();
                    assert_eq!(writing.fetch_add(1, SeqCst), 0);
                    *guard += 1;
                    assert_eq!(writing.fetch_sub(1, SeqCst), 1);
                }
            })
        })
        .collect::<Vec<_>>();

    for writer in writers {
        writer.join().unwrap();
    }
    assert_eq!(*lock.read_blocking(), 2 * ITERATIONS);
}

#[test]
fn no_writer_while_readers_are_active() {
    const THREADS: usize = 4;
    const ITERATIONS: usize = 50;
    let _trace = trace_init();
    let lock = Arc::new(RwLock::new(()));
    let readers = Arc::new(AtomicUsize::new(0));
    let writers = Arc::new(AtomicUsize::new(0));

    let threads = (0..THREADS)
        .map(|i| {
            let lock = lock.clone();
            let readers = readers.clone();
            let writers = writers.clone();
            thread::spawn(move || {
                for _ in 0..ITERATIONS {
                    if i % 2 == 0 {
                        let _guard = lock.write_blocking();
                        assert_eq!(writers.fetch_add(1, SeqCst), 0);
                        assert_eq!(readers.load(SeqCst), 0);
                        writers.fetch_sub(1, SeqCst);
                    } else {
                        let _guard = lock.read_blocking();
                        readers.fetch_add(1, SeqCst);
                        assert_eq!(writers.load(SeqCst), 0);
                        readers.fetch_sub(1, SeqCst);
                    }
                }
            })
        })
        .collect::<Vec<_>>();

    for thread in threads {
        thread.join().unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_and_writers_tasks() {
    const TASKS: usize = 16;
    let _trace = trace_init();
    let lock = Arc::new(RwLock::new(0usize));

    let tasks = (0..TASKS)
        .map(|i| {
            let lock = lock.clone();
            tokio::spawn(async move {
                if i % 4 == 0 {
                    *lock.write().await += 1;
                } else {
                    let value = *lock.read().await;
                    assert!(value <= TASKS / 4);
                }
            })
        })
        .collect::<Vec<_>>();

    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(*lock.read().await, TASKS / 4);
}
