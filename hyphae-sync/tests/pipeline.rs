//! A two-stage pipeline mixing thread and task consumers.
use hyphae_sync::{Barrier, BlockingQueue, Monitor, RwLock};
use std::{collections::HashMap, sync::Arc, thread};

const ITEMS: usize = 200;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pipeline() {
    let start = Arc::new(Barrier::new(false));
    let parsed = Arc::new(BlockingQueue::<String>::new());
    let cache = Arc::new(RwLock::new(HashMap::<usize, String>::new()));
    let finished = Arc::new(Monitor::new(0usize));

    // stage 1: a thread that turns numbers into strings, once started.
    let producer = thread::spawn({
        let start = start.clone();
        let parsed = parsed.clone();
        move || {
            start.pass_blocking();
            for i in 0..ITEMS {
                parsed.enqueue(i.to_string());
            }
            parsed.signal_no_more_items();
        }
    });

    // stage 2: a blocking thread and an async task that both fill the cache.
    let blocking_consumer = thread::spawn({
        let parsed = parsed.clone();
        let cache = cache.clone();
        let finished = finished.clone();
        move || {
            while let Ok(item) = parsed.dequeue_blocking() {
                let key = item.parse::<usize>().expect("items are numbers");
                cache.write_blocking().insert(key, item);
            }
            let mut done = finished.enter();
            *done += 1;
            done.notify_all();
        }
    });

    let async_consumer = tokio::spawn({
        let parsed = parsed.clone();
        let cache = cache.clone();
        let finished = finished.clone();
        async move {
            while let Ok(item) = parsed.dequeue_when_available().await {
                let key = item.parse::<usize>().expect("items are numbers");
                cache.write().await.insert(key, item);
            }
            let mut done = finished.enter();
            *done += 1;
            done.notify_all();
        }
    });

    start.open();

    let done = finished.enter().wait_while(|done| *done < 2).await;
    assert_eq!(*done, 2);
    drop(done);

    async_consumer.await.unwrap();
    blocking_consumer.join().unwrap();
    producer.join().unwrap();

    let cache = cache.read().await;
    assert_eq!(cache.len(), ITEMS);
    assert!((0..ITEMS).all(|i| cache.get(&i) == Some(&i.to_string())));
    assert!(parsed.is_empty());
    assert!(parsed.high_watermark() >= 1);
}
