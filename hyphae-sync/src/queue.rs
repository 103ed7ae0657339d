//! A first-in, first-out queue whose consumers can wait for items.
//!
//! See the documentation for the [`BlockingQueue`] type for details.
use crate::{
    blocking::{Mutex, MutexGuard},
    Closed, Condvar, WaitResult,
};
use std::{collections::VecDeque, fmt};


/// A first-in, first-out queue whose consumers can wait for items to be
/// enqueued.
///
/// Items are dequeued in the order in which they were enqueued. Consumers
/// that want to wait for an item to become available can either park the
/// current thread ([`dequeue_blocking`]) or suspend the current task
/// ([`dequeue_when_available`]).
///
/// # Producer completion
///
/// Producers signal that they will not enqueue any more items by calling
/// [`signal_no_more_items`]. Once they have, waiting consumers keep draining
/// the items that remain in the queue, and then fail with [`Closed`] instead
/// of waiting forever. Unlike a closed channel, a `BlockingQueue` can be
/// reopened: [`signal_more_items_coming`] makes consumers wait for items
/// again.
///
/// # Examples
///
/// ```
/// use hyphae_sync::BlockingQueue;
/// use std::{sync::Arc, thread};
///
/// let queue = Arc::new(BlockingQueue::new());
///
/// let producer = thread::spawn({
///     let queue = queue.clone();
///     move || {
///         for i in 0..3 {
///             queue.enqueue(i);
///         }
///         queue.signal_no_more_items();
///     }
/// });
///
/// let mut received = Vec::new();
/// while let Ok(item) = queue.dequeue_blocking() {
///     received.push(item);
/// }
///
/// assert_eq!(received, vec![0, 1, 2]);
/// # producer.join().unwrap();
/// ```
///
/// [`dequeue_blocking`]: Self::dequeue_blocking
/// [`dequeue_when_available`]: Self::dequeue_when_available
/// [`signal_no_more_items`]: Self::signal_no_more_items
/// [`signal_more_items_coming`]: Self::signal_more_items_coming
pub struct BlockingQueue<T> {
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
}

/// An error returned by [`BlockingQueue::dequeue`] and
/// [`BlockingQueue::peek`] when the queue is empty.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("queue is empty")]
pub struct Empty(());

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    production_stopped: bool,
    high_watermark: usize,
}

// === impl BlockingQueue ===

impl<T> BlockingQueue<T> {
    loom_const_fn! {
        /// Returns a new, empty `BlockingQueue`.
        #[must_use]
        pub fn new() -> Self {
            Self {
                state: Mutex::new(QueueState {
                    items: VecDeque::new(),
                    production_stopped: false,
                    high_watermark: 0,
                }),
                not_empty: Condvar::new(),
            }
        }
    }

    /// Adds `item` to the back of the queue, waking one consumer waiting for
    /// an item.
    pub fn enqueue(&self, item: T) {
        let mut state = self.state.lock();
        state.items.push_back(item);
        let len = state.items.len();
        if len > state.high_watermark {
            state.high_watermark = len;
        }
        trace!(len, "BlockingQueue::enqueue");
        self.not_empty.notify();
    }

    /// Removes the item at the front of the queue, without waiting.
    ///
    /// Returns [`Err`]`(`[`Empty`]`)` if the queue is empty.
    pub fn dequeue(&self) -> Result<T, Empty> {
        self.state.lock().items.pop_front().ok_or(Empty(()))
    }

    /// Removes the item at the front of the queue, parking the current thread
    /// until an item is available.
    ///
    /// # Returns
    ///
    /// - `Ok(T)` with the item at the front of the queue. Items that were
    ///   enqueued before [`signal_no_more_items`](Self::signal_no_more_items)
    ///   are still returned after it was called.
    /// - `Err(`[`Closed`]`)` if the queue is empty and producers have
    ///   signaled that no more items are coming.
    pub fn dequeue_blocking(&self) -> WaitResult<T> {
        self.wait_blocking().take()
    }

    /// Removes the item at the front of the queue, suspending the current task
    /// until an item is available.
    ///
    /// # Returns
    ///
    /// - `Ok(T)` with the item at the front of the queue. Items that were
    ///   enqueued before [`signal_no_more_items`](Self::signal_no_more_items)
    ///   are still returned after it was called.
    /// - `Err(`[`Closed`]`)` if the queue is empty and producers have
    ///   signaled that no more items are coming.
    pub async fn dequeue_when_available(&self) -> WaitResult<T> {
        self.wait().await.take()
    }

    /// Returns `true` if the queue contains an item equal to `item`.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.state.lock().items.contains(item)
    }

    /// Removes every item from the queue.
    pub fn clear(&self) {
        self.state.lock().items.clear();
    }

    /// Returns the number of items in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Returns `true` if the queue contains no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Returns the largest number of items the queue has ever held at once.
    #[must_use]
    pub fn high_watermark(&self) -> usize {
        self.state.lock().high_watermark
    }

    /// Returns `true` if producers have signaled that no more items are
    /// coming.
    #[must_use]
    pub fn is_production_stopped(&self) -> bool {
        self.state.lock().production_stopped
    }

    /// Signals that producers will not enqueue any more items.
    ///
    /// Consumers waiting for an item are woken: they dequeue the remaining
    /// items, if any, and then fail with [`Closed`]. Calling this method again
    /// before [`signal_more_items_coming`](Self::signal_more_items_coming)
    /// does nothing.
    pub fn signal_no_more_items(&self) {
        let mut state = self.state.lock();
        if state.production_stopped {
            return;
        }

        state.production_stopped = true;
        let _woken = self.not_empty.notify_all();
        trace!(woken = _woken, len = state.items.len(), "BlockingQueue: production stopped");
    }

    /// Signals that producers will enqueue more items, undoing
    /// [`signal_no_more_items`](Self::signal_no_more_items).
    ///
    /// Consumers will once again wait for items when the queue is empty.
    pub fn signal_more_items_coming(&self) {
        self.state.lock().production_stopped = false;
        trace!("BlockingQueue: production resumed");
    }

    /// Locks the queue, parking the current thread until it is not empty or
    /// production has stopped.
    fn wait_blocking(&self) -> MutexGuard<'_, QueueState<T>> {
        let mut state = self.state.lock();
        while test_dbg!(state.must_wait()) {
            state = self.not_empty.wait_guard_blocking(state);
        }
        state
    }

    /// Locks the queue, suspending the current task until it is not empty or
    /// production has stopped.
    async fn wait(&self) -> MutexGuard<'_, QueueState<T>> {
        let mut state = self.state.lock();
        while test_dbg!(state.must_wait()) {
            state = self.not_empty.wait_guard(state).await;
        }
        state
    }
}

impl<T: Clone> BlockingQueue<T> {
    /// Returns a clone of the item at the front of the queue, without
    /// removing it or waiting.
    ///
    /// Returns [`Err`]`(`[`Empty`]`)` if the queue is empty.
    pub fn peek(&self) -> Result<T, Empty> {
        self.state.lock().items.front().cloned().ok_or(Empty(()))
    }

    /// Returns a clone of the item at the front of the queue, without
    /// removing it, parking the current thread until an item is available.
    ///
    /// Returns `Err(`[`Closed`]`)` if the queue is empty and producers have
    /// signaled that no more items are coming.
    pub fn peek_blocking(&self) -> WaitResult<T> {
        let state = self.wait_blocking();
        self.peeked(&state)
    }

    /// Returns a clone of the item at the front of the queue, without
    /// removing it, suspending the current task until an item is available.
    ///
    /// Returns `Err(`[`Closed`]`)` if the queue is empty and producers have
    /// signaled that no more items are coming.
    pub async fn peek_when_available(&self) -> WaitResult<T> {
        let state = self.wait().await;
        self.peeked(&state)
    }

    /// Returns a snapshot of the items in the queue, from front to back.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.state.lock().items.iter().cloned().collect()
    }

    fn peeked(&self, state: &QueueState<T>) -> WaitResult<T> {
        let item = state.items.front().cloned().ok_or(Closed::new())?;
        // A peek leaves the item in the queue, so the notification it may have
        // consumed is passed on to another consumer.
        self.not_empty.notify();
        Ok(item)
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingQueue")
            .field("state", &self.state)
            .field("not_empty", &self.not_empty)
            .finish()
    }
}

// === impl QueueState ===

impl<T> QueueState<T> {
    fn must_wait(&self) -> bool {
        self.items.is_empty() && !self.production_stopped
    }

    fn take(&mut self) -> WaitResult<T> {
        self.items.pop_front().ok_or(Closed::new())
    }
}
