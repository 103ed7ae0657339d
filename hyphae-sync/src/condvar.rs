//! A [condition variable] that works with any external lock.
//!
//! See the documentation for the [`Condvar`] type for details.
//!
//! [condition variable]: https://en.wikipedia.org/wiki/Monitor_(synchronization)#Condition_variables
use crate::{
    blocking::{Mutex, MutexGuard, RawMutex},
    loom::sync::atomic::{AtomicUsize, Ordering::*},
    semaphore::{self, Semaphore},
};
use core::{
    fmt,
    future::Future,
    pin::Pin,
    task::{ready, Context, Poll},
};

#[cfg(test)]
mod tests;

/// A [condition variable] that is not tied to a particular lock.
///
/// A `Condvar` lets threads and tasks wait for some condition to become true,
/// and be woken when another thread or task signals that it may have. Unlike
/// [`std::sync::Condvar`], a `Condvar` is not bound to the lock it is used
/// with: each wait is given the lock it should release and reacquire, so
/// several condition variables can share one lock, and any [`RawMutex`] may
/// be used.
///
/// A wait proceeds as follows:
///
/// 1. The waiter is registered with the condition variable.
/// 2. The lock is released.
/// 3. The waiter parks (in the [`wait_blocking`] and [`wait_guard_blocking`]
///    methods) or suspends (in the [`wait`] and [`wait_guard`] methods) until
///    it is notified.
/// 4. The lock is reacquired, and the wait returns.
///
/// Because registration happens before the lock is released, a notification
/// sent between steps 2 and 3 is not lost.
///
/// [`notify`](Self::notify) wakes one registered waiter, and
/// [`notify_all`](Self::notify_all) wakes every waiter registered at the time
/// of the call. Notifying a condition variable with no registered waiters
/// does nothing.
///
/// # Spurious wakeups
///
/// Waits have [Mesa semantics]: by the time a woken waiter has reacquired the
/// lock, the condition it was waiting for may no longer hold. Callers should
/// always check their condition in a loop.
///
/// Dropping an in-progress [`Wait`] future (or [`wait_guard`] future) takes
/// back its registration. If a notification had already been sent to it, that
/// notification is passed on to another waiter, or, if there is none, causes
/// the next waiter to wake up without a matching notification.
///
/// # Fairness
///
/// Notified waiters are woken in the order in which they started waiting for
/// a notification. However, a woken waiter must still reacquire the lock
/// before its wait returns, so waits do not necessarily *return* in that
/// order.
///
/// # Examples
///
/// ```
/// use hyphae_sync::{blocking::Mutex, Condvar};
/// use std::{sync::Arc, thread};
///
/// let pair = Arc::new((Mutex::new(false), Condvar::new()));
///
/// thread::spawn({
///     let pair = pair.clone();
///     move || {
///         let (started, condvar) = &*pair;
///         *started.lock() = true;
///         condvar.notify();
///     }
/// });
///
/// let (started, condvar) = &*pair;
/// let mut guard = started.lock();
/// while !*guard {
///     guard = condvar.wait_guard_blocking(guard);
/// }
/// ```
///
/// [condition variable]: https://en.wikipedia.org/wiki/Monitor_(synchronization)#Condition_variables
/// [Mesa semantics]: https://en.wikipedia.org/wiki/Monitor_(synchronization)#Nonblocking_condition_variables
/// [`wait_blocking`]: Self::wait_blocking
/// [`wait_guard_blocking`]: Self::wait_guard_blocking
/// [`wait`]: Self::wait
/// [`wait_guard`]: Self::wait_guard
pub struct Condvar {
    /// The number of waiters that have registered and have not yet been
    /// notified.
    waiters: AtomicUsize,
    /// Notifications are delivered as permits.
    permits: Semaphore,
}

/// Future returned by [`Condvar::wait`].
///
/// The lock passed to [`Condvar::wait`] is released the first time this
/// future is polled, and reacquired before it completes.
///
/// If this future is dropped after it was first polled and before it
/// completes, the lock is left unlocked and the waiter is unregistered.
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Wait<'a, L: RawMutex> {
    condvar: &'a Condvar,
    lock: &'a L,
    state: WaitState<'a>,
}

#[derive(Debug)]
enum WaitState<'a> {
    Init,
    Waiting(Notified<'a>),
    Done,
}

/// A registered waiter, completing once a notification has been handed to it.
///
/// Dropped before completion, it unregisters the waiter.
#[derive(Debug)]
#[must_use = "dropping a `Notified` unregisters the waiter"]
struct Notified<'a> {
    condvar: &'a Condvar,
    acquire: semaphore::Acquire<'a>,
    done: bool,
}

// === impl Condvar ===

impl Condvar {
    loom_const_fn! {
        /// Returns a new `Condvar` with no registered waiters.
        #[must_use]
        pub fn new() -> Self {
            Self {
                waiters: AtomicUsize::new(0),
                permits: Semaphore::new(0),
            }
        }
    }

    /// Waits to be notified, parking the current thread.
    ///
    /// `lock` is released while waiting, and reacquired before this method
    /// returns. The caller should hold `lock` when calling this method; if it
    /// does not, the lock is acquired on return anyway.
    #[cfg_attr(test, track_caller)]
    pub fn wait_blocking<L: RawMutex>(&self, lock: &L) {
        let notified = self.register();
        lock.unlock();

        notified.wait_blocking();

        lock.lock();
    }

    /// Waits to be notified, suspending the current task.
    ///
    /// `lock` is released when the returned [`Wait`] future is first polled,
    /// and reacquired before it completes. The caller should hold `lock`
    /// until then.
    pub fn wait<'a, L: RawMutex>(&'a self, lock: &'a L) -> Wait<'a, L> {
        Wait {
            condvar: self,
            lock,
            state: WaitState::Init,
        }
    }

    /// Waits to be notified, parking the current thread, while releasing the
    /// [`Mutex`] locked by `guard`.
    ///
    /// Returns a new guard once the mutex has been reacquired.
    #[cfg_attr(test, track_caller)]
    pub fn wait_guard_blocking<'a, T, L: RawMutex>(
        &self,
        guard: MutexGuard<'a, T, L>,
    ) -> MutexGuard<'a, T, L> {
        let notified = self.register();
        let mutex = MutexGuard::unlocked(guard);

        notified.wait_blocking();

        mutex.lock()
    }

    /// Waits to be notified, suspending the current task, while releasing the
    /// [`Mutex`] locked by `guard`.
    ///
    /// Returns a new guard once the mutex has been reacquired.
    pub async fn wait_guard<'a, T, L: RawMutex>(
        &self,
        guard: MutexGuard<'a, T, L>,
    ) -> MutexGuard<'a, T, L> {
        let notified = self.register();
        let mutex: &'a Mutex<T, L> = MutexGuard::unlocked(guard);

        notified.await;

        mutex.lock()
    }

    /// Wakes one registered waiter.
    ///
    /// If no waiters are registered, this does nothing.
    pub fn notify(&self) {
        let notified = self
            .waiters
            .fetch_update(AcqRel, Acquire, |waiters| waiters.checked_sub(1))
            .is_ok();
        if test_dbg!(notified) {
            self.permits.add_permits(1);
        }
    }

    /// Wakes every waiter registered at the time of the call.
    ///
    /// Returns the number of waiters woken.
    pub fn notify_all(&self) -> usize {
        let waiters = self.waiters.swap(0, AcqRel);
        trace!(waiters, "Condvar::notify_all");
        if waiters > 0 {
            self.permits.add_permits(waiters);
        }
        waiters
    }

    /// Returns the number of waiters that have not yet been notified.
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.waiters.load(Acquire)
    }

    /// Notifications released but not yet taken by a waiter.
    #[cfg(test)]
    pub(crate) fn undelivered(&self) -> usize {
        self.permits.available_permits()
    }

    fn register(&self) -> Notified<'_> {
        let _waiters = self.waiters.fetch_add(1, AcqRel) + 1;
        test_trace!(waiters = _waiters, "Condvar: registered waiter");
        Notified {
            condvar: self,
            acquire: self.permits.acquire(),
            done: false,
        }
    }

    /// Takes back one registration, unless every registered waiter has
    /// already been notified.
    fn unregister(&self) {
        let _unregistered = self
            .waiters
            .fetch_update(AcqRel, Acquire, |waiters| waiters.checked_sub(1))
            .is_ok();
        test_trace!(unregistered = _unregistered, "Condvar: waiter cancelled");
    }
}

impl Default for Condvar {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Condvar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condvar")
            .field("waiters", &self.waiters())
            .field("permits", &self.permits.available_permits())
            .finish()
    }
}

// === impl Wait ===

impl<L: RawMutex> Future for Wait<'_, L> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        loop {
            match this.state {
                WaitState::Init => {
                    let notified = this.condvar.register();
                    this.lock.unlock();
                    this.state = WaitState::Waiting(notified);
                }
                WaitState::Waiting(ref mut notified) => {
                    ready!(Pin::new(notified).poll(cx));
                    this.state = WaitState::Done;
                    this.lock.lock();
                    return Poll::Ready(());
                }
                WaitState::Done => panic!("`condvar::Wait` polled after completion"),
            }
        }
    }
}

impl<L: RawMutex> fmt::Debug for Wait<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wait")
            .field("condvar", &self.condvar)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

// === impl Notified ===

impl Notified<'_> {
    #[cfg_attr(test, track_caller)]
    fn wait_blocking(mut self) {
        self.condvar.permits.acquire_blocking().forget();
        self.done = true;
    }
}

impl Future for Notified<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        ready!(Pin::new(&mut this.acquire).poll(cx)).forget();
        this.done = true;
        Poll::Ready(())
    }
}

impl Drop for Notified<'_> {
    fn drop(&mut self) {
        // A permit already handed to `acquire` is passed on when it drops.
        if !self.done {
            self.condvar.unregister();
        }
    }
}
