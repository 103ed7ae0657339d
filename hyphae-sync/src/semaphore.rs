//! A [counting semaphore] that waits by parking threads or suspending tasks.
//!
//! This is the wait primitive underneath the [`Condvar`](crate::Condvar),
//! [`Monitor`](crate::Monitor) and [`RwLock`](crate::RwLock) types. See the
//! [`Semaphore`] type's documentation for details.
//!
//! [counting semaphore]: https://en.wikipedia.org/wiki/Semaphore_(programming)
use crate::{
    blocking::Mutex,
    loom::{
        sync::{
            atomic::{AtomicBool, Ordering::*},
            Arc,
        },
        thread::{self, Thread},
    },
    ReleaseError,
};
use std::{
    cmp,
    collections::VecDeque,
    fmt,
    future::Future,
    pin::Pin,
    task::{ready, Context, Poll, Waker},
};


/// A [counting semaphore] that waits by parking threads or suspending tasks.
///
/// A semaphore holds a count of _permits_. Acquiring a permit decrements the
/// count; when no permits remain, an acquirer must wait until another thread
/// or task [releases](Semaphore::release) one. Released permits accumulate
/// without bound (up to [`MAX_PERMITS`](Self::MAX_PERMITS)) until they are
/// acquired.
///
/// Every acquisition may wait in one of two ways:
///
/// - [`acquire_blocking`](Self::acquire_blocking) parks the calling thread
///   until a permit is handed to it, consuming no CPU while parked.
/// - [`acquire`](Self::acquire) returns a [`Future`] which suspends the
///   calling task, yielding to the executor until a permit is handed to it.
///
/// Both kinds of waiter share one queue, so threads and tasks may wait on the
/// same semaphore concurrently.
///
/// The [`Permit`] type is a RAII guard representing an acquired permit. When
/// a [`Permit`] is dropped, the permit is released back to the `Semaphore`.
/// Call [`Permit::forget`] to consume a permit without returning it.
///
/// # Fairness
///
/// This semaphore is _fair_: released permits are handed directly to waiters
/// in the order in which they began waiting (first-in, first-out), and a
/// permit is never left available while a waiter is queued, so a newly
/// arriving acquirer cannot take a permit ahead of a queued one.
///
/// # Cancellation
///
/// If an [`Acquire`] future is dropped while waiting, it is removed from the
/// queue. If a permit was already handed to it, that permit is passed on to
/// the next waiter (or returned to the semaphore).
///
/// # Examples
///
/// ```
/// use hyphae_sync::Semaphore;
/// use std::{sync::Arc, thread};
///
/// let semaphore = Arc::new(Semaphore::new(0));
///
/// let waiter = thread::spawn({
///     let semaphore = semaphore.clone();
///     move || {
///         // parks this thread until a permit is released.
///         let permit = semaphore.acquire_blocking();
///         permit.forget();
///     }
/// });
///
/// semaphore.release(1).expect("one permit is a valid release");
/// waiter.join().unwrap();
/// ```
///
/// [counting semaphore]: https://en.wikipedia.org/wiki/Semaphore_(programming)
#[derive(Debug)]
pub struct Semaphore {
    state: Mutex<SemState>,
}

/// A [RAII guard] representing a permit acquired from a [`Semaphore`].
///
/// When the `Permit` is dropped, the permit is released back to the
/// [`Semaphore`], potentially waking a waiter.
///
/// This type is returned by the [`Semaphore::acquire`],
/// [`Semaphore::acquire_blocking`] and [`Semaphore::try_acquire`] methods.
///
/// [RAII guard]: https://rust-unofficial.github.io/patterns/patterns/behavioural/RAII.html
#[derive(Debug)]
#[must_use = "dropping a `Permit` releases the acquired permit back to the `Semaphore`"]
pub struct Permit<'sem> {
    semaphore: &'sem Semaphore,
}

/// The future returned by the [`Semaphore::acquire`] method.
#[derive(Debug)]
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Acquire<'sem> {
    semaphore: &'sem Semaphore,
    waiter: Option<Arc<Waiter>>,
}

/// The state protected by the semaphore's lock.
///
/// Invariant: if `permits > 0`, then `queue` is empty.
#[derive(Debug)]
struct SemState {
    permits: usize,
    queue: VecDeque<Arc<Waiter>>,
}

/// A queued acquirer.
///
/// A waiter is dequeued by the thread that hands it a permit, which then
/// calls [`Waiter::notify`] after releasing the semaphore's lock.
struct Waiter {
    notified: AtomicBool,
    wakeup: Mutex<Option<Wakeup>>,
}

/// How a [`Waiter`] is woken once it has been handed a permit.
#[derive(Debug)]
enum Wakeup {
    /// A thread parked in [`Semaphore::acquire_blocking`].
    Thread(Thread),
    /// A task suspended in an [`Acquire`] future.
    Task(Waker),
}

// === impl Semaphore ===

impl Semaphore {
    /// The maximum number of permits a `Semaphore` may hold.
    pub const MAX_PERMITS: usize = usize::MAX;

    loom_const_fn! {
        /// Returns a new `Semaphore` with `permits` permits available.
        #[must_use]
        pub fn new(permits: usize) -> Self {
            Self {
                state: Mutex::new(SemState {
                    permits,
                    queue: VecDeque::new(),
                }),
            }
        }
    }

    /// Returns the number of permits currently available in this semaphore.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.state.lock().permits
    }

    /// Returns the number of threads and tasks currently waiting for a permit.
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Acquire a permit from the `Semaphore`, waiting asynchronously if none
    /// is currently available.
    ///
    /// The calling task is registered as a waiter the first time the returned
    /// [`Acquire`] future is polled.
    pub fn acquire(&self) -> Acquire<'_> {
        Acquire {
            semaphore: self,
            waiter: None,
        }
    }

    /// Acquire a permit from the `Semaphore`, parking the current thread if
    /// none is currently available.
    #[cfg_attr(test, track_caller)]
    pub fn acquire_blocking(&self) -> Permit<'_> {
        if let Some(waiter) = self.acquire_or_enqueue(|| Wakeup::Thread(thread::current())) {
            waiter.park();
        }

        Permit { semaphore: self }
    }

    /// Try to acquire a permit from the `Semaphore`, without waiting for one
    /// to become available.
    ///
    /// Returns [`None`] if no permits are currently available.
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut state = self.state.lock();
        if test_dbg!(state.permits) == 0 {
            return None;
        }

        state.permits -= 1;
        Some(Permit { semaphore: self })
    }

    /// Release `permits` new permits to the semaphore.
    ///
    /// Released permits are handed to queued waiters first, in the order in
    /// which they started waiting; any permits left over are added to the
    /// semaphore's count.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if the permits were released.
    /// - `Err(`[`ReleaseError::Zero`]`)` if `permits` is zero.
    /// - `Err(`[`ReleaseError::Overflow`]`)` if the permits left over after
    ///   waking waiters would exceed [`MAX_PERMITS`](Self::MAX_PERMITS). No
    ///   waiters are woken in this case.
    pub fn release(&self, permits: usize) -> Result<(), ReleaseError> {
        if permits == 0 {
            return Err(ReleaseError::Zero);
        }
        enter_test_debug_span!("Semaphore::release", permits);

        let woken = {
            let mut state = self.state.lock();
            let handoff = cmp::min(permits, state.queue.len());
            state.permits = state
                .permits
                .checked_add(permits - handoff)
                .ok_or(ReleaseError::Overflow {
                    requested: permits,
                    max: Self::MAX_PERMITS,
                })?;
            trace!(
                permits,
                handoff,
                available = state.permits,
                "Semaphore::release"
            );
            state.queue.drain(..handoff).collect::<Vec<_>>()
        };

        // Woken waiters never take the state lock, but `notify` may run
        // arbitrary waker code.
        for waiter in woken {
            waiter.notify();
        }

        Ok(())
    }

    /// Release permits whose count is known to be valid.
    ///
    /// # Panics
    ///
    /// If `permits` is zero, or if the semaphore would overflow.
    #[track_caller]
    pub(crate) fn add_permits(&self, permits: usize) {
        if let Err(error) = self.release(permits) {
            panic!("Semaphore::add_permits({permits}): {error}");
        }
    }

    /// Takes an available permit, or queues a new waiter woken by `wakeup`.
    ///
    /// This is the core shared by the parking and the suspending acquire
    /// paths: they differ only in the kind of [`Wakeup`] they queue.
    fn acquire_or_enqueue(&self, wakeup: impl FnOnce() -> Wakeup) -> Option<Arc<Waiter>> {
        let mut state = self.state.lock();
        if test_dbg!(state.permits) > 0 {
            state.permits -= 1;
            return None;
        }

        let waiter = Arc::new(Waiter::new(wakeup()));
        state.queue.push_back(waiter.clone());
        trace!(waiters = state.queue.len(), "Semaphore: waiting for a permit");
        Some(waiter)
    }

    /// Removes a waiter that stopped waiting before it observed its permit.
    fn cancel(&self, waiter: &Arc<Waiter>) {
        let mut state = self.state.lock();
        if let Some(idx) = state.queue.iter().position(|w| Arc::ptr_eq(w, waiter)) {
            test_debug!(idx, "Semaphore: removed cancelled waiter");
            state.queue.remove(idx);
            return;
        }
        drop(state);

        // The waiter was already dequeued, so it was handed a permit that it
        // will never use. Pass it on.
        test_debug!("Semaphore: cancelled waiter already had a permit");
        self.add_permits(1);
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new(0)
    }
}

// === impl Permit ===

impl Permit<'_> {
    /// Consumes this permit without releasing it back to the [`Semaphore`].
    ///
    /// This permanently decreases the number of permits in the semaphore.
    pub fn forget(self) {
        core::mem::forget(self)
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.semaphore.add_permits(1);
    }
}

// === impl Acquire ===

impl<'sem> Future for Acquire<'sem> {
    type Output = Permit<'sem>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        match this.waiter {
            None => {
                let waiter = this
                    .semaphore
                    .acquire_or_enqueue(|| Wakeup::Task(cx.waker().clone()));
                match waiter {
                    None => Poll::Ready(Permit {
                        semaphore: this.semaphore,
                    }),
                    Some(waiter) => {
                        this.waiter = Some(waiter);
                        Poll::Pending
                    }
                }
            }
            Some(ref waiter) => {
                ready!(waiter.poll_notified(cx));
                this.waiter = None;
                Poll::Ready(Permit {
                    semaphore: this.semaphore,
                })
            }
        }
    }
}

impl Drop for Acquire<'_> {
    fn drop(&mut self) {
        if let Some(waiter) = self.waiter.take() {
            self.semaphore.cancel(&waiter);
        }
    }
}

// === impl Waiter ===

impl Waiter {
    fn new(wakeup: Wakeup) -> Self {
        Self {
            notified: AtomicBool::new(false),
            wakeup: Mutex::new(Some(wakeup)),
        }
    }

    fn is_notified(&self) -> bool {
        self.notified.load(Acquire)
    }

    fn notify(&self) {
        self.notified.store(true, Release);
        let wakeup = self.wakeup.lock().take();
        if let Some(wakeup) = wakeup {
            wakeup.wake();
        }
    }

    /// Parks the current thread until this waiter has been notified.
    fn park(&self) {
        // `park` may return spuriously, so keep parking until the flag is
        // actually set.
        while !test_dbg!(self.is_notified()) {
            thread::park();
        }
    }

    fn poll_notified(&self, cx: &mut Context<'_>) -> Poll<()> {
        if self.is_notified() {
            return Poll::Ready(());
        }

        let mut wakeup = self.wakeup.lock();
        // Checked again with the lock held: if `notify` has not set the flag
        // yet, it will take the waker stored below.
        if self.is_notified() {
            return Poll::Ready(());
        }

        match &mut *wakeup {
            Some(Wakeup::Task(waker)) if waker.will_wake(cx.waker()) => {}
            slot => *slot = Some(Wakeup::Task(cx.waker().clone())),
        }

        Poll::Pending
    }
}

impl fmt::Debug for Waiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter")
            .field("notified", &self.is_notified())
            .finish_non_exhaustive()
    }
}

// === impl Wakeup ===

impl Wakeup {
    fn wake(self) {
        match self {
            Wakeup::Thread(thread) => thread.unpark(),
            Wakeup::Task(waker) => waker.wake(),
        }
    }
}
