//! A [monitor]: a mutual exclusion lock bundled with a condition variable.
//!
//! See the documentation for the [`Monitor`] type for details.
//!
//! [monitor]: https://en.wikipedia.org/wiki/Monitor_(synchronization)
use crate::{
    blocking::{Mutex, MutexGuard},
    Condvar,
};
use core::{
    fmt,
    ops::{Deref, DerefMut},
};


/// A [monitor] protecting a value of type `T`.
///
/// A monitor pairs a [`Spinlock`]-backed [`Mutex`] with its own [`Condvar`].
/// [`enter`](Self::enter) acquires the monitor's lock and returns a
/// [`MonitorGuard`], through which the protected value can be accessed.
/// Dropping the guard (or calling [`MonitorGuard::exit`]) exits the monitor.
///
/// While inside the monitor, a thread or task may wait for the protected
/// value to change using [`MonitorGuard::wait_blocking`] or
/// [`MonitorGuard::wait`], which exit the monitor while waiting and enter it
/// again before returning. Since waiting consumes the guard and returns a new
/// one, it is only possible to wait while holding the monitor.
///
/// Entering the monitor spins: the lock is meant to be held only for short
/// critical sections. A `MonitorGuard` must not be held across an `.await`
/// point, other than the ones inside [`MonitorGuard::wait`] and
/// [`MonitorGuard::wait_while`].
///
/// # Examples
///
/// ```
/// use hyphae_sync::Monitor;
/// use std::{sync::Arc, thread};
///
/// let monitor = Arc::new(Monitor::new(0usize));
///
/// let incrementer = thread::spawn({
///     let monitor = monitor.clone();
///     move || {
///         for _ in 0..10 {
///             let mut count = monitor.enter();
///             *count += 1;
///             count.notify_all();
///         }
///     }
/// });
///
/// let count = monitor.enter().wait_while_blocking(|count| *count < 10);
/// assert_eq!(*count, 10);
/// # drop(count);
/// # incrementer.join().unwrap();
/// ```
///
/// [monitor]: https://en.wikipedia.org/wiki/Monitor_(synchronization)
/// [`Spinlock`]: crate::Spinlock
pub struct Monitor<T> {
    mutex: Mutex<T>,
    condvar: Condvar,
}

/// An RAII guard representing the current thread or task being inside a
/// [`Monitor`].
///
/// The protected value can be accessed through this guard's [`Deref`] and
/// [`DerefMut`] implementations. When the guard is dropped, the monitor is
/// exited.
#[must_use = "if unused, the `Monitor` will immediately be exited"]
pub struct MonitorGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    condvar: &'a Condvar,
}

// === impl Monitor ===

impl<T> Monitor<T> {
    loom_const_fn! {
        /// Returns a new `Monitor` protecting `data`.
        #[must_use]
        pub fn new(data: T) -> Self {
            Self {
                mutex: Mutex::new(data),
                condvar: Condvar::new(),
            }
        }
    }

    /// Enters the monitor, spinning until no other thread or task is inside
    /// it.
    #[cfg_attr(test, track_caller)]
    pub fn enter(&self) -> MonitorGuard<'_, T> {
        MonitorGuard {
            guard: self.mutex.lock(),
            condvar: &self.condvar,
        }
    }

    /// Enters the monitor if no other thread or task is inside it.
    ///
    /// Returns [`None`] if the monitor is currently entered.
    #[must_use]
    pub fn try_enter(&self) -> Option<MonitorGuard<'_, T>> {
        let guard = self.mutex.try_lock()?;
        Some(MonitorGuard {
            guard,
            condvar: &self.condvar,
        })
    }

    /// Returns `true` if a thread or task is currently inside the monitor.
    #[must_use]
    pub fn is_entered(&self) -> bool {
        self.mutex.is_locked()
    }

    /// Returns a mutable reference to the protected value.
    ///
    /// Since this borrows the `Monitor` mutably, nothing else can be inside
    /// it.
    pub fn get_mut(&mut self) -> &mut T {
        self.mutex.get_mut()
    }

    /// Consumes the `Monitor`, returning the protected value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.mutex.into_inner()
    }
}

impl<T: Default> Default for Monitor<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Monitor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("mutex", &self.mutex)
            .field("condvar", &self.condvar)
            .finish()
    }
}

// === impl MonitorGuard ===

impl<'a, T> MonitorGuard<'a, T> {
    /// Exits the monitor, parks the current thread until the monitor is
    /// notified, and enters the monitor again.
    ///
    /// A wakeup does not guarantee that whatever condition the caller is
    /// waiting for holds; check it again in a loop, or use
    /// [`wait_while_blocking`](Self::wait_while_blocking).
    #[cfg_attr(test, track_caller)]
    pub fn wait_blocking(self) -> Self {
        let Self { guard, condvar } = self;
        let guard = condvar.wait_guard_blocking(guard);
        Self { guard, condvar }
    }

    /// Exits the monitor, suspends the current task until the monitor is
    /// notified, and enters the monitor again.
    ///
    /// A wakeup does not guarantee that whatever condition the caller is
    /// waiting for holds; check it again in a loop, or use
    /// [`wait_while`](Self::wait_while).
    pub async fn wait(self) -> Self {
        let Self { guard, condvar } = self;
        let guard = condvar.wait_guard(guard).await;
        Self { guard, condvar }
    }

    /// Parks the current thread, waiting on the monitor for as long as
    /// `condition` returns `true`.
    ///
    /// `condition` is called with the monitor entered.
    pub fn wait_while_blocking(mut self, mut condition: impl FnMut(&mut T) -> bool) -> Self {
        while condition(&mut *self) {
            self = self.wait_blocking();
        }
        self
    }

    /// Suspends the current task, waiting on the monitor for as long as
    /// `condition` returns `true`.
    ///
    /// `condition` is called with the monitor entered.
    pub async fn wait_while(mut self, mut condition: impl FnMut(&mut T) -> bool) -> Self {
        while condition(&mut *self) {
            self = self.wait().await;
        }
        self
    }

    /// Wakes one thread or task waiting on the monitor.
    ///
    /// The woken waiter will not return from its wait until this guard has
    /// exited the monitor.
    pub fn notify(&self) {
        self.condvar.notify();
    }

    /// Wakes every thread and task waiting on the monitor.
    ///
    /// Returns the number of waiters woken.
    pub fn notify_all(&self) -> usize {
        self.condvar.notify_all()
    }

    /// Exits the monitor.
    ///
    /// This is equivalent to dropping the guard.
    pub fn exit(self) {
        drop(self);
    }
}

impl<T> Deref for MonitorGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T> DerefMut for MonitorGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl<T: fmt::Debug> fmt::Debug for MonitorGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.guard.fmt(f)
    }
}
