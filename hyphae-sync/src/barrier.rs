//! A gate that threads and tasks can wait on until it is opened.
//!
//! See the documentation for the [`Barrier`] type for details.
use crate::Monitor;


/// A gate which is either open or closed.
///
/// Passing an open `Barrier` returns immediately. Passing a closed `Barrier`
/// waits until another thread or task [opens](Self::open) it, by parking the
/// current thread ([`pass_blocking`](Self::pass_blocking)) or suspending the
/// current task ([`pass`](Self::pass)).
///
/// A `Barrier` may be opened and closed any number of times. Opening an open
/// barrier, or closing a closed one, does nothing.
///
/// Unlike [`std::sync::Barrier`], this type does not count arrivals: it is a
/// gate controlled explicitly by [`open`](Self::open) and
/// [`close`](Self::close).
///
/// # Examples
///
/// ```
/// use hyphae_sync::Barrier;
/// use std::{sync::Arc, thread};
///
/// let barrier = Arc::new(Barrier::new(false));
///
/// let waiter = thread::spawn({
///     let barrier = barrier.clone();
///     move || {
///         // parks until the barrier is opened.
///         barrier.pass_blocking();
///     }
/// });
///
/// barrier.open();
/// waiter.join().unwrap();
/// ```
#[derive(Debug)]
pub struct Barrier {
    monitor: Monitor<bool>,
}

impl Barrier {
    loom_const_fn! {
        /// Returns a new `Barrier`, which is open if `open` is `true`, and
        /// closed otherwise.
        #[must_use]
        pub fn new(open: bool) -> Self {
            Self {
                monitor: Monitor::new(open),
            }
        }
    }

    /// Passes the barrier, parking the current thread until the barrier is
    /// open.
    pub fn pass_blocking(&self) {
        self.monitor
            .enter()
            .wait_while_blocking(|open| !*open)
            .exit();
    }

    /// Passes the barrier, suspending the current task until the barrier is
    /// open.
    pub async fn pass(&self) {
        self.monitor
            .enter()
            .wait_while(|open| !*open)
            .await
            .exit();
    }

    /// Opens the barrier, waking every thread and task waiting to pass it.
    ///
    /// If the barrier is already open, this does nothing.
    pub fn open(&self) {
        let mut open = self.monitor.enter();
        if *open {
            return;
        }

        *open = true;
        let _woken = open.notify_all();
        trace!(woken = _woken, "Barrier::open");
    }

    /// Closes the barrier. Threads and tasks passing it from now on will wait
    /// until it is opened again.
    pub fn close(&self) {
        *self.monitor.enter() = false;
        trace!("Barrier::close");
    }

    /// Returns `true` if the barrier is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.monitor.enter()
    }
}

impl Default for Barrier {
    /// Returns a new, open `Barrier`.
    fn default() -> Self {
        Self::new(true)
    }
}
