//! Synchronous spinning-based synchronization primitives.
//!
//! Most of the synchronization primitives in `hyphae-sync` can wait in two
//! ways: by parking the current thread, or by *yielding* to an asynchronous
//! task scheduler. The primitives in this module do neither. While waiting,
//! they *spin*: they retry an atomic compare-and-exchange in a loop, issuing
//! only a CPU [spin loop hint] between attempts, and they never voluntarily
//! give up the processor.
//!
//! This makes them suitable only for critical sections that are a handful of
//! instructions long. If the thread holding a spinlock is preempted, every
//! thread waiting for it will burn its time slice spinning. The other
//! primitives in this crate use these spinlocks to guard their own short
//! bookkeeping sections, and never hold them while waiting.
//!
//! This module provides the following APIs:
//!
//! - [`Spinlock`]: a [mutual exclusion] spinlock, which implements the
//!   [`blocking::RawMutex`] trait.
//! - [`SpinSemaphore`]: a spinning [counting semaphore].
//!
//! [spin loop hint]: core::hint::spin_loop
//! [mutual exclusion]: https://en.wikipedia.org/wiki/Mutual_exclusion
//! [counting semaphore]: https://en.wikipedia.org/wiki/Semaphore_(programming)
mod semaphore;

pub use self::semaphore::SpinSemaphore;

use crate::{
    blocking,
    loom::{
        hint,
        sync::atomic::{AtomicBool, Ordering::*},
    },
};
use core::fmt;


/// A spinning mutual exclusion lock.
///
/// A `Spinlock` is a single flag. [`acquire`] spins until it observes the
/// lock unlocked and atomically marks it locked; exactly one thread observes
/// that transition per acquisition. [`release`] marks it unlocked again.
///
/// The lock does not track its owner: any thread may release a `Spinlock`,
/// whether or not it acquired it, and releasing a lock that is not held is a
/// no-op. It does not guard any data on its own; to protect data with a
/// `Spinlock`, use [`blocking::Mutex`], or pair it with a
/// [`Condvar`](crate::Condvar).
///
/// This lock is not fair, and is not reentrant.
///
/// # Examples
///
/// ```
/// use hyphae_sync::Spinlock;
///
/// let lock = Spinlock::new();
///
/// lock.acquire();
/// assert!(lock.is_locked());
/// assert!(!lock.try_acquire());
///
/// lock.release();
/// assert!(!lock.is_locked());
///
/// // releasing an unlocked spinlock does nothing.
/// lock.release();
/// assert!(!lock.is_locked());
/// ```
///
/// [`acquire`]: Spinlock::acquire
/// [`release`]: Spinlock::release
pub struct Spinlock {
    locked: AtomicBool,
}

// === impl Spinlock ===

impl Spinlock {
    loom_const_fn! {
        /// Returns a new `Spinlock`, in the unlocked state.
        #[must_use]
        pub fn new() -> Self {
            Self { locked: AtomicBool::new(false) }
        }
    }

    /// Acquires this spinlock, spinning until it is available.
    ///
    /// This never yields the processor or parks the thread.
    #[cfg_attr(test, track_caller)]
    pub fn acquire(&self) {
        while test_dbg!(self
            .locked
            .compare_exchange(false, true, Acquire, Relaxed)
            .is_err())
        {
            // Spin on a plain load while the lock is held, so that waiting
            // cores don't keep the cache line in an exclusive state.
            while self.is_locked() {
                hint::spin_loop();
            }
        }
    }

    /// Attempts to acquire this spinlock once, without spinning.
    ///
    /// Returns `true` if the lock was acquired.
    #[cfg_attr(test, track_caller)]
    #[inline]
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        test_dbg!(self
            .locked
            .compare_exchange(false, true, Acquire, Relaxed)
            .is_ok())
    }

    /// Releases this spinlock.
    ///
    /// If the lock is not currently held, this does nothing.
    #[cfg_attr(test, track_caller)]
    #[inline]
    pub fn release(&self) {
        let _released = test_dbg!(self
            .locked
            .compare_exchange(true, false, Release, Relaxed)
            .is_ok());
    }

    /// Returns `true` if the lock is currently held.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Relaxed)
    }
}

impl Default for Spinlock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Spinlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spinlock")
            .field("locked", &self.is_locked())
            .finish()
    }
}

unsafe impl blocking::RawMutex for Spinlock {
    #[cfg_attr(test, track_caller)]
    #[inline]
    fn lock(&self) {
        self.acquire()
    }

    #[cfg_attr(test, track_caller)]
    #[inline]
    fn try_lock(&self) -> bool {
        self.try_acquire()
    }

    #[cfg_attr(test, track_caller)]
    #[inline]
    fn unlock(&self) {
        self.release()
    }

    #[inline]
    fn is_locked(&self) -> bool {
        Spinlock::is_locked(self)
    }
}
