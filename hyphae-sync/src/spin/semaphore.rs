use crate::{
    loom::{
        hint,
        sync::atomic::{AtomicUsize, Ordering::*},
    },
    ReleaseError,
};
use core::fmt;

/// A spinning [counting semaphore].
///
/// A `SpinSemaphore` holds a count of permits. [`acquire`] takes one permit,
/// spinning until one is available; [`release`] returns any positive number
/// of permits. The count is never observed negative: a decrement is only
/// committed if the count read immediately before it was greater than zero
/// and has not changed since.
///
/// Like [`Spinlock`](super::Spinlock), this semaphore never parks or yields
/// while waiting. If permits may be unavailable for longer than a few
/// instructions, use the parking [`Semaphore`](crate::Semaphore) instead.
///
/// # Examples
///
/// ```
/// use hyphae_sync::SpinSemaphore;
///
/// let sem = SpinSemaphore::new(1);
///
/// sem.acquire();
/// assert_eq!(sem.available_permits(), 0);
/// assert!(!sem.try_acquire());
///
/// sem.release(2).expect("two permits is a valid release");
/// assert_eq!(sem.available_permits(), 2);
///
/// // releasing zero permits is an error.
/// assert!(sem.release(0).is_err());
/// ```
///
/// [counting semaphore]: https://en.wikipedia.org/wiki/Semaphore_(programming)
/// [`acquire`]: SpinSemaphore::acquire
/// [`release`]: SpinSemaphore::release
pub struct SpinSemaphore {
    count: AtomicUsize,
}

impl SpinSemaphore {
    /// The maximum number of permits a `SpinSemaphore` may hold.
    pub const MAX_PERMITS: usize = usize::MAX;

    loom_const_fn! {
        /// Returns a new `SpinSemaphore` holding `permits` permits.
        #[must_use]
        pub fn new(permits: usize) -> Self {
            Self { count: AtomicUsize::new(permits) }
        }
    }

    /// Acquires a single permit, spinning until one is available.
    #[cfg_attr(test, track_caller)]
    pub fn acquire(&self) {
        loop {
            let current = self.count.load(Acquire);
            if current > 0
                && test_dbg!(self
                    .count
                    .compare_exchange(current, current - 1, AcqRel, Relaxed)
                    .is_ok())
            {
                return;
            }

            hint::spin_loop();
        }
    }

    /// Attempts to acquire a single permit without waiting for one to be
    /// released.
    ///
    /// Returns `true` if a permit was acquired, or `false` if the semaphore
    /// held no permits.
    #[cfg_attr(test, track_caller)]
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        test_dbg!(self
            .count
            .fetch_update(AcqRel, Acquire, |current| current.checked_sub(1))
            .is_ok())
    }

    /// Releases `permits` permits back to the semaphore.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if the permits were added.
    /// - `Err(`[`ReleaseError::Zero`]`)` if `permits` is zero.
    /// - `Err(`[`ReleaseError::Overflow`]`)` if adding `permits` would exceed
    ///   [`MAX_PERMITS`](Self::MAX_PERMITS). The count is left unchanged.
    pub fn release(&self, permits: usize) -> Result<(), ReleaseError> {
        if permits == 0 {
            return Err(ReleaseError::Zero);
        }

        self.count
            .fetch_update(AcqRel, Acquire, |current| current.checked_add(permits))
            .map(|_prev| {
                test_debug!(permits, prev = _prev, "SpinSemaphore::release");
            })
            .map_err(|_| ReleaseError::Overflow {
                requested: permits,
                max: Self::MAX_PERMITS,
            })
    }

    /// Returns the number of permits currently available.
    ///
    /// The returned value is a snapshot and may be stale immediately.
    #[inline]
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.count.load(Acquire)
    }
}

impl fmt::Debug for SpinSemaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinSemaphore")
            .field("permits", &self.available_permits())
            .finish()
    }
}
