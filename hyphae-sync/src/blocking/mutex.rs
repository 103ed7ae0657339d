use super::RawMutex;
use crate::{loom::cell::UnsafeCell, spin::Spinlock};
use core::{
    fmt,
    ops::{Deref, DerefMut},
};

/// A value of type `T` that is only reachable while a raw lock is held.
///
/// [`lock`] and [`try_lock`] return a [`MutexGuard`] that derefs to the value
/// and releases the raw lock when dropped.
///
/// `Lock` is the [`RawMutex`] doing the actual locking, a [`Spinlock`] unless
/// another one is passed to [`with_raw_mutex`]. With the default lock, a
/// contended [`lock`] burns CPU until the holder lets go, so keep guards short
/// and do not hold one across an `.await`. Waiters are not served in order.
///
/// Under `cfg(loom)`, the value lives in a loom-checked cell.
///
/// # Examples
///
/// ```
/// use hyphae_sync::blocking::Mutex;
///
/// let mutex = Mutex::new(Vec::new());
///
/// mutex.lock().push(1);
/// mutex.with_lock(|v| v.push(2));
///
/// assert_eq!(mutex.into_inner(), vec![1, 2]);
/// ```
///
/// [`lock`]: Mutex::lock
/// [`try_lock`]: Mutex::try_lock
/// [`with_raw_mutex`]: Mutex::with_raw_mutex
pub struct Mutex<T, Lock = Spinlock> {
    lock: Lock,
    data: UnsafeCell<T>,
}

/// Access to the value in a locked [`Mutex`].
///
/// Returned by [`lock`] and [`try_lock`]. Dropping it unlocks the mutex.
///
/// [`lock`]: Mutex::lock
/// [`try_lock`]: Mutex::try_lock
#[must_use = "dropping the guard unlocks the `Mutex` right away"]
pub struct MutexGuard<'a, T, Lock: RawMutex = Spinlock> {
    mutex: &'a Mutex<T, Lock>,
}

// === impl Mutex ===

impl<T> Mutex<T> {
    loom_const_fn! {
        /// Returns an unlocked `Mutex` holding `data`, guarded by a
        /// [`Spinlock`].
        #[must_use]
        pub fn new(data: T) -> Self {
            Self {
                lock: Spinlock::new(),
                data: UnsafeCell::new(data),
            }
        }
    }
}

impl<T, Lock> Mutex<T, Lock> {
    loom_const_fn! {
        /// Returns a `Mutex` holding `data`, guarded by `lock`.
        ///
        /// `lock` should be unlocked.
        #[must_use]
        pub fn with_raw_mutex(data: T, lock: Lock) -> Self {
            Self {
                lock,
                data: UnsafeCell::new(data),
            }
        }
    }

    /// Unwraps the mutex, returning the value.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// Borrows the value mutably without locking, since `&mut self` rules out
    /// any outstanding guards.
    pub fn get_mut(&mut self) -> &mut T {
        unsafe {
            // Safety: the mutable borrow guarantees that no guards exist.
            self.data.with_mut(|data| &mut *data)
        }
    }
}

impl<T, Lock: RawMutex> Mutex<T, Lock> {
    fn guard(&self) -> MutexGuard<'_, T, Lock> {
        MutexGuard { mutex: self }
    }

    /// Locks the mutex if it is free, or returns [`None`].
    #[must_use]
    #[cfg_attr(test, track_caller)]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T, Lock>> {
        if self.lock.try_lock() {
            Some(self.guard())
        } else {
            None
        }
    }

    /// Locks the mutex, waiting for the raw lock as long as it takes.
    #[cfg_attr(test, track_caller)]
    pub fn lock(&self) -> MutexGuard<'_, T, Lock> {
        self.lock.lock();
        self.guard()
    }

    /// Runs `f` on the value with the mutex locked.
    #[cfg_attr(test, track_caller)]
    pub fn with_lock<U>(&self, f: impl FnOnce(&mut T) -> U) -> U {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Returns `true` if the mutex is currently locked.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }
}

impl<T: Default, Lock: Default> Default for Mutex<T, Lock> {
    fn default() -> Self {
        Self {
            lock: Default::default(),
            data: UnsafeCell::new(Default::default()),
        }
    }
}

impl<T, Lock> fmt::Debug for Mutex<T, Lock>
where
    T: fmt::Debug,
    Lock: fmt::Debug + RawMutex,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Mutex");
        match self.try_lock() {
            Some(guard) => s.field("data", &&*guard),
            None => s.field("data", &format_args!("<locked>")),
        };
        s.field("lock", &self.lock).finish()
    }
}

unsafe impl<T: Send, Lock: Send> Send for Mutex<T, Lock> {}
unsafe impl<T: Send, Lock: Sync> Sync for Mutex<T, Lock> {}

// === impl MutexGuard ===

impl<'a, T, Lock: RawMutex> MutexGuard<'a, T, Lock> {
    /// Unlocks the mutex, returning a reference to it so that it can be locked
    /// again later.
    pub(crate) fn unlocked(this: Self) -> &'a Mutex<T, Lock> {
        let mutex = this.mutex;
        drop(this);
        mutex
    }
}

impl<T, Lock: RawMutex> Deref for MutexGuard<'_, T, Lock> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &Self::Target {
        self.mutex.data.with(|data| unsafe {
            // Safety: the guard holds the lock.
            &*data
        })
    }
}

impl<T, Lock: RawMutex> DerefMut for MutexGuard<'_, T, Lock> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.mutex.data.with_mut(|data| unsafe {
            // Safety: the guard holds the lock and is borrowed uniquely.
            &mut *data
        })
    }
}

impl<T, Lock> Drop for MutexGuard<'_, T, Lock>
where
    Lock: RawMutex,
{
    #[inline]
    #[cfg_attr(test, track_caller)]
    fn drop(&mut self) {
        self.mutex.lock.unlock()
    }
}

impl<T, Lock> fmt::Debug for MutexGuard<'_, T, Lock>
where
    T: fmt::Debug,
    Lock: RawMutex,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.deref().fmt(f)
    }
}

// A guard may be moved to and dropped on another thread: none of the raw
// mutexes in this crate track which thread holds them.
unsafe impl<T, Lock> Send for MutexGuard<'_, T, Lock>
where
    T: Send,
    Lock: RawMutex + Sync,
{
}
unsafe impl<T, Lock> Sync for MutexGuard<'_, T, Lock>
where
    T: Send + Sync,
    Lock: RawMutex + Sync,
{
}
