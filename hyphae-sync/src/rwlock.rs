//! A fair readers-writer lock that threads and tasks can share.
use crate::{
    loom::{
        cell::UnsafeCell,
        sync::atomic::{AtomicUsize, Ordering::*},
    },
    Semaphore,
};
use core::{
    fmt,
    ops::{Deref, DerefMut},
};


/// A readers-writer lock protecting a value of type `T`.
///
/// Any number of readers may look at the value at once, but a writer gets the
/// value to itself. A read guard derefs to `&T`; a write guard also derefs to
/// `&mut T`. Sharing the lock between threads requires `T: Send`, and, since
/// readers on different threads see the same value, `T: Sync` as well.
///
/// Both kinds of access can be taken in three ways:
///
/// - [`read`] and [`write`] suspend the current task until the lock has been
///   acquired.
/// - [`read_blocking`] and [`write_blocking`] park the current thread until
///   the lock has been acquired.
/// - [`try_read`] and [`try_write`] never wait, returning [`None`] if the lock
///   cannot be acquired immediately.
///
/// # Priority Policy
///
/// Neither readers nor writers can starve each other. The lock is made of
/// three single-permit [`Semaphore`]s:
///
/// - `resource` is held by the active writer, or collectively by the active
///   readers (taken by the first reader and returned by the last),
/// - `reservation` is a checkpoint that every reader and writer passes
///   through; a writer holds it until it has acquired `resource`,
/// - `reader_count_guard` serializes readers joining the active readers.
///
/// A writer that arrives while readers hold the lock reserves it, and waits
/// only for the readers that are already inside. Readers arriving after it
/// wait at the checkpoint until the writer has acquired the lock; readers
/// arriving while a writer holds the lock wait at the checkpoint or for
/// `resource`, together with any writers, in the order in which the
/// semaphores hand out their permits. Ties between readers and writers are
/// therefore not strictly first-come, first-served.
///
/// Cancelling a call to [`read`] or [`write`] releases every permit the call
/// had acquired so far, and the task loses its place in line.
///
/// # Examples
///
/// ```
/// use hyphae_sync::RwLock;
/// use std::{collections::HashMap, sync::Arc, thread};
///
/// # async fn example() {
/// let routes = Arc::new(RwLock::new(HashMap::new()));
///
/// // a thread updates the table...
/// thread::spawn({
///     let routes = routes.clone();
///     move || {
///         routes.write_blocking().insert("/", 80);
///     }
/// })
/// .join()
/// .unwrap();
///
/// // ...while tasks look things up in it.
/// let first = routes.read().await;
/// let second = routes.read().await;
/// assert_eq!(first.get("/"), Some(&80));
/// assert_eq!(second.len(), 1);
/// # }
/// # tokio_test::block_on(example());
/// ```
///
/// [`read`]: Self::read
/// [`write`]: Self::write
/// [`read_blocking`]: Self::read_blocking
/// [`write_blocking`]: Self::write_blocking
/// [`try_read`]: Self::try_read
/// [`try_write`]: Self::try_write
pub struct RwLock<T> {
    /// Checkpoint passed by every reader, and held by a writer until it has
    /// acquired `resource`.
    reservation: Semaphore,

    /// Held by a reader while it joins the active readers.
    reader_count_guard: Semaphore,

    /// Held by the writer, or by the active readers as a group.
    resource: Semaphore,

    /// The number of active readers.
    ///
    /// Only incremented while holding `reader_count_guard`. Decremented
    /// without it when a reader leaves, so that dropping a read guard never
    /// waits.
    readers: AtomicUsize,

    /// The data protected by the lock.
    data: UnsafeCell<T>,
}

/// Shared access to the value in a [`RwLock`].
///
/// The last read guard to be dropped unlocks the lock. Returned by [`read`],
/// [`read_blocking`] and [`try_read`].
///
/// [`read`]: RwLock::read
/// [`read_blocking`]: RwLock::read_blocking
/// [`try_read`]: RwLock::try_read
#[must_use = "dropping the guard unlocks the `RwLock` right away"]
pub struct RwLockReadGuard<'lock, T> {
    lock: &'lock RwLock<T>,
}

/// Exclusive access to the value in a [`RwLock`], released on drop.
///
/// Returned by [`write`], [`write_blocking`] and [`try_write`].
///
/// [`write`]: RwLock::write
/// [`write_blocking`]: RwLock::write_blocking
/// [`try_write`]: RwLock::try_write
#[must_use = "dropping the guard unlocks the `RwLock` right away"]
pub struct RwLockWriteGuard<'lock, T> {
    lock: &'lock RwLock<T>,
}

// === impl RwLock ===

impl<T> RwLock<T> {
    loom_const_fn! {
        /// Returns an unlocked `RwLock` holding `data`.
        ///
        /// This is a `const fn`, so a lock can live in a `static`:
        ///
        /// ```
        /// use hyphae_sync::RwLock;
        ///
        /// static CONFIG: RwLock<Option<&str>> = RwLock::new(None);
        ///
        /// *CONFIG.write_blocking() = Some("verbose");
        /// assert_eq!(*CONFIG.read_blocking(), Some("verbose"));
        /// ```
        #[must_use]
        pub fn new(data: T) -> Self {
            Self {
                reservation: Semaphore::new(1),
                reader_count_guard: Semaphore::new(1),
                resource: Semaphore::new(1),
                readers: AtomicUsize::new(0),
                data: UnsafeCell::new(data),
            }
        }
    }

    /// Waits for shared access to the value, suspending the current task.
    ///
    /// The task waits while a writer holds the lock or has reserved it. Other
    /// readers already inside do not hold it up.
    ///
    /// Because of the [priority policy], a task that already holds a read
    /// guard and asks for a second one can deadlock if a writer reserved the
    /// lock in between.
    ///
    /// [priority policy]: Self#priority-policy
    pub async fn read(&self) -> RwLockReadGuard<'_, T> {
        // Pass the checkpoint.
        drop(self.reservation.acquire().await);

        let _count_guard = self.reader_count_guard.acquire().await;
        if !self.join_readers() {
            self.resource.acquire().await.forget();
            self.lead_readers();
        }

        RwLockReadGuard { lock: self }
    }

    /// Like [`read`](Self::read), but parks the current thread instead.
    #[cfg_attr(test, track_caller)]
    pub fn read_blocking(&self) -> RwLockReadGuard<'_, T> {
        drop(self.reservation.acquire_blocking());

        let _count_guard = self.reader_count_guard.acquire_blocking();
        if !self.join_readers() {
            self.resource.acquire_blocking().forget();
            self.lead_readers();
        }

        RwLockReadGuard { lock: self }
    }

    /// Waits for exclusive access to the value, suspending the current task.
    ///
    /// While it waits for the current readers (or writer) to leave, the task
    /// keeps the lock reserved, so readers that arrive after it queue up
    /// behind it.
    pub async fn write(&self) -> RwLockWriteGuard<'_, T> {
        let reservation = self.reservation.acquire().await;
        self.resource.acquire().await.forget();
        drop(reservation);

        RwLockWriteGuard { lock: self }
    }

    /// Like [`write`](Self::write), but parks the current thread instead.
    #[cfg_attr(test, track_caller)]
    pub fn write_blocking(&self) -> RwLockWriteGuard<'_, T> {
        let reservation = self.reservation.acquire_blocking();
        self.resource.acquire_blocking().forget();
        drop(reservation);

        RwLockWriteGuard { lock: self }
    }

    /// Takes shared access if that is possible without waiting.
    ///
    /// ```
    /// use hyphae_sync::RwLock;
    ///
    /// let lock = RwLock::new("hello");
    /// let writer = lock.write_blocking();
    /// assert!(lock.try_read().is_none());
    ///
    /// drop(writer);
    /// assert_eq!(lock.try_read().as_deref(), Some(&"hello"));
    /// ```
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, T>> {
        drop(self.reservation.try_acquire()?);

        let _count_guard = self.reader_count_guard.try_acquire()?;
        if !self.join_readers() {
            self.resource.try_acquire()?.forget();
            self.lead_readers();
        }

        Some(RwLockReadGuard { lock: self })
    }

    /// Takes exclusive access if that is possible without waiting.
    ///
    /// Returns [`None`] if any reader or writer holds or has reserved the lock.
    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, T>> {
        let _reservation = self.reservation.try_acquire()?;
        self.resource.try_acquire()?.forget();

        Some(RwLockWriteGuard { lock: self })
    }

    /// Returns the number of readers currently holding the lock.
    #[must_use]
    pub fn reader_count(&self) -> usize {
        self.readers.load(Acquire)
    }

    /// Borrows the value mutably without locking, since `&mut self` rules out
    /// any outstanding guards.
    pub fn get_mut(&mut self) -> &mut T {
        unsafe {
            // Safety: the mutable borrow guarantees that no guards exist.
            self.data.with_mut(|data| &mut *data)
        }
    }

    /// Unwraps the lock, returning the value.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// Joins the active readers, if there are any.
    ///
    /// Returns `false` if there are no active readers, in which case the
    /// caller must acquire `resource` on behalf of the readers, and then call
    /// [`lead_readers`](Self::lead_readers).
    ///
    /// Must be called while holding `reader_count_guard`.
    fn join_readers(&self) -> bool {
        let mut readers = self.readers.load(Acquire);
        loop {
            if test_dbg!(readers) == 0 {
                // Nobody else increments the count while we hold the guard,
                // so it stays at zero until `lead_readers`.
                return false;
            }

            match self
                .readers
                .compare_exchange_weak(readers, readers + 1, AcqRel, Acquire)
            {
                Ok(_) => return true,
                // The last reader may have left concurrently.
                Err(actual) => readers = actual,
            }
        }
    }

    /// Becomes the first active reader, after acquiring `resource`.
    ///
    /// Must be called while holding `reader_count_guard`.
    fn lead_readers(&self) {
        test_debug!("RwLock: first reader acquired the lock");
        self.readers.store(1, Release);
    }
}

impl<T: Default> Default for RwLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for RwLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("RwLock");
        match self.try_read() {
            Some(guard) => s.field("data", &&*guard),
            None => s.field("data", &format_args!("<locked>")),
        };
        s.field("readers", &self.reader_count()).finish()
    }
}

unsafe impl<T: Send> Send for RwLock<T> {}
unsafe impl<T: Send + Sync> Sync for RwLock<T> {}

// === impl RwLockReadGuard ===

impl<T> Deref for RwLockReadGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.lock.data.with(|data| unsafe {
            // Safety: we are holding a read lock, so it is okay to dereference
            // the pointer immutably.
            &*data
        })
    }
}

impl<T: fmt::Debug> fmt::Debug for RwLockReadGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.deref().fmt(f)
    }
}

impl<T> Drop for RwLockReadGuard<'_, T> {
    fn drop(&mut self) {
        let readers = self.lock.readers.fetch_sub(1, AcqRel);
        if test_dbg!(readers) == 1 {
            test_debug!("RwLock: last reader released the lock");
            self.lock.resource.add_permits(1);
        }
    }
}

// === impl RwLockWriteGuard ===

impl<T> Deref for RwLockWriteGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.lock.data.with(|data| unsafe {
            // Safety: we are holding the write lock, so it is okay to
            // dereference the pointer.
            &*data
        })
    }
}

impl<T> DerefMut for RwLockWriteGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.lock.data.with_mut(|data| unsafe {
            // Safety: we are holding the write lock, so it is okay to
            // dereference the pointer mutably.
            &mut *data
        })
    }
}

impl<T: fmt::Debug> fmt::Debug for RwLockWriteGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.deref().fmt(f)
    }
}

impl<T> Drop for RwLockWriteGuard<'_, T> {
    fn drop(&mut self) {
        test_debug!("RwLock: writer released the lock");
        self.lock.resource.add_permits(1);
    }
}
