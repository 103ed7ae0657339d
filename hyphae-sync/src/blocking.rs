//! Synchronous mutual exclusion.
//!
//! This module provides a [`Mutex`] that protects a value with a raw lock
//! type, and the [`RawMutex`] trait abstracting over those raw locks. By
//! default, a [`Mutex`] is backed by a [`Spinlock`], so acquiring it spins
//! rather than parking the thread or yielding to a scheduler.
//!
//! The waiting primitives in this crate ([`Condvar`], [`Monitor`],
//! [`BlockingQueue`]) keep their bookkeeping in a [`Mutex`], and know how to
//! release and reacquire its raw lock around a wait.
//!
//! # Overriding the raw lock
//!
//! Any type implementing [`RawMutex`] may be used as the lock of a [`Mutex`]
//! through [`Mutex::with_raw_mutex`], and as the external lock of a
//! [`Condvar`].
//!
//! [`Spinlock`]: crate::Spinlock
//! [`Condvar`]: crate::Condvar
//! [`Monitor`]: crate::Monitor
//! [`BlockingQueue`]: crate::BlockingQueue
mod mutex;

pub use self::mutex::*;

/// Trait abstracting over raw mutual exclusion locks.
///
/// A raw mutex is a lock that guards no data of its own. It is used as the
/// lock inside a [`Mutex`], and as the caller-supplied lock that a
/// [`Condvar`](crate::Condvar) releases while waiting and reacquires before
/// returning.
///
/// Unlocking is a safe operation: implementations must treat unlocking a raw
/// mutex that is not locked as a no-op, and do not track which thread or task
/// holds the lock. Data protected by a raw mutex is only ever reachable through
/// a [`Mutex`], which never exposes its raw mutex to callers.
///
/// # Safety
///
/// Implementations of this trait must ensure that the mutex is actually
/// exclusive: a lock can't be acquired while the mutex is already locked.
pub unsafe trait RawMutex {
    /// Acquires this mutex, blocking the current thread/CPU core until it is
    /// able to do so.
    fn lock(&self);

    /// Attempts to acquire this mutex without blocking. Returns `true`
    /// if the lock was successfully acquired and `false` otherwise.
    fn try_lock(&self) -> bool;

    /// Unlocks this mutex.
    ///
    /// If the mutex is not locked, this does nothing.
    fn unlock(&self);

    /// Returns `true` if the mutex is currently locked.
    fn is_locked(&self) -> bool;
}
