#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(docsrs, doc(cfg_hide(docsrs, loom)))]
#![warn(missing_docs, missing_debug_implementations)]

pub(crate) mod loom;

#[macro_use]
pub(crate) mod util;

pub mod barrier;
pub mod blocking;
pub mod condvar;
pub mod monitor;
pub mod queue;
pub mod rwlock;
pub mod semaphore;
pub mod spin;

#[doc(inline)]
pub use self::barrier::Barrier;
#[doc(inline)]
pub use self::condvar::Condvar;
#[doc(inline)]
pub use self::monitor::{Monitor, MonitorGuard};
#[doc(inline)]
pub use self::queue::BlockingQueue;
#[doc(inline)]
pub use self::rwlock::{RwLock, RwLockReadGuard, RwLockWriteGuard};
#[doc(inline)]
pub use self::semaphore::Semaphore;
#[doc(inline)]
pub use self::spin::{SpinSemaphore, Spinlock};

/// An error indicating that a [`BlockingQueue`] is empty and its producers
/// have signaled that no more items are coming.
///
/// This error is returned by the waiting dequeue and peek methods on
/// [`BlockingQueue`], such as [`BlockingQueue::dequeue_when_available`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("closed")]
pub struct Closed(());

/// The result of waiting on a [`BlockingQueue`].
pub type WaitResult<T> = Result<T, Closed>;

/// Errors returned when releasing permits to a [`Semaphore`] or a
/// [`SpinSemaphore`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ReleaseError {
    /// Zero permits were released.
    ///
    /// Releasing a semaphore must always add at least one permit.
    #[error("cannot release zero permits")]
    Zero,

    /// Releasing the requested number of permits would exceed the
    /// semaphore's maximum permit count.
    #[error("releasing {requested} permits would exceed the maximum of {max}")]
    Overflow {
        /// The number of permits that were being released.
        requested: usize,
        /// The maximum number of permits the semaphore may hold.
        max: usize,
    },
}

impl Closed {
    pub(crate) const fn new() -> Self {
        Self(())
    }
}
