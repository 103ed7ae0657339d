#[allow(unused_imports)]
pub(crate) use self::inner::*;

#[cfg(loom)]
mod inner {
    #![allow(dead_code)]
    #![allow(unused_imports)]

    #[cfg(test)]
    pub(crate) use loom::future;
    pub(crate) use loom::{cell, hint, model, thread};

    pub(crate) mod sync {
        pub(crate) use loom::sync::*;
    }
}

#[cfg(not(loom))]
mod inner {
    #![allow(dead_code, unused_imports)]
    pub(crate) mod sync {
        pub use std::sync::*;
    }

    pub(crate) use core::hint;

    pub(crate) mod thread {
        pub(crate) use std::thread::{current, park, yield_now, JoinHandle, Thread};

        /// Spawns a thread that inherits the current `tracing` dispatcher and
        /// span, so that test output from child threads is attributed to the
        /// test that spawned them.
        #[cfg(test)]
        pub(crate) fn spawn<F, T>(f: F) -> JoinHandle<T>
        where
            F: FnOnce() -> T + Send + 'static,
            T: Send + 'static,
        {
            use super::sync::atomic::{AtomicUsize, Ordering::Relaxed};
            thread_local! {
                static CHILDREN: AtomicUsize = const { AtomicUsize::new(1) };
            }

            let subscriber = tracing::Dispatch::default();
            let span = tracing::Span::current();
            let num = CHILDREN.with(|children| children.fetch_add(1, Relaxed));
            std::thread::spawn(move || {
                let _tracing = tracing::dispatcher::set_default(&subscriber);
                let _span = tracing::info_span!(parent: span, "thread", message = num).entered();

                tracing::info!(num, "spawned child thread");
                let res = f();
                tracing::info!(num, "child thread completed");

                res
            })
        }
    }

    #[cfg(test)]
    pub(crate) fn model(f: impl FnOnce()) {
        let _trace = crate::util::test::trace_init();
        let _span = tracing::info_span!(
            "test",
            message = std::thread::current().name().unwrap_or("<unnamed>")
        )
        .entered();

        tracing::info!("started test...");
        f();
        tracing::info!("test completed successfully!");
    }

    pub(crate) mod cell {
        #[derive(Debug)]
        pub(crate) struct UnsafeCell<T: ?Sized>(core::cell::UnsafeCell<T>);

        impl<T> UnsafeCell<T> {
            pub const fn new(data: T) -> UnsafeCell<T> {
                UnsafeCell(core::cell::UnsafeCell::new(data))
            }
        }

        impl<T: ?Sized> UnsafeCell<T> {
            #[inline(always)]
            pub fn with<F, R>(&self, f: F) -> R
            where
                F: FnOnce(*const T) -> R,
            {
                f(self.0.get())
            }

            #[inline(always)]
            pub fn with_mut<F, R>(&self, f: F) -> R
            where
                F: FnOnce(*mut T) -> R,
            {
                f(self.0.get())
            }
        }

        impl<T> UnsafeCell<T> {
            #[inline(always)]
            #[must_use]
            pub(crate) fn into_inner(self) -> T {
                self.0.into_inner()
            }
        }
    }

    #[cfg(test)]
    pub(crate) mod future {
        pub(crate) use tokio_test::block_on;
    }
}
