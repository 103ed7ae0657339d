use super::*;
use crate::{
    spin::Spinlock,
    util::test::{assert_future, assert_send_sync},
};

#[test]
fn condvar_is_send_and_sync() {
    assert_send_sync::<Condvar>();
}

#[test]
fn wait_is_future() {
    assert_future::<Wait<'_, Spinlock>>();
}

#[cfg(not(loom))]
mod tasks;


mod loom;
