use std::sync::{LockResult, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

/// Shared read access to a store's entries, surviving a poisoned lock.
pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    store: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), store, op, "read")
}

/// Exclusive access to a store's entries, surviving a poisoned lock.
pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    store: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), store, op, "write")
}

fn recover<G>(
    result: LockResult<G>,
    store: &'static str,
    op: &'static str,
    access: &'static str,
) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            target = "marginalia::cache",
            store,
            op,
            access,
            result = "poisoned_recovered",
            "storage lock poisoned; continuing with current entries"
        );
        poisoned.into_inner()
    })
}
