use std::sync::{Mutex, MutexGuard};

/// Acquire mutex guard, ignoring poisoning
///
/// Critical sections in this crate never run user code, so a poisoned lock
/// still guards consistent data.
pub(crate) fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
