pub mod app;
pub mod background;
pub mod bootstrap;
pub mod config;
pub mod device;
pub mod events;
pub mod feed;
pub mod pending;
pub mod push;
pub mod shutdown;

#[cfg(test)]
mod test_support;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use bootstrap::{build_state, init_foundation, spawn_background_tasks};

/// Lock a state mutex, recovering the data if a previous holder panicked.
///
/// Guarded state is only mutated in short synchronous sections, so a
/// poisoned lock still holds consistent data.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
