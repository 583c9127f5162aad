//! Global lock dispatch for codec calls.
//!
//! A codec step either runs while holding one process-wide lock, which
//! serialises it with every other locked step, or runs directly.

use std::sync::{Mutex, PoisonError};

static GLOBAL_LOCK: Mutex<()> = Mutex::new(());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    /// Hold the global lock for the duration of the call.
    Global,
    /// Call without taking the global lock.
    #[default]
    Detached,
}

impl LockMode {
    pub fn from_flag(use_global_lock: bool) -> Self {
        if use_global_lock {
            LockMode::Global
        } else {
            LockMode::Detached
        }
    }

    pub(crate) fn run<T, F>(self, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        match self {
            LockMode::Global => {
                // a panicking holder can't leave `()` inconsistent
                let _guard = GLOBAL_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
                f()
            }
            LockMode::Detached => f(),
        }
    }
}
