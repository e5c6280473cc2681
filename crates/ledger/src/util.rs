//! Internal helpers for input normalization and shared state.
//!
//! These utilities are **not** part of the public API.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a std mutex, recovering the guard if a previous holder panicked.
///
/// The data behind these mutexes (observer slots, revision maps) stays valid
/// even if an observer panicked while holding the lock.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Trim a required text field; `None` when blank.
pub(crate) fn normalize_required_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}
