//! Type aliases for shared state.
//!
//! Stores attached to the event bus (history, alert log) are written from
//! handler threads and read by consumers, so they are handed out behind
//! `parking_lot` locks.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aqualink_core::types::*;
//!
//! let received: ThreadSafeVec<String> = thread_safe_vec();
//! received.lock().push("connected".to_string());
//! ```

use parking_lot::Mutex;
use std::sync::Arc;

/// A thread-safe, mutex-protected wrapper for cross-thread sharing.
///
/// Uses `parking_lot::Mutex` for better performance than `std::sync::Mutex`.
pub type ThreadSafe<T> = Arc<Mutex<T>>;

/// A thread-safe vector for cross-thread collection management.
pub type ThreadSafeVec<T> = Arc<Mutex<Vec<T>>>;

/// Create a new `ThreadSafe<T>` from a value.
#[inline]
pub fn thread_safe<T>(value: T) -> ThreadSafe<T> {
    Arc::new(Mutex::new(value))
}

/// Create a new empty `ThreadSafeVec<T>`.
#[inline]
pub fn thread_safe_vec<T>() -> ThreadSafeVec<T> {
    Arc::new(Mutex::new(Vec::new()))
}
