//! Coroutine re-exports used for non-blocking completion.
//!
//! A worker running inside a `may` coroutine can wait on a `Pending` result
//! and yield to its scheduler instead of pinning the OS thread. Outside a
//! coroutine the same receivers fall back to blocking the thread.

pub use may::coroutine::yield_now;
pub use may::sync::mpsc::{Receiver, Sender, channel};

/// True when the caller is running inside a `may` coroutine.
#[inline]
pub fn in_coroutine() -> bool {
    may::coroutine::is_coroutine()
}
