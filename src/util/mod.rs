/// Thread pinning for the owner thread.
pub mod affinity;
/// Coroutine re-exports for non-blocking waits.
pub mod fiber;
/// Process-unique thread identity.
pub mod thread_id;
/// Wait budget utilities for spin-wait loops.
pub mod wait;

pub use affinity::{PinConfig, pin_current_thread};
pub use thread_id::current_thread_id;
pub use wait::WaitBudget;
