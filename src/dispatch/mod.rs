//! Affinity dispatcher: runs callables on the owner thread, blocking or not.

mod completion;
mod dispatcher;
/// Process-wide owner installation and free-function dispatch.
pub mod global;
mod op;
mod runtime;

pub use completion::Pending;
pub use dispatcher::{DispatchStats, Dispatcher, OwnerLoop, Pump};
pub use global::{global, is_owner_thread, run_on_owner_async, run_on_owner_sync, run_on_owner_sync_arg};
pub use runtime::Runtime;
