#![forbid(unsafe_op_in_unsafe_fn)]
#![deny(missing_docs)]

//! Owner-thread affinity: a dispatcher that runs callables on one designated
//! owner thread (blocking or fire-and-forget, in place when already there),
//! and a context manager that creates rendering contexts on that owner and
//! moves "current" affinity onto worker threads behind a one-time proxy.

/// Owner loop configuration.
pub mod config;
/// Rendering-context affinity.
pub mod context;
/// Owner-thread dispatch.
pub mod dispatch;
/// Error type and native result codes.
pub mod error;
/// Owner-confined state.
pub mod owner_cell;
/// Threading utilities.
pub mod util;

pub use config::DispatchConfig;
pub use error::{Error, Result};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::config::DispatchConfig;
    pub use crate::context::{Affinity, ContextAttributes, ContextHandle, ContextManager};
    pub use crate::dispatch::{Dispatcher, OwnerLoop, Pending, Pump, Runtime};
    pub use crate::error::{Error, Result};
    pub use crate::owner_cell::OwnerCell;
}
