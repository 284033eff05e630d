//! Context affinity manager: owner-side creation of rendering contexts and
//! per-thread "current" affinity with transparent proxying for workers.

mod affinity;
mod display;
mod handle;
mod manager;

pub use display::{CanvasInfo, RenderContext};
pub use handle::{Affinity, ContextAttributes, ContextHandle, ProxyMode};
pub use manager::ContextManager;
