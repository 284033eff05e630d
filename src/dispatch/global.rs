//! The process-wide owner.
//!
//! Established once, never replaced. The free functions mirror the
//! `Dispatcher` methods for code that has no handle to pass around.

use std::sync::OnceLock;

use crate::{
    dispatch::Dispatcher,
    error::{Error, Result},
};

static GLOBAL: OnceLock<Dispatcher> = OnceLock::new();

pub(crate) fn install(dispatcher: &Dispatcher) -> Result<()> {
    GLOBAL
        .set(dispatcher.clone())
        .map_err(|_| Error::OwnerAlreadyEstablished)?;
    tracing::info!(owner = dispatcher.owner_id(), "process owner established");
    Ok(())
}

/// The installed process-wide dispatcher.
pub fn global() -> Result<&'static Dispatcher> {
    GLOBAL.get().ok_or(Error::OwnerNotEstablished)
}

/// Is the calling thread the process-wide owner? False if none is installed.
pub fn is_owner_thread() -> bool {
    GLOBAL.get().is_some_and(Dispatcher::is_owner)
}

/// `Dispatcher::run_on_owner_sync` on the process-wide owner.
pub fn run_on_owner_sync(f: fn()) -> Result<()> {
    global()?.run_on_owner_sync(f)
}

/// `Dispatcher::run_on_owner_sync_arg` on the process-wide owner.
pub fn run_on_owner_sync_arg(f: fn(usize), arg: usize) -> Result<()> {
    global()?.run_on_owner_sync_arg(f, arg)
}

/// `Dispatcher::run_on_owner_async` on the process-wide owner.
pub fn run_on_owner_async(f: fn(usize), arg: usize) -> Result<()> {
    global()?.run_on_owner_async(f, arg);
    Ok(())
}
