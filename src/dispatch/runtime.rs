use std::{sync::mpsc, thread};

use crate::{
    config::DispatchConfig,
    dispatch::Dispatcher,
    error::{Error, Result},
    util::pin_current_thread,
};

/// A dedicated owner thread servicing its own run queue.
///
/// Dropping the runtime shuts the loop down and joins the thread.
pub struct Runtime {
    dispatcher: Dispatcher,
    worker: Option<thread::JoinHandle<()>>,
}

impl Runtime {
    /// Spawn an owner thread with default configuration.
    pub fn spawn() -> Result<Self> {
        Self::spawn_with(DispatchConfig::default())
    }

    /// Spawn an owner thread, pinned if `config.pin` is set.
    pub fn spawn_with(config: DispatchConfig) -> Result<Self> {
        let (tx, rx) = mpsc::sync_channel(1);
        let name = config.thread_name.clone();
        let worker = thread::Builder::new().name(name).spawn(move || {
            if let Some(pin) = config.pin {
                pin_current_thread(&pin);
            }
            let (dispatcher, owner) = Dispatcher::on_current_thread(config);
            if tx.send(dispatcher).is_err() {
                return;
            }
            owner.run();
        })?;
        let dispatcher = rx.recv().map_err(|_| Error::OwnerUnreachable)?;
        Ok(Self {
            dispatcher,
            worker: Some(worker),
        })
    }

    /// A dispatcher targeting this runtime's owner thread.
    #[inline]
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.dispatcher.shutdown();
        // Joining from the owner thread itself would never return.
        if self.dispatcher.is_owner() {
            return;
        }
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawned_owner_is_a_different_thread() {
        let rt = Runtime::spawn().unwrap();
        let d = rt.dispatcher();
        assert!(!d.is_owner());
        let on_owner = d.run_on_owner_sync_with({
            let d = d.clone();
            move || d.is_owner()
        });
        assert!(on_owner.unwrap());
    }

    #[test]
    fn dispatch_after_drop_is_unreachable() {
        let d = Runtime::spawn().unwrap().dispatcher();
        assert!(d.is_closed());
        assert!(matches!(
            d.run_on_owner_sync_with(|| ()),
            Err(Error::OwnerUnreachable)
        ));
    }
}
