//! One-shot completion primitives.
//!
//! `Completion<T>` is what a blocked sync caller waits on: a Mutex/Condvar
//! latch preceded by a short spin. `Pending<R>` is the async counterpart; it
//! rides a `may` channel so a coroutine awaiting it yields instead of
//! blocking its OS thread.

use std::sync::{
    Arc, Condvar, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use crate::error::{Error, Result};
use crate::util::{WaitBudget, fiber};

enum State<T> {
    Pending,
    Done(T),
    Panicked,
    Abandoned,
}

struct Slot<T> {
    state: Mutex<State<T>>,
    cvar: Condvar,
    settled: AtomicBool,
}

impl<T> Slot<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(&self, state: State<T>) {
        *self.lock() = state;
        self.settled.store(true, Ordering::Release);
        self.cvar.notify_all();
    }
}

/// Create a linked completer/completion pair.
pub(crate) fn oneshot<T>() -> (Completer<T>, Completion<T>) {
    let slot = Arc::new(Slot {
        state: Mutex::new(State::Pending),
        cvar: Condvar::new(),
        settled: AtomicBool::new(false),
    });
    (
        Completer {
            slot: Some(slot.clone()),
        },
        Completion { slot },
    )
}

/// Sending half; travels with the request to the owner thread.
///
/// Dropping it unsettled (request discarded at shutdown) wakes the waiter
/// with `Error::OwnerUnreachable`.
pub(crate) struct Completer<T> {
    slot: Option<Arc<Slot<T>>>,
}

impl<T> Completer<T> {
    pub(crate) fn complete(mut self, value: T) {
        if let Some(slot) = self.slot.take() {
            slot.settle(State::Done(value));
        }
    }

    pub(crate) fn panicked(mut self) {
        if let Some(slot) = self.slot.take() {
            slot.settle(State::Panicked);
        }
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.settle(State::Abandoned);
        }
    }
}

/// Receiving half held by the blocked caller.
pub(crate) struct Completion<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Completion<T> {
    /// Block until settled: spin through `budget`, then sleep on the condvar.
    pub(crate) fn wait(self, mut budget: WaitBudget) -> Result<T> {
        while !self.slot.settled.load(Ordering::Acquire) && budget.step() {}

        let mut state = self.slot.lock();
        loop {
            match std::mem::replace(&mut *state, State::Pending) {
                State::Pending => {
                    state = self
                        .slot
                        .cvar
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                State::Done(v) => return Ok(v),
                State::Panicked => return Err(Error::Panicked),
                State::Abandoned => return Err(Error::OwnerUnreachable),
            }
        }
    }
}

/// Result of work handed to the owner without blocking the caller.
///
/// `wait` yields the current coroutine when called inside `may`; on a plain
/// thread it blocks. Dropping a `Pending` does not cancel the work.
pub struct Pending<R> {
    rx: fiber::Receiver<std::result::Result<R, Error>>,
}

impl<R> Pending<R> {
    pub(crate) fn channel() -> (fiber::Sender<std::result::Result<R, Error>>, Self) {
        let (tx, rx) = fiber::channel();
        (tx, Self { rx })
    }

    /// Wait for the owner to run the work and hand back its result.
    pub fn wait(self) -> Result<R> {
        self.rx.recv().map_err(|_| Error::OwnerUnreachable)?
    }

    /// Take the result if the owner has already produced it.
    pub fn try_take(&self) -> Option<Result<R>> {
        self.rx.try_recv().ok()
    }
}

impl<R> std::fmt::Debug for Pending<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pending").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn wait_returns_value_settled_from_another_thread() {
        let (tx, rx) = oneshot::<u32>();
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            tx.complete(42);
        });
        assert_eq!(rx.wait(WaitBudget::with_caps(4, 1)).unwrap(), 42);
        t.join().unwrap();
    }

    #[test]
    fn dropped_completer_reports_unreachable() {
        let (tx, rx) = oneshot::<()>();
        drop(tx);
        assert!(matches!(
            rx.wait(WaitBudget::hot()),
            Err(Error::OwnerUnreachable)
        ));
    }

    #[test]
    fn panicked_completer_reports_panic() {
        let (tx, rx) = oneshot::<()>();
        tx.panicked();
        assert!(matches!(rx.wait(WaitBudget::hot()), Err(Error::Panicked)));
    }

    #[test]
    fn pending_reports_unreachable_when_sender_is_gone() {
        let (tx, pending) = Pending::<u8>::channel();
        assert!(pending.try_take().is_none());
        drop(tx);
        assert!(matches!(pending.wait(), Err(Error::OwnerUnreachable)));
    }
}
