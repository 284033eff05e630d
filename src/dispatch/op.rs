use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::dispatch::completion::Completer;

/// A request consumed exactly once by the owner loop.
pub(crate) enum Op {
    /// Zero-argument callable; `Some` completer when the caller is blocked.
    Call(fn(), Option<Completer<()>>),
    /// Callable taking one machine word.
    CallArg(fn(usize), usize, Option<Completer<()>>),
    /// Boxed owner-side work that settles its own completion.
    Closure(Box<dyn FnOnce() + Send>),
    /// Stop the owner loop.
    Terminate,
}

/// Outcome of running one op on the owner thread.
pub(crate) enum Step {
    Continue,
    Terminate,
}

impl Op {
    pub(crate) fn run(self) -> Step {
        match self {
            Op::Call(f, done) => settle(catch_unwind(f), done),
            Op::CallArg(f, arg, done) => settle(catch_unwind(move || f(arg)), done),
            Op::Closure(job) => {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    tracing::error!("owner-side closure panicked");
                }
            }
            Op::Terminate => return Step::Terminate,
        }
        Step::Continue
    }
}

fn settle(outcome: std::thread::Result<()>, done: Option<Completer<()>>) {
    match (outcome, done) {
        (Ok(()), Some(done)) => done.complete(()),
        (Ok(()), None) => {}
        (Err(_), done) => {
            tracing::error!("dispatched callable panicked on the owner thread");
            if let Some(done) = done {
                done.panicked();
            }
        }
    }
}
