use core::marker::PhantomData;
use crossbeam_queue::SegQueue;
use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread::{self, Thread},
};

use crate::{
    config::DispatchConfig,
    dispatch::{
        completion::{Completion, Pending, oneshot},
        op::{Op, Step},
    },
    error::{Error, Result},
    util::current_thread_id,
};

#[derive(Default)]
struct Counters {
    inline: AtomicU64,
    sync: AtomicU64,
    asynchronous: AtomicU64,
    executed: AtomicU64,
}

/// Snapshot of a dispatcher's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Calls made on the owner thread and run in place.
    pub inline: u64,
    /// Blocking requests enqueued by workers.
    pub sync: u64,
    /// Non-blocking requests enqueued by workers.
    pub asynchronous: u64,
    /// Queued requests the owner loop has run.
    pub executed: u64,
}

struct Shared {
    queue: SegQueue<Op>,
    owner_id: usize,
    owner_thread: Thread,
    closed: AtomicBool,
    counters: Counters,
    config: DispatchConfig,
}

impl Shared {
    /// Drop everything still queued; blocked callers wake with `OwnerUnreachable`.
    fn drain_abandoned(&self) -> usize {
        let mut dropped = 0;
        while let Some(op) = self.queue.pop() {
            if !matches!(op, Op::Terminate) {
                dropped += 1;
            }
        }
        dropped
    }
}

/// Routes callables to the owner thread.
///
/// Cloning is cheap; every clone targets the same owner and queue.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    /// Make the calling thread the owner of a new dispatcher.
    ///
    /// The returned `OwnerLoop` must be serviced on this thread, either by
    /// the embedding event loop via `run_pending` or by handing the thread
    /// over to `run`.
    pub fn on_current_thread(config: DispatchConfig) -> (Self, OwnerLoop) {
        let shared = Arc::new(Shared {
            queue: SegQueue::new(),
            owner_id: current_thread_id(),
            owner_thread: thread::current(),
            closed: AtomicBool::new(false),
            counters: Counters::default(),
            config,
        });
        let owner = OwnerLoop {
            shared: shared.clone(),
            _not_send: PhantomData,
        };
        (Self { shared }, owner)
    }

    /// Is the calling thread this dispatcher's owner?
    #[inline]
    pub fn is_owner(&self) -> bool {
        current_thread_id() == self.shared.owner_id
    }

    /// Process-unique id of the owner thread.
    #[inline]
    pub fn owner_id(&self) -> usize {
        self.shared.owner_id
    }

    /// Configuration the owner loop was created with.
    pub fn config(&self) -> &DispatchConfig {
        &self.shared.config
    }

    /// Run `f` on the owner thread and wait for it to finish.
    ///
    /// On the owner thread `f` runs in place, so a callable may itself
    /// dispatch synchronously without deadlocking.
    pub fn run_on_owner_sync(&self, f: fn()) -> Result<()> {
        if self.is_owner() {
            self.count_inline();
            f();
            return Ok(());
        }
        let (done, completion) = oneshot();
        self.submit_sync(Op::Call(f, Some(done)), completion)
    }

    /// Run `f(arg)` on the owner thread and wait for it to finish.
    ///
    /// `arg` is the only payload; callers with more state box it behind the
    /// word themselves.
    pub fn run_on_owner_sync_arg(&self, f: fn(usize), arg: usize) -> Result<()> {
        if self.is_owner() {
            self.count_inline();
            f(arg);
            return Ok(());
        }
        let (done, completion) = oneshot();
        self.submit_sync(Op::CallArg(f, arg, Some(done)), completion)
    }

    /// Hand `f(arg)` to the owner thread and return immediately.
    ///
    /// No completion signal is provided; a caller that needs one bakes it
    /// into `f`, or uses `run_on_owner_async_with`. If the owner loop has
    /// shut down the request is silently discarded.
    pub fn run_on_owner_async(&self, f: fn(usize), arg: usize) {
        if self.is_owner() {
            self.count_inline();
            f(arg);
            return;
        }
        self.shared
            .counters
            .asynchronous
            .fetch_add(1, Ordering::Relaxed);
        self.submit(Op::CallArg(f, arg, None));
    }

    /// Run a closure on the owner thread and return its result.
    pub fn run_on_owner_sync_with<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_owner() {
            self.count_inline();
            return Ok(f());
        }
        let (done, completion) = oneshot();
        let job = Box::new(move || match catch_unwind(AssertUnwindSafe(f)) {
            Ok(v) => done.complete(v),
            Err(_) => done.panicked(),
        });
        self.submit_sync(Op::Closure(job), completion)
    }

    /// Hand a closure to the owner thread without blocking.
    ///
    /// The returned `Pending` resolves once the owner has run it. Awaiting it
    /// from a `may` coroutine yields the coroutine rather than the thread.
    pub fn run_on_owner_async_with<F, R>(&self, f: F) -> Pending<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, pending) = Pending::channel();
        let job = move || {
            let out = catch_unwind(AssertUnwindSafe(f)).map_err(|_| Error::Panicked);
            // The caller may have dropped its Pending; that is not an error.
            let _ = tx.send(out);
        };
        if self.is_owner() {
            self.count_inline();
            job();
        } else {
            self.shared
                .counters
                .asynchronous
                .fetch_add(1, Ordering::Relaxed);
            self.submit(Op::Closure(Box::new(job)));
        }
        pending
    }

    /// Ask the owner loop to stop once it reaches this request.
    ///
    /// Requests queued behind it are discarded.
    pub fn shutdown(&self) {
        self.submit(Op::Terminate);
    }

    /// Has the owner loop stopped accepting work?
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Number of requests waiting in the owner's queue.
    #[inline]
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> DispatchStats {
        let c = &self.shared.counters;
        DispatchStats {
            inline: c.inline.load(Ordering::Relaxed),
            sync: c.sync.load(Ordering::Relaxed),
            asynchronous: c.asynchronous.load(Ordering::Relaxed),
            executed: c.executed.load(Ordering::Relaxed),
        }
    }

    /// Install this dispatcher as the process-wide owner. Succeeds once.
    pub fn install_global(&self) -> Result<()> {
        crate::dispatch::global::install(self)
    }

    #[inline]
    fn count_inline(&self) {
        self.shared.counters.inline.fetch_add(1, Ordering::Relaxed);
    }

    fn submit_sync<T>(&self, op: Op, completion: Completion<T>) -> Result<T> {
        self.shared.counters.sync.fetch_add(1, Ordering::Relaxed);
        self.submit(op);
        completion.wait(self.shared.config.budget())
    }

    fn submit(&self, op: Op) {
        if self.is_closed() {
            tracing::warn!("owner loop is closed; discarding request");
            return;
        }
        tracing::trace!(owner = self.shared.owner_id, "enqueue");
        self.shared.queue.push(op);
        // The owner may have closed between the check and the push; if so
        // nobody will consume the queue again, so clear it here.
        if self.is_closed() {
            self.shared.drain_abandoned();
        }
        self.shared.owner_thread.unpark();
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("owner_id", &self.shared.owner_id)
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Result of one `OwnerLoop::run_pending` round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pump {
    /// Ran this many requests; the loop is still open.
    Ran(usize),
    /// A shutdown request was reached; the loop is closed.
    Terminated,
}

/// Consumer side of the owner's run queue. Lives on the owner thread.
pub struct OwnerLoop {
    shared: Arc<Shared>,
    _not_send: PhantomData<*const ()>,
}

impl OwnerLoop {
    /// A dispatcher targeting this loop.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher {
            shared: self.shared.clone(),
        }
    }

    /// Run up to `burst` queued requests in FIFO order.
    pub fn run_pending(&mut self) -> Pump {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Pump::Terminated;
        }
        let burst = self.shared.config.effective_burst();
        let mut ran = 0;
        while ran < burst {
            let Some(op) = self.shared.queue.pop() else {
                break;
            };
            match op.run() {
                Step::Continue => {
                    ran += 1;
                    self.shared.counters.executed.fetch_add(1, Ordering::Relaxed);
                }
                Step::Terminate => {
                    self.close();
                    return Pump::Terminated;
                }
            }
        }
        Pump::Ran(ran)
    }

    /// Service the queue until shut down, idling with spin, yield, then park.
    pub fn run(mut self) {
        tracing::info!(owner = self.shared.owner_id, "owner loop started");
        let mut budget = self.shared.config.budget();
        let park = self.shared.config.idle_park();
        loop {
            match self.run_pending() {
                Pump::Terminated => break,
                Pump::Ran(0) => {
                    if !budget.step() {
                        thread::park_timeout(park);
                        budget.reset();
                    }
                }
                Pump::Ran(_) => budget.reset(),
            }
        }
        tracing::info!(owner = self.shared.owner_id, "owner loop stopped");
    }

    fn close(&self) {
        if !self.shared.closed.swap(true, Ordering::SeqCst) {
            let dropped = self.shared.drain_abandoned();
            if dropped > 0 {
                tracing::warn!(dropped, "discarded requests queued behind shutdown");
            }
        }
    }
}

impl Drop for OwnerLoop {
    fn drop(&mut self) {
        self.close();
    }
}
