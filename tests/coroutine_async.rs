use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use owner_affinity::prelude::*;
use owner_affinity::util::{current_thread_id, fiber};

#[test]
fn coroutines_await_owner_work_without_blocking_their_thread() {
    may::config().set_workers(1).set_stack_size(0x10000);

    let rt = Runtime::spawn().unwrap();
    let d = rt.dispatcher();
    let owner = d.owner_id();
    let progressed = Arc::new(AtomicUsize::new(0));

    let waiters: Vec<_> = (0..4usize)
        .map(|i| {
            let d = d.clone();
            may::go!(move || {
                assert!(fiber::in_coroutine());
                let pending = d.run_on_owner_async_with(move || (current_thread_id(), i * 10));
                pending.wait().unwrap()
            })
        })
        .collect();

    // With a single may worker, this only completes if waiting coroutines
    // yield their thread.
    let ticker = {
        let progressed = progressed.clone();
        may::go!(move || {
            for _ in 0..10 {
                progressed.fetch_add(1, Ordering::SeqCst);
                fiber::yield_now();
            }
        })
    };

    for (i, w) in waiters.into_iter().enumerate() {
        let (ran_on, value) = w.join().unwrap();
        assert_eq!(ran_on, owner);
        assert_eq!(value, i * 10);
    }
    ticker.join().unwrap();
    assert_eq!(progressed.load(Ordering::SeqCst), 10);
}

#[test]
fn owner_waiting_on_a_worker_does_not_deadlock_with_async_dispatch() {
    let (d, mut owner) = Dispatcher::on_current_thread(DispatchConfig::default());

    // The worker hands its owner-side step over without blocking, then
    // finishes its own work, which the owner is waiting for.
    let (tx, rx) = std::sync::mpsc::channel();
    let worker = {
        let d = d.clone();
        std::thread::spawn(move || {
            let pending = d.run_on_owner_async_with(|| "owner step");
            tx.send("worker step").unwrap();
            pending
        })
    };

    assert_eq!(rx.recv().unwrap(), "worker step");
    assert_eq!(owner.run_pending(), Pump::Ran(1));
    assert_eq!(worker.join().unwrap().wait().unwrap(), "owner step");
}
