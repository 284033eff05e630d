use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use owner_affinity::dispatch;
use owner_affinity::prelude::*;
use owner_affinity::util::current_thread_id;

static LAST_RUN_ON: AtomicUsize = AtomicUsize::new(0);
static LAST_ARG: AtomicUsize = AtomicUsize::new(0);

fn note() {
    LAST_RUN_ON.store(current_thread_id(), Ordering::SeqCst);
}

fn note_arg(arg: usize) {
    note();
    LAST_ARG.store(arg, Ordering::SeqCst);
}

// One test per binary: the process-wide owner can only be established once.
#[test]
fn process_owner_is_established_once() {
    assert!(matches!(dispatch::global(), Err(Error::OwnerNotEstablished)));
    assert!(matches!(
        dispatch::run_on_owner_sync(note),
        Err(Error::OwnerNotEstablished)
    ));
    assert!(!dispatch::is_owner_thread());

    let rt = Runtime::spawn().unwrap();
    rt.dispatcher().install_global().unwrap();
    let other = Runtime::spawn().unwrap();
    assert!(matches!(
        other.dispatcher().install_global(),
        Err(Error::OwnerAlreadyEstablished)
    ));

    let owner = rt.dispatcher().owner_id();
    thread::spawn(move || {
        assert!(!dispatch::is_owner_thread());
        dispatch::run_on_owner_sync(note).unwrap();
        assert_eq!(LAST_RUN_ON.load(Ordering::SeqCst), owner);

        dispatch::run_on_owner_sync_arg(note_arg, 41).unwrap();
        assert_eq!(LAST_ARG.load(Ordering::SeqCst), 41);

        dispatch::run_on_owner_async(note_arg, 42).unwrap();
        // A later sync call from the same thread observes the async one.
        dispatch::run_on_owner_sync(note).unwrap();
        assert_eq!(LAST_ARG.load(Ordering::SeqCst), 42);
    })
    .join()
    .unwrap();

    let on_owner = rt
        .dispatcher()
        .run_on_owner_sync_with(dispatch::is_owner_thread)
        .unwrap();
    assert!(on_owner);
}
