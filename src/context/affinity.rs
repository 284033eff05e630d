//! Per-thread "current context" table.
//!
//! Each thread keeps one entry per manager: its `Affinity` plus the manager's
//! transfer epoch observed when that affinity was set up. Reads and writes
//! never leave the calling thread.

use core::cell::RefCell;
use smallvec::SmallVec;

use crate::context::handle::Affinity;

#[derive(Clone, Copy)]
struct Entry {
    manager: u64,
    affinity: Affinity,
    epoch: u64,
}

thread_local! {
    static CURRENT: RefCell<SmallVec<[Entry; 4]>> = RefCell::new(SmallVec::new());
}

/// The calling thread's affinity for `manager`, with its setup epoch.
pub(crate) fn get(manager: u64) -> (Affinity, u64) {
    CURRENT.with(|t| {
        t.borrow()
            .iter()
            .find(|e| e.manager == manager)
            .map_or((Affinity::NotCurrent, 0), |e| (e.affinity, e.epoch))
    })
}

/// Replace the calling thread's affinity for `manager`; returns the old one.
pub(crate) fn set(manager: u64, affinity: Affinity, epoch: u64) -> Affinity {
    CURRENT.with(|t| {
        let mut table = t.borrow_mut();
        let pos = table.iter().position(|e| e.manager == manager);
        match (pos, affinity) {
            (Some(i), Affinity::NotCurrent) => table.swap_remove(i).affinity,
            (Some(i), affinity) => {
                let old = table[i].affinity;
                table[i] = Entry {
                    manager,
                    affinity,
                    epoch,
                };
                old
            }
            (None, Affinity::NotCurrent) => Affinity::NotCurrent,
            (None, affinity) => {
                table.push(Entry {
                    manager,
                    affinity,
                    epoch,
                });
                Affinity::NotCurrent
            }
        }
    })
}
