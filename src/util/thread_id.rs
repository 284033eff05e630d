use std::sync::atomic::{AtomicUsize, Ordering};

static THREAD_ID_COUNTER: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    /// The process-unique id of the current thread; never 0.
    static THREAD_ID: usize = THREAD_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
}

/// Get the process-unique id of the current thread.
///
/// Ids are handed out lazily on first use and are never reused, so a stored
/// id keeps naming the same thread for the life of the process.
#[inline]
pub fn current_thread_id() -> usize {
    THREAD_ID.with(|id| *id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_on_one_thread_distinct_across_threads() {
        let here = current_thread_id();
        assert_ne!(here, 0);
        assert_eq!(here, current_thread_id());

        let there = std::thread::spawn(current_thread_id).join().unwrap();
        assert_ne!(here, there);
    }
}
