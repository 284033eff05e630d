use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use owner_affinity::prelude::*;
use tracing_subscriber::EnvFilter;

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn bump(n: usize) {
    COUNTER.fetch_add(n as u64, Ordering::Relaxed);
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let iterations: usize = env::var("ITER")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(50_000);

    let rt = Runtime::spawn_with(DispatchConfig::from_env())?;
    let d = rt.dispatcher();

    let start = Instant::now();
    for _ in 0..iterations {
        d.run_on_owner_sync_arg(bump, 1)?;
    }
    let sync_elapsed = start.elapsed();

    let start = Instant::now();
    for _ in 0..iterations {
        d.run_on_owner_async(bump, 1);
    }
    d.run_on_owner_sync_arg(bump, 0)?;
    let async_elapsed = start.elapsed();

    let total = COUNTER.load(Ordering::Relaxed);
    assert_eq!(total, 2 * iterations as u64);
    println!(
        "sync: {:?}/op, async: {:?}/op, stats: {:?}",
        sync_elapsed / iterations.max(1) as u32,
        async_elapsed / iterations.max(1) as u32,
        d.stats()
    );
    Ok(())
}
