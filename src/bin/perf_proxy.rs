use std::env;
use std::thread;
use std::time::Instant;

use owner_affinity::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let iterations: usize = env::var("ITER")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(20_000);
    let workers: usize = env::var("WORKERS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(4);

    let rt = Runtime::spawn_with(DispatchConfig::from_env())?;
    let manager = ContextManager::new(rt.dispatcher());
    manager.register_canvas("#canvas", 1280, 720)?;

    let start = Instant::now();
    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let m = manager.clone();
            thread::spawn(move || -> Result<u64> {
                let h = m.create_context("#canvas", ContextAttributes::default())?;
                m.make_current(h)?;
                let mut frames = 0;
                for _ in 0..iterations {
                    frames = m.with_current(|ctx| ctx.present())?;
                }
                Ok(frames)
            })
        })
        .collect();

    let mut frames = 0;
    for h in handles {
        frames += h.join().map_err(|_| Error::Panicked)??;
    }
    let elapsed = start.elapsed();
    println!(
        "frames={frames} workers={workers} per_frame={:?}",
        elapsed / (frames.max(1) as u32)
    );
    Ok(())
}
