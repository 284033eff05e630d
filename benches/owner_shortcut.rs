use criterion::{Criterion, criterion_group, criterion_main};
use std::time::Duration;

use owner_affinity::prelude::*;

fn noop() {}

fn bench_owner_shortcut(c: &mut Criterion) {
    let mut group = c.benchmark_group("owner_shortcut");
    group.measurement_time(Duration::from_secs(5));

    // 1. Worker thread dispatching synchronously (queue + wake + wait).
    group.bench_function("worker_sync_dispatch", |b| {
        let rt = Runtime::spawn().unwrap();
        let d = rt.dispatcher();
        b.iter(|| d.run_on_owner_sync(noop).unwrap());
    });

    // 2. Owner thread dispatching to itself (in-place path).
    // Measured inside the owner with iter_custom.
    group.bench_function("owner_sync_in_place", |b| {
        let rt = Runtime::spawn().unwrap();
        let d = rt.dispatcher();

        b.iter_custom(|iters| {
            let inner = d.clone();
            d.run_on_owner_sync_with(move || {
                let start = std::time::Instant::now();
                for _ in 0..iters {
                    inner.run_on_owner_sync(noop).unwrap();
                }
                start.elapsed()
            })
            .unwrap()
        });
    });

    // 3. Proxied context access from a worker vs. local access on the owner.
    group.bench_function("proxied_with_current", |b| {
        let rt = Runtime::spawn().unwrap();
        let m = ContextManager::new(rt.dispatcher());
        m.register_canvas("#bench", 64, 64).unwrap();
        let h = m.create_context("#bench", ContextAttributes::default()).unwrap();
        m.make_current(h).unwrap();
        b.iter(|| m.with_current(|ctx| ctx.present()).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_owner_shortcut);
criterion_main!(benches);
