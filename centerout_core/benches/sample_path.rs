use centerout_core::cursor::Cursor;
use centerout_core::geometry::Point;
use centerout_core::machine::{Machine, Trigger};
use centerout_core::mocks::fast_table;
use centerout_core::sequencer::TargetSequencer;
use centerout_core::store::ParameterStore;
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;

// Raw samples circling the canvas center, roughly one loop per 400 samples.
fn synth_samples(n: usize) -> Vec<(f64, f64)> {
    (0..n)
        .map(|i| {
            let t = i as f64 / 64.0;
            (600.0 + 120.0 * t.cos(), 400.0 + 120.0 * t.sin())
        })
        .collect()
}

pub fn bench_sample_path(c: &mut Criterion) {
    let mut g = c.benchmark_group("sample_path");
    if let Ok(n) = std::env::var("BENCH_SAMPLE_SIZE").map(|s| s.parse::<usize>()) {
        g.sample_size(n.unwrap_or(50).max(10));
    } else {
        g.sample_size(50);
    }

    let store = ParameterStore::from_table(&fast_table(), Point::new(600.0, 400.0))
        .expect("fixture table");
    let samples = synth_samples(2_048);

    g.bench_function("cursor_filter", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(1200.0, 800.0);
            for &(x, y) in &samples {
                black_box(cursor.update(x, y, store.params()));
            }
        });
    });

    g.bench_function("filter_and_dispatch", |b| {
        b.iter_batched(
            || {
                let seq = TargetSequencer::new((0..8).collect(), None).expect("sequence");
                let mut m = Machine::new(seq, 5.0, StdRng::seed_from_u64(1));
                m.fire(Trigger::Start, &store);
                (m, Cursor::new(1200.0, 800.0))
            },
            |(mut m, mut cursor)| {
                for &(x, y) in &samples {
                    let p = cursor.update(x, y, store.params());
                    black_box(m.on_sample(p, &store));
                }
            },
            BatchSize::SmallInput,
        );
    });

    g.finish();
}

criterion_group!(benches, bench_sample_path);
criterion_main!(benches);
