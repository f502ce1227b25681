//! Criterion harness: full operation-sequence latency for the SQLite access
//! path under each batching mode at a fixed sweep point.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use crund_bench::adapters::sqlite::SqliteAdapter;
use crund_bench::adapters::LoadAdapter;
use crund_bench::config::{BenchConfig, PartialConfig};
use crund_bench::ops::XMode;
use crund_bench::runner::{RunRecord, TxRunner};
use crund_bench::sweep::SweepPoint;
use crund_bench::verify::Verifier;

fn bench_modes(c: &mut Criterion) {
    // Measurement and quiescing off: criterion owns the timing here.
    let partial = PartialConfig {
        log_real_time: Some(false),
        ..Default::default()
    };
    let cfg = BenchConfig::resolve(partial).expect("config");
    let runner = TxRunner::new(&cfg);
    let point = SweepPoint {
        count_a: 256,
        count_b: 256,
    };

    let mut group = c.benchmark_group("sequence/sqlite");
    group.sample_size(20);

    for mode in [XMode::Indy, XMode::Each, XMode::Bulk] {
        let mut adapter = SqliteAdapter::new(":memory:");
        adapter.init_connection(&cfg).expect("connect");
        let registry = adapter.init_operations(&[mode]);

        group.bench_with_input(BenchmarkId::from_parameter(mode), &point, |b, point| {
            b.iter(|| {
                adapter.clear_data().expect("clear");
                let mut verifier = Verifier::new(false);
                let mut record = RunRecord::new();
                for op in registry.iter() {
                    runner
                        .run_op(&mut adapter, op, *point, &mut verifier, &mut record)
                        .expect("op");
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_modes);
criterion_main!(benches);
