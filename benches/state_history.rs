//! State history throughput benchmark
//!
//! Measures the three hot paths of a replay session:
//!
//! 1. `modify_attribute` - close the previous interval and open a new one
//! 2. `query_at` - point query (binary search over closed intervals)
//! 3. `query_range` - range query iteration
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench state_history
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use estado::pile::Pile;
use estado::state_system::{Quark, QueryEngine, StateHistoryBuilder, StateValue};

/// History with `attrs` attributes each changed `changes` times
fn build_history(attrs: usize, changes: u64) -> (QueryEngine, Vec<Quark>) {
    let mut builder = StateHistoryBuilder::new();
    let quarks: Vec<Quark> = (0..attrs)
        .map(|i| builder.quark_for_str(&format!("hosts/{}/status", i)).unwrap())
        .collect();
    for t in 0..changes {
        for (i, &q) in quarks.iter().enumerate() {
            builder
                .modify_attribute(t * attrs as u64 + i as u64, q, (t % 7) as i32)
                .unwrap();
        }
    }
    builder.close_stream(changes * attrs as u64).unwrap();
    (builder.query_engine(), quarks)
}

fn bench_modify(c: &mut Criterion) {
    let mut group = c.benchmark_group("modify_attribute");
    for attrs in [1usize, 16, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(attrs), &attrs, |b, &attrs| {
            b.iter(|| {
                let mut builder = StateHistoryBuilder::new();
                let quarks: Vec<Quark> = (0..attrs)
                    .map(|i| builder.quark_for_str(&format!("cpu/{}", i)).unwrap())
                    .collect();
                for t in 0..1_000u64 {
                    let q = quarks[(t as usize) % attrs];
                    builder.modify_attribute(t, q, StateValue::Long(t as i64)).unwrap();
                }
                black_box(builder.quark_count())
            });
        });
    }
    group.finish();
}

fn bench_point_query(c: &mut Criterion) {
    let (query, quarks) = build_history(16, 10_000);
    c.bench_function("query_at", |b| {
        let mut t = 0u64;
        b.iter(|| {
            t = (t + 7_919) % 160_000;
            black_box(query.query_at(quarks[(t % 16) as usize], t).unwrap())
        });
    });
    c.bench_function("query_path", |b| {
        b.iter(|| black_box(query.query_path("hosts/3/status", black_box(54_321)).unwrap()));
    });
}

fn bench_range_query(c: &mut Criterion) {
    let (query, quarks) = build_history(4, 10_000);
    let mut group = c.benchmark_group("query_range");
    for width in [100u64, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter(|| {
                let range = query.query_range_quark(quarks[0], 10_000, 10_000 + width).unwrap();
                black_box(range.iter().count())
            });
        });
    }
    group.finish();
}

fn bench_pile(c: &mut Criterion) {
    c.bench_function("pile_insert_remove", |b| {
        b.iter(|| {
            let mut builder = StateHistoryBuilder::new();
            let disk = builder.quark_for_str("disks/sda").unwrap();
            let mut pile = Pile::new(disk, 3);
            for t in 0..500u64 {
                pile.insert(&mut builder, t, t * 2, &[("status", StateValue::Int(1))])
                    .unwrap();
                if t >= 8 {
                    pile.remove(&mut builder, &(t - 8), t * 2 + 1).unwrap();
                }
            }
            black_box(pile.occupancy())
        });
    });
}

criterion_group!(
    benches,
    bench_modify,
    bench_point_query,
    bench_range_query,
    bench_pile
);
criterion_main!(benches);
