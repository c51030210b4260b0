use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use flat_hashmap::FlatHashMap;
use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

type Brown = HashMap<u64, u64, FxBuildHasher>;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

// Both maps use the same hasher so the comparison measures layout only.
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare::insert");
    group.throughput(Throughput::Elements(100_000));
    group.bench_function("flat_100k", |b| {
        b.iter_batched(
            FlatHashMap::<u64, u64>::new,
            |mut m| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    m.insert(x, i as u64).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
    group.bench_function("hashbrown_100k", |b| {
        b.iter_batched(
            Brown::default,
            |mut m| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    m.insert(x, i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let keys: Vec<u64> = lcg(7).take(100_000).collect();
    let mut flat = FlatHashMap::<u64, u64>::new();
    let mut brown = Brown::default();
    for (i, &k) in keys.iter().enumerate() {
        flat.insert(k, i as u64).unwrap();
        brown.insert(k, i as u64);
    }
    let misses: Vec<u64> = lcg(0xdead_beef).take(10_000).collect();

    let mut group = c.benchmark_group("compare::query");
    group.throughput(Throughput::Elements(10_000));
    group.bench_function("flat_hit_10k", |b| {
        b.iter(|| {
            for k in keys.iter().step_by(10) {
                black_box(flat.try_get(k));
            }
        })
    });
    group.bench_function("hashbrown_hit_10k", |b| {
        b.iter(|| {
            for k in keys.iter().step_by(10) {
                black_box(brown.get(k));
            }
        })
    });
    group.bench_function("flat_miss_10k", |b| {
        b.iter(|| {
            for k in &misses {
                black_box(flat.try_get(k));
            }
        })
    });
    group.bench_function("hashbrown_miss_10k", |b| {
        b.iter(|| {
            for k in &misses {
                black_box(brown.get(k));
            }
        })
    });
    group.finish();
}

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare::churn");
    group.throughput(Throughput::Elements(20_000));
    // Remove 10k then insert 10k fresh keys on a 100k map.
    group.bench_function("flat_remove_insert_10k", |b| {
        b.iter_batched(
            || {
                let mut m = FlatHashMap::<u64, u64>::new();
                for (i, x) in lcg(11).take(100_000).enumerate() {
                    m.insert(x, i as u64).unwrap();
                }
                m
            },
            |mut m| {
                for x in lcg(11).take(10_000) {
                    m.remove(&x);
                }
                for (i, x) in lcg(13).take(10_000).enumerate() {
                    m.insert(x, i as u64).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
    group.bench_function("hashbrown_remove_insert_10k", |b| {
        b.iter_batched(
            || {
                let mut m = Brown::default();
                for (i, x) in lcg(11).take(100_000).enumerate() {
                    m.insert(x, i as u64);
                }
                m
            },
            |mut m| {
                for x in lcg(11).take(10_000) {
                    m.remove(&x);
                }
                for (i, x) in lcg(13).take(10_000).enumerate() {
                    m.insert(x, i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_config() -> Criterion {
    Criterion::default()
}

criterion_group! {
    name = benches_compare;
    config = bench_config();
    targets = bench_insert, bench_query, bench_churn
}
criterion_main!(benches_compare);
