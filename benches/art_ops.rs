//! Benchmarks for ART operations.

use std::collections::BTreeMap;
use std::ops::ControlFlow;

use art_mvcc::{Art, MvccArt};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn generate_sequential_keys(n: usize) -> Vec<Vec<u8>> {
    (0..n).map(|i| format!("key:{:08}", i).into_bytes()).collect()
}

fn generate_url_like_keys(n: usize) -> Vec<Vec<u8>> {
    let domains = ["example.com", "test.org", "demo.net", "sample.io"];
    let paths = ["users", "posts", "comments", "api/v1", "api/v2"];

    (0..n)
        .map(|i| {
            let domain = domains[i % domains.len()];
            let path = paths[(i / domains.len()) % paths.len()];
            let id = i / (domains.len() * paths.len());
            format!("{}/{}/{}", domain, path, id).into_bytes()
        })
        .collect()
}

fn filled(keys: &[Vec<u8>]) -> Art<u64> {
    let art = Art::new();
    for (i, key) in keys.iter().enumerate() {
        art.insert(key, i as u64);
    }
    art
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for size in [1_000, 10_000, 100_000] {
        let keys = generate_sequential_keys(size);

        group.bench_with_input(BenchmarkId::new("Art", size), &keys, |b, keys| {
            b.iter(|| black_box(filled(keys)));
        });

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &keys, |b, keys| {
            b.iter(|| {
                let mut map: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
                for (i, key) in keys.iter().enumerate() {
                    map.insert(key.clone(), i as u64);
                }
                black_box(map)
            });
        });
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");

    for size in [1_000, 10_000, 100_000] {
        let keys = generate_sequential_keys(size);
        let art = filled(&keys);
        let btree: BTreeMap<Vec<u8>, u64> = keys.iter().cloned().zip(0..).collect();

        group.bench_with_input(BenchmarkId::new("Art", size), &keys, |b, keys| {
            b.iter(|| {
                let mut sum = 0u64;
                for key in keys.iter() {
                    if let Some(v) = art.get(key) {
                        sum += v;
                    }
                }
                black_box(sum)
            });
        });

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &keys, |b, keys| {
            b.iter(|| {
                let mut sum = 0u64;
                for key in keys.iter() {
                    if let Some(v) = btree.get(key) {
                        sum += v;
                    }
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

fn bench_url_patterns(c: &mut Criterion) {
    let mut group = c.benchmark_group("url_patterns");
    let keys = generate_url_like_keys(10_000);
    let art = filled(&keys);

    group.bench_function("Art/insert", |b| {
        b.iter(|| black_box(filled(&keys)));
    });

    group.bench_function("Art/prefix_scan", |b| {
        b.iter(|| {
            let mut n = 0usize;
            let _ = art.for_each_prefix(b"test.org/api/", |_, _| {
                n += 1;
                ControlFlow::<()>::Continue(())
            });
            black_box(n)
        });
    });

    group.bench_function("Art/remove_reinsert", |b| {
        b.iter(|| {
            for key in keys.iter().step_by(7) {
                let v = art.remove(key);
                if let Some(v) = v {
                    art.insert(key, v);
                }
            }
        });
    });

    group.finish();
}

fn bench_versions(c: &mut Criterion) {
    let mut group = c.benchmark_group("mvcc");
    let keys = generate_sequential_keys(10_000);

    group.bench_function("insert_then_update", |b| {
        b.iter(|| {
            let store: MvccArt<u64> = MvccArt::new();
            for (i, key) in keys.iter().enumerate() {
                let _ = store.insert(key, i as u64, 1);
                let _ = store.update(key, i as u64 + 1, 2);
            }
            black_box(store)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_lookup, bench_url_patterns, bench_versions);
criterion_main!(benches);
