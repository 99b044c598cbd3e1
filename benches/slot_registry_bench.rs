use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use slotmap::{DefaultKey, SlotMap};
use stash::{DynArray, SlotRegistry};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

// 10k distinct positions in `0..n`.
fn victims(n: usize) -> Vec<usize> {
    let mut sel = hashbrown::HashSet::with_capacity(10_000);
    let mut s = 0x9e3779b97f4a7c15u64;
    while sel.len() < 10_000 {
        s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
        sel.insert((s as usize) % n);
    }
    sel.into_iter().collect()
}

fn bench_push_100k(c: &mut Criterion) {
    c.bench_function("registry::push_fresh_100k", |b| {
        b.iter_batched(
            SlotRegistry::<u64>::new,
            |mut r| {
                for x in lcg(1).take(100_000) {
                    r.push(x).unwrap();
                }
                black_box(r)
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("slotmap::insert_fresh_100k", |b| {
        b.iter_batched(
            SlotMap::<DefaultKey, u64>::new,
            |mut r| {
                for x in lcg(1).take(100_000) {
                    r.insert(x);
                }
                black_box(r)
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("dyn_array::push_back_100k", |b| {
        b.iter_batched(
            DynArray::<u64>::new,
            |mut a| {
                for x in lcg(1).take(100_000) {
                    a.push_back(x).unwrap();
                }
                black_box(a)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_churn_10k(c: &mut Criterion) {
    let picks = victims(110_000);
    c.bench_function("registry::pop_then_reissue_10k_of_110k", |b| {
        b.iter_batched(
            || {
                let mut r = SlotRegistry::<u64>::new();
                let ids: Vec<u32> = lcg(5).take(110_000).map(|x| r.push(x).unwrap()).collect();
                let targets: Vec<u32> = picks.iter().map(|&i| ids[i]).collect();
                (r, targets)
            },
            |(mut r, targets)| {
                for &id in &targets {
                    black_box(r.pop(id));
                }
                for x in lcg(6).take(targets.len()) {
                    r.push(x).unwrap();
                }
                black_box(r)
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("slotmap::remove_then_insert_10k_of_110k", |b| {
        b.iter_batched(
            || {
                let mut r = SlotMap::<DefaultKey, u64>::new();
                let ids: Vec<DefaultKey> = lcg(5).take(110_000).map(|x| r.insert(x)).collect();
                let targets: Vec<DefaultKey> = picks.iter().map(|&i| ids[i]).collect();
                (r, targets)
            },
            |(mut r, targets)| {
                for &id in &targets {
                    black_box(r.remove(id));
                }
                for x in lcg(6).take(targets.len()) {
                    r.insert(x);
                }
                black_box(r)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_and_iter(c: &mut Criterion) {
    let mut r = SlotRegistry::<u64>::new();
    let ids: Vec<u32> = lcg(7).take(100_000).map(|x| r.push(x).unwrap()).collect();
    // Leave ~10% holes so iteration has something to skip.
    for i in victims(ids.len()) {
        r.pop(ids[i]);
    }
    let lookups: Vec<u32> = victims(ids.len()).into_iter().map(|i| ids[(i * 7) % ids.len()]).collect();

    c.bench_function("registry::get_10k_on_100k", |b| {
        b.iter(|| {
            for &id in &lookups {
                black_box(r.get(id));
            }
        })
    });
    c.bench_function("registry::iter_all_100k", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for (_id, v) in r.iter() {
                sum = sum.wrapping_add(*v);
            }
            black_box(sum)
        })
    });
    c.bench_function("registry::cursor_all_100k", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            let mut cur = r.begin();
            while let Some(v) = cur.current() {
                sum = sum.wrapping_add(*v);
                cur.move_next();
            }
            black_box(sum)
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches_push;
    config = bench_config();
    targets = bench_push_100k
}
criterion_group! {
    name = benches_ops;
    config = bench_config();
    targets = bench_churn_10k, bench_get_and_iter
}
criterion_main!(benches_push, benches_ops);
