use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use store::{Storage, Store, TableKind};

fn signatures(n: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(0xBE7C);
    (0..n).map(|_| rng.gen()).collect()
}

fn build(sigs: &[u64], size: u8, kind: TableKind) -> Store {
    let mut store = Store::with_size(size, sigs.len(), kind).expect("size");
    for (docid, &sig) in sigs.iter().enumerate() {
        store.add(sig, docid as u64);
    }
    store.finish();
    store
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for size in [100_000usize] {
        let sigs = signatures(size);
        group.throughput(Throughput::Elements(size as u64));
        for (label, kind) in [("plain", TableKind::Plain), ("compressed", TableKind::Compressed)]
        {
            group.bench_function(format!("size6_{label}_{size}"), |b| {
                b.iter(|| build(black_box(&sigs), 6, kind))
            });
        }
    }

    group.finish();
}

fn bench_find(c: &mut Criterion) {
    let sigs = signatures(100_000);
    let mut rng = StdRng::seed_from_u64(0xF1AD);
    let queries: Vec<u64> = (0..1_000)
        .map(|_| sigs[rng.gen_range(0..sigs.len())] ^ (1u64 << rng.gen_range(0..64)))
        .collect();

    let mut group = c.benchmark_group("find");
    group.throughput(Throughput::Elements(queries.len() as u64));

    for (label, kind) in [("plain", TableKind::Plain), ("compressed", TableKind::Compressed)] {
        let store = build(&sigs, 6, kind);
        group.bench_function(format!("size6_{label}"), |b| {
            b.iter(|| {
                for &q in &queries {
                    black_box(store.find(black_box(q)));
                }
            })
        });
    }

    let small = build(&sigs, 3, TableKind::Compressed);
    group.bench_function("size3_small", |b| {
        b.iter(|| {
            for &q in &queries {
                black_box(small.find(black_box(q)));
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_find);
criterion_main!(benches);
