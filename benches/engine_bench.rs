use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use kvs_web::{KeyService, SledKvsEngine};
use rand::prelude::*;
use tempfile::TempDir;

fn open_service() -> (KeyService<SledKvsEngine>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let engine = SledKvsEngine::open(temp_dir.path()).unwrap();
    (KeyService::new(engine), temp_dir)
}

fn random_keys(rng: &mut SmallRng, count: usize) -> Vec<String> {
    (0..count)
        .map(|_| {
            let len = rng.gen_range(1..100);
            (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
        })
        .collect()
}

fn create_bench(c: &mut Criterion) {
    let mut rng = SmallRng::from_seed([0; 32]);
    let keys = random_keys(&mut rng, 100);

    c.bench_function("create", |b| {
        b.iter_batched(
            open_service,
            |(service, _dir)| {
                for key in &keys {
                    service.create(key, "value").unwrap();
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn get_bench(c: &mut Criterion) {
    let mut rng = SmallRng::from_seed([0; 32]);
    let keys = random_keys(&mut rng, 1000);
    let (service, _dir) = open_service();
    for key in &keys {
        service.create(key, "value").unwrap();
    }

    c.bench_function("get", |b| {
        b.iter(|| {
            let key = keys.choose(&mut rng).unwrap();
            service.get(key).unwrap();
        })
    });
}

fn scan_bench(c: &mut Criterion) {
    let mut rng = SmallRng::from_seed([1; 32]);
    let keys = random_keys(&mut rng, 1000);
    let (service, _dir) = open_service();
    for key in &keys {
        service.create(key, "value").unwrap();
    }

    c.bench_function("search", |b| b.iter(|| service.search("ab").unwrap()));
    c.bench_function("stats", |b| b.iter(|| service.stats().unwrap()));
    c.bench_function("list", |b| b.iter(|| service.list(50).unwrap()));
}

criterion_group!(benches, create_bench, get_bench, scan_bench);
criterion_main!(benches);
