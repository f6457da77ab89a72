use bloom_backends_rs::{
    BloomFilter, FilterConfigBuilder, MemoryBackend, ProbeStrategy,
    SeekFileBackend,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::{Rng, distr::Alphanumeric};

fn generate_random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn generate_test_data(count: usize) -> Vec<String> {
    (0..count).map(|_| generate_random_string(32)).collect()
}

fn create_memory_filter(
    strategy: ProbeStrategy,
) -> BloomFilter<MemoryBackend> {
    let config = FilterConfigBuilder::default()
        .capacity(100_000)
        .error_rate(0.01)
        .strategy(strategy)
        .build()
        .expect("Failed to build config");
    BloomFilter::new_in_memory(config).expect("Failed to create filter")
}

fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("add");
    let items = generate_test_data(1_000);

    for strategy in [ProbeStrategy::SeededRng, ProbeStrategy::DoubleHash] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{strategy:?}")),
            &strategy,
            |b, &strategy| {
                let mut filter = create_memory_filter(strategy);
                let mut cursor = 0usize;
                b.iter(|| {
                    let item = &items[cursor % items.len()];
                    cursor += 1;
                    filter.add(item.as_bytes()).unwrap();
                });
            },
        );
    }
    group.finish();
}

fn bench_contains(c: &mut Criterion) {
    let mut group = c.benchmark_group("contains");
    let items = generate_test_data(1_000);

    for strategy in [ProbeStrategy::SeededRng, ProbeStrategy::DoubleHash] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{strategy:?}")),
            &strategy,
            |b, &strategy| {
                let mut filter = create_memory_filter(strategy);
                for item in &items {
                    filter.add(item.as_bytes()).unwrap();
                }
                let mut cursor = 0usize;
                b.iter(|| {
                    let item = &items[cursor % items.len()];
                    cursor += 1;
                    filter.contains(item.as_bytes()).unwrap()
                });
            },
        );
    }
    group.finish();
}

fn bench_seek_file_add(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let items = generate_test_data(1_000);

    c.bench_function("seek_file_add", |b| {
        let config = FilterConfigBuilder::default()
            .capacity(100_000)
            .error_rate(0.01)
            .build()
            .expect("Failed to build config");
        let mut filter: BloomFilter<SeekFileBackend> =
            BloomFilter::new_seek_file(config, dir.path().join("bench.bloom"))
                .expect("Failed to create filter");
        let mut cursor = 0usize;
        b.iter(|| {
            let item = &items[cursor % items.len()];
            cursor += 1;
            filter.add(item.as_bytes()).unwrap();
        });
    });
}

fn bench_union(c: &mut Criterion) {
    c.bench_function("union_100k_bits", |b| {
        let mut left = create_memory_filter(ProbeStrategy::DoubleHash);
        let mut right = create_memory_filter(ProbeStrategy::DoubleHash);
        for item in generate_test_data(1_000) {
            left.add(item.as_bytes()).unwrap();
            right.add(item.as_bytes()).unwrap();
        }
        b.iter(|| left.union(&right).unwrap());
    });
}

criterion_group!(
    benches,
    bench_add,
    bench_contains,
    bench_seek_file_add,
    bench_union
);
criterion_main!(benches);
