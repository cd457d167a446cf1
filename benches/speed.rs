use chacha_link::cipher::{KeyIvInit, StreamCipher};
use chacha_link::{ChaCha12Link, ChaCha20Link, ChaCha8Link, ChannelConfig, Pipeline, SoftEngine};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

// A generic function to benchmark any reference cipher variant.
fn bench_cipher<C>(c: &mut Criterion, name: &str)
where
    C: KeyIvInit + StreamCipher,
{
    let mut group = c.benchmark_group(name);

    // Benchmark throughput for different buffer sizes.
    for size in [1024, 4096, 16384, 65536].iter() {
        let mut buffer = vec![0u8; *size];
        let key = chacha_link::cipher::Key::<C>::default();
        let nonce = chacha_link::cipher::Iv::<C>::default();
        let mut cipher = C::new(&key, &nonce);

        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| cipher.apply_keystream(&mut buffer));
        });
    }
    group.finish();
}

// Full tick-driven path: inbound assembly, engine, emission.
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Bytes(64));

    for latency in [0u32, 16].iter() {
        let mut pipeline = Pipeline::new(ChannelConfig::default(), SoftEngine::new(*latency))
            .expect("default config is valid");
        let block = [0x5au8; 64];
        group.bench_with_input(BenchmarkId::new("exchange", latency), latency, |b, _| {
            b.iter(|| {
                let ciphertext = pipeline.exchange(&block, 10_000).expect("exchange completes");
                pipeline.link_mut().take_received();
                ciphertext
            });
        });
    }
    group.finish();
}

// Main benchmark function that sets up and runs all benchmarks.
fn benchmarks(c: &mut Criterion) {
    bench_cipher::<ChaCha8Link>(c, "ChaCha8");
    bench_cipher::<ChaCha12Link>(c, "ChaCha12");
    bench_cipher::<ChaCha20Link>(c, "ChaCha20");
    bench_pipeline(c);
}

criterion_group!(benches, benchmarks);
criterion_main!(benches);
