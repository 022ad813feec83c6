//! Benchmark suite for the harness's own bookkeeping
//!
//! Measures per-trial aggregation and a full host-backend convergence
//! run, so harness overhead stays negligible next to real kernels.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use medir::{
    decode_slice, encode_slice, median_duration, total_duration, ArgContainer, Harness,
    HarnessConfig, HostBackend, LaunchContext, Run, TimingRecord,
};

fn synthetic_records(count: usize) -> Vec<TimingRecord> {
    let run = Run::linear(1024, 64);
    (0..count)
        .map(|i| {
            TimingRecord::raw(
                Duration::from_nanos(((i * 7919) % 104_729) as u64),
                &run,
                0,
                i as u32,
            )
        })
        .collect()
}

fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");
    for count in [16, 256, 4096] {
        let records = synthetic_records(count);
        group.bench_with_input(BenchmarkId::new("median", count), &records, |b, records| {
            b.iter(|| median_duration(black_box(records)));
        });
        group.bench_with_input(BenchmarkId::new("sum", count), &records, |b, records| {
            b.iter(|| total_duration(black_box(records)));
        });
    }
    group.finish();
}

fn bench_host_convergence(c: &mut Criterion) {
    c.bench_function("host_chain_convergence", |b| {
        b.iter(|| {
            // Shift a wavefront down a 64-element chain until stable.
            let kernel = |ctx: &mut LaunchContext<'_>| {
                let input: Vec<i32> = decode_slice(&ctx.read_global(2)?);
                let mut next = input.clone();
                for i in 1..next.len() {
                    if input[i - 1] != 0 && next[i] == 0 {
                        next[i] = input[i - 1] + 1;
                    }
                }
                let bytes = encode_slice(&next);
                ctx.global_mut(6)?.copy_from_slice(&bytes);
                Ok(())
            };
            let mut initial = vec![0i32; 64];
            initial[0] = 1;
            let args = ArgContainer::new(Vec::new(), Vec::new())
                .with_vectors(&initial, &vec![0i32; 64]);
            let config = HarnessConfig::default().with_trials(1);
            let mut harness =
                Harness::new(HostBackend::new(kernel), args, config).expect("harness");
            harness
                .benchmark(&Run::linear(64, 1), black_box(&[]))
                .expect("benchmark")
        });
    });
}

criterion_group!(benches, bench_aggregation, bench_host_convergence);
criterion_main!(benches);
