use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ksvm::api::SVM;
use ksvm::core::CacheSize;
use ksvm::features::FeatureSet;
use ksvm::kernel::{CauchyKernel, Kernel};
use ksvm::{CachedKernel, EuclideanDistance};
use std::sync::Arc;

/// Two overlapping 8-dimensional clouds, deterministic
fn synthetic(n: usize) -> (Arc<FeatureSet>, Vec<f64>) {
    let mut rows = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let label = if i % 2 == 0 { 1.0 } else { -1.0 };
        let row = (0..8)
            .map(|d| label * 0.5 + ((i * 7 + d * 13) as f64 * 0.618_033_988_75).fract() - 0.5)
            .collect();
        rows.push(row);
        labels.push(label);
    }
    let features = FeatureSet::dense(rows).expect("rows have equal length");
    (Arc::new(features), labels)
}

fn cauchy() -> CauchyKernel {
    CauchyKernel::new(1.0, EuclideanDistance::new()).expect("sigma is positive")
}

fn bench_kernel_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("cauchy_row");
    for n in [128, 1024] {
        let (features, _) = synthetic(n);
        let mut cached = CachedKernel::new(cauchy(), CacheSize::Rows(1));
        cached
            .init(Arc::clone(&features), features)
            .expect("binding succeeds");

        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                // Alternate rows so the single-row cache always misses
                for i in 0..4 {
                    black_box(cached.row(black_box(i % n)).expect("row in range"));
                }
            })
        });
    }
    group.finish();
}

fn bench_kernel_compute(c: &mut Criterion) {
    let (features, _) = synthetic(256);
    let mut kernel = cauchy();
    kernel
        .init(Arc::clone(&features), features)
        .expect("binding succeeds");

    c.bench_function("cauchy_compute", |b| {
        b.iter(|| kernel.compute(black_box(3), black_box(200)))
    });
}

fn bench_training_cache(c: &mut Criterion) {
    let (features, labels) = synthetic(400);
    let mut group = c.benchmark_group("train_c_svc");
    group.sample_size(10);

    for (name, cache) in [("one_row", CacheSize::Rows(1)), ("full", CacheSize::Rows(400))] {
        group.bench_function(name, |b| {
            b.iter(|| {
                SVM::with_kernel(cauchy())
                    .with_cache_size(cache)
                    .train_features(Arc::clone(&features), black_box(&labels))
                    .expect("training succeeds")
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_kernel_rows,
    bench_kernel_compute,
    bench_training_cache
);
criterion_main!(benches);
