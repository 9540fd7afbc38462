use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tensor::Tensor;

fn benchmark_indexing(c: &mut Criterion) {
    let t = Tensor::zeros(vec![1, 13, 13, 125]);

    c.bench_function("offset_full_index", |b| {
        b.iter(|| black_box(t.offset(black_box(&[0, 12, 12, 124]))))
    });

    c.bench_function("data_from_prefix", |b| {
        b.iter(|| black_box(t.data_from(black_box(&[0, 6]))).len())
    });
}

fn benchmark_comparison(c: &mut Criterion) {
    let a = Tensor::from_vec(vec![416, 416, 3], vec![0.5; 416 * 416 * 3]);
    let b = a.clone();

    c.bench_function("all_close_416x416x3", |bench| {
        bench.iter(|| black_box(a.all_close(black_box(&b))))
    });
}

criterion_group!(benches, benchmark_indexing, benchmark_comparison);
criterion_main!(benches);
