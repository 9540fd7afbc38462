use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use preprocess::{divide_by_255, per_image_standardization, pixels_to_tensor, resize};
use tensor::Tensor;

/// Create image tensor for benchmarking (gradient pattern)
fn create_test_image(width: usize, height: usize) -> Tensor {
    let mut pixels = vec![0u8; width * height * 3];
    for y in 0..height {
        for x in 0..width {
            let idx = (y * width + x) * 3;
            pixels[idx] = (x % 256) as u8; // R
            pixels[idx + 1] = (y % 256) as u8; // G
            pixels[idx + 2] = ((x + y) % 256) as u8; // B
        }
    }
    pixels_to_tensor(&pixels, width as u32, height as u32, 3).unwrap()
}

fn benchmark_resize(c: &mut Criterion) {
    let mut group = c.benchmark_group("resize");

    let resolutions = [(640, 480), (1280, 720), (1920, 1080)];

    for (width, height) in resolutions.iter() {
        let image = create_test_image(*width, *height);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", width, height)),
            &image,
            |b, image| b.iter(|| resize(black_box(image), (416, 416)).unwrap()),
        );
    }

    group.finish();
}

fn benchmark_normalization(c: &mut Criterion) {
    let image = create_test_image(416, 416);

    c.bench_function("divide_by_255_416", |b| {
        b.iter(|| divide_by_255(black_box(&image)))
    });

    c.bench_function("per_image_standardization_416", |b| {
        b.iter(|| per_image_standardization(black_box(&image)))
    });
}

criterion_group!(benches, benchmark_resize, benchmark_normalization);
criterion_main!(benches);
