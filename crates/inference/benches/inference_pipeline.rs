use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use inference::box_util::{BoxDecoder, DecodeParams, Encoding};
use inference::processing::post::non_max_suppression;
use inference::processing::{Pipeline, Stage};
use meta::{DataFormat, StepDescriptor};
use tensor::Tensor;

const YOLO_ANCHORS: [(f32, f32); 5] = [
    (1.08, 1.19),
    (3.42, 4.41),
    (6.63, 11.38),
    (9.42, 5.11),
    (16.62, 10.52),
];

fn decode_params(num_classes: usize) -> DecodeParams {
    DecodeParams {
        anchors: YOLO_ANCHORS.to_vec(),
        num_classes,
        image_size: (416, 416),
        data_format: DataFormat::NHWC,
        threshold: 0.05,
        encoding: Encoding::Logits,
    }
}

/// Deterministic pseudo-random grid output in `[-2, 2)`.
fn mock_grid_output(grid: usize, num_classes: usize) -> Tensor {
    let channels = YOLO_ANCHORS.len() * (num_classes + 5);
    let volume = grid * grid * channels;
    let data = (0..volume)
        .map(|i| ((i * 2654435761) % 4096) as f32 / 1024.0 - 2.0)
        .collect();
    Tensor::from_vec(vec![1, grid, grid, channels], data)
}

fn benchmark_box_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("box_decoding");

    for grid in [7, 13, 19] {
        let decoder = BoxDecoder::new(decode_params(20)).unwrap();
        let output = mock_grid_output(grid, 20);

        group.bench_with_input(
            BenchmarkId::new("format_yolo_v2", format!("{}x{}", grid, grid)),
            &output,
            |b, output| b.iter(|| decoder.decode(black_box(output)).unwrap()),
        );
    }

    group.finish();
}

fn benchmark_nms(c: &mut Criterion) {
    let mut group = c.benchmark_group("nms");
    let decoder = BoxDecoder::new(DecodeParams {
        threshold: 0.0,
        ..decode_params(20)
    })
    .unwrap();

    for grid in [7, 13] {
        let boxes = decoder.decode(&mock_grid_output(grid, 20)).unwrap();

        group.bench_with_input(BenchmarkId::new("per_class", boxes.len()), &boxes, |b, boxes| {
            b.iter(|| non_max_suppression(black_box(boxes), 0.5, 100, true))
        });
    }

    group.finish();
}

fn benchmark_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    let pre = Pipeline::from_descriptors(
        &[
            serde_yaml::from_str::<StepDescriptor>("Resize: {size: [224, 224]}").unwrap(),
            StepDescriptor::named("DivideBy255"),
            StepDescriptor::named("PerImageStandardization"),
        ],
        Stage::Pre,
    )
    .unwrap();
    let image = Tensor::from_vec(vec![480, 640, 3], vec![128.0; 480 * 640 * 3]);

    group.bench_function("pre_process_640x480", |b| {
        b.iter(|| pre.run(black_box(&image)).unwrap())
    });

    let post = Pipeline::from_descriptors(
        &[
            serde_yaml::from_str::<StepDescriptor>(
                "FormatYoloV2: {anchors: [[1.08, 1.19], [3.42, 4.41], [6.63, 11.38], [9.42, 5.11], [16.62, 10.52]], boxes_per_cell: 5, num_classes: 20, image_size: [416, 416]}",
            )
            .unwrap(),
            serde_yaml::from_str::<StepDescriptor>("ExcludeLowScoreBox: {threshold: 0.05}")
                .unwrap(),
            serde_yaml::from_str::<StepDescriptor>(
                "NMS: {iou_threshold: 0.5, max_output_size: 100, per_class: true}",
            )
            .unwrap(),
        ],
        Stage::Post,
    )
    .unwrap();
    let output = mock_grid_output(13, 20);

    group.bench_function("post_process_yolo_v2_13x13", |b| {
        b.iter(|| post.run(black_box(&output)).unwrap())
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_box_decoding,
    benchmark_nms,
    benchmark_pipeline
);
criterion_main!(benches);
