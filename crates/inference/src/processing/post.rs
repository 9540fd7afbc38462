use crate::box_util::{
    BoxDecoder, DecodeParams, DetectedBox, Encoding, detected_boxes_from_rows,
    detected_boxes_to_rows,
};
use crate::error::PipelineError;
use crate::processing::pipeline::{Processor, Stage};
use crate::processing::pre::params;
use meta::{DataFormat, StepDescriptor};
use ndarray::Axis;
use serde::Deserialize;
use tensor::Tensor;

#[derive(Debug, Deserialize)]
struct FormatYoloV2Params {
    anchors: Vec<(f32, f32)>,
    boxes_per_cell: usize,
    num_classes: usize,
    /// `[height, width]`
    image_size: [usize; 2],
    #[serde(default)]
    data_format: DataFormat,
    #[serde(default)]
    threshold: f32,
    #[serde(default)]
    encoding: Encoding,
}

#[derive(Debug, Deserialize)]
struct ThresholdParams {
    threshold: f32,
}

#[derive(Debug, Deserialize)]
struct NmsParams {
    iou_threshold: f32,
    max_output_size: usize,
    #[serde(default)]
    per_class: bool,
}

/// Maps a post-process descriptor to its processor.
pub fn build_step(descriptor: &StepDescriptor) -> Result<Processor, PipelineError> {
    let name = descriptor.name.as_str();
    let invalid = |reason: String| PipelineError::InvalidConfig {
        name: name.to_string(),
        reason,
    };

    let processor = match name {
        "Softmax" => Processor::new(name, softmax),
        "ArgMax" => Processor::new(name, argmax),
        "FormatYoloV2" => {
            let p: FormatYoloV2Params = params(descriptor)?;
            if p.anchors.len() != p.boxes_per_cell {
                return Err(invalid(format!(
                    "boxes_per_cell is {} but {} anchors are given",
                    p.boxes_per_cell,
                    p.anchors.len()
                )));
            }
            let decoder = BoxDecoder::new(DecodeParams {
                anchors: p.anchors,
                num_classes: p.num_classes,
                image_size: (p.image_size[0], p.image_size[1]),
                data_format: p.data_format,
                threshold: p.threshold,
                encoding: p.encoding,
            })
            .map_err(|e| invalid(e.to_string()))?;

            Processor::new(name, move |output| {
                let boxes = decoder.decode(output)?;
                Ok(detected_boxes_to_rows(&boxes))
            })
        }
        "ExcludeLowScoreBox" => {
            let ThresholdParams { threshold } = params(descriptor)?;
            Processor::new(name, move |rows| exclude_low_score_box(rows, threshold))
        }
        "NMS" => {
            let NmsParams {
                iou_threshold,
                max_output_size,
                per_class,
            } = params(descriptor)?;
            if !(0.0..=1.0).contains(&iou_threshold) {
                return Err(invalid(format!(
                    "iou_threshold must be within [0, 1], got {}",
                    iou_threshold
                )));
            }
            Processor::new(name, move |rows| {
                let boxes = detected_boxes_from_rows(rows)?;
                let kept = non_max_suppression(&boxes, iou_threshold, max_output_size, per_class);
                Ok(detected_boxes_to_rows(&kept))
            })
        }
        _ => {
            return Err(PipelineError::UnknownStep {
                stage: Stage::Post,
                name: name.to_string(),
            });
        }
    };

    Ok(processor)
}

fn last_axis(input: &Tensor) -> anyhow::Result<Axis> {
    match input.rank() {
        0 => anyhow::bail!("Cannot reduce over the last axis of a scalar"),
        rank => Ok(Axis(rank - 1)),
    }
}

/// Softmax over the last axis.
pub fn softmax(input: &Tensor) -> anyhow::Result<Tensor> {
    let axis = last_axis(input)?;
    let mut output = input.clone();
    let mut view = output.view_mut();

    for mut lane in view.lanes_mut(axis) {
        let max = lane.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        lane.mapv_inplace(|v| (v - max).exp());
        let sum = lane.sum();
        if sum > 0.0 {
            lane.mapv_inplace(|v| v / sum);
        }
    }

    Ok(output)
}

/// Index of the largest value along the last axis, as `f32`. Ties resolve to
/// the lowest index.
pub fn argmax(input: &Tensor) -> anyhow::Result<Tensor> {
    let axis = last_axis(input)?;
    if input.shape()[axis.index()] == 0 {
        anyhow::bail!("Cannot take argmax over an empty axis");
    }

    let indices = input.view().map_axis(axis, |lane| {
        let mut best = 0;
        for (i, &v) in lane.iter().enumerate() {
            if v > lane[best] {
                best = i;
            }
        }
        best as f32
    });

    Ok(Tensor::from(indices))
}

/// Keeps `[N, 6]` box rows whose score is at least `threshold`.
pub fn exclude_low_score_box(rows: &Tensor, threshold: f32) -> anyhow::Result<Tensor> {
    let boxes = detected_boxes_from_rows(rows)?;
    let kept: Vec<DetectedBox> = boxes
        .into_iter()
        .filter(|b| b.score >= threshold)
        .collect();
    Ok(detected_boxes_to_rows(&kept))
}

/// Greedy non-max suppression. Boxes are visited by descending score; a box
/// is dropped when it overlaps an already kept box by more than
/// `iou_threshold`. With `per_class` only boxes of the same class suppress
/// each other.
pub fn non_max_suppression(
    boxes: &[DetectedBox],
    iou_threshold: f32,
    max_output_size: usize,
    per_class: bool,
) -> Vec<DetectedBox> {
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| boxes[b].score.total_cmp(&boxes[a].score));

    let mut keep: Vec<DetectedBox> = Vec::new();
    for i in order {
        if keep.len() >= max_output_size {
            break;
        }
        let candidate = &boxes[i];
        let suppressed = keep.iter().any(|kept| {
            (!per_class || kept.class_id == candidate.class_id)
                && kept.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            keep.push(*candidate);
        }
    }

    keep
}

/// `k` best `(class_id, score)` pairs of a score vector, best first.
pub fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(k);
    ranked
}
