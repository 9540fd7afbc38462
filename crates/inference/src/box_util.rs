//! Detected boxes and the grid decoder that produces them.

use meta::DataFormat;
use serde::Deserialize;
use tensor::Tensor;

/// Number of values per row in a box tensor: `x, y, w, h, class_id, score`.
pub const BOX_ROW_LEN: usize = 6;

/// Axis-aligned rectangle; `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Box {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Box {
    pub fn area(&self) -> f32 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    /// Intersection over union.
    pub fn iou(&self, other: &Box) -> f32 {
        let x_min = self.x.max(other.x);
        let y_min = self.y.max(other.y);
        let x_max = (self.x + self.w).min(other.x + other.w);
        let y_max = (self.y + self.h).min(other.y + other.h);

        if x_max <= x_min || y_max <= y_min {
            return 0.0;
        }

        let intersection = (x_max - x_min) * (y_max - y_min);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedBox {
    pub bbox: Box,
    /// Index into the predictor's class list.
    pub class_id: usize,
    pub score: f32,
}

/// How raw head values map to probabilities and geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// YOLOv2 head: sigmoid offsets and objectness, exp-scaled anchors,
    /// softmax over classes.
    #[default]
    Logits,
    /// Values are already activated; geometry scales linearly.
    Probabilities,
}

/// Layout and encoding of a grid detection head.
///
/// Every cell proposes `anchors.len()` candidates, each laid out as
/// `[class scores (num_classes), objectness, tx, ty, tw, th]` along the
/// channel axis.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeParams {
    /// `(width, height)` of each anchor, in grid cells.
    pub anchors: Vec<(f32, f32)>,
    pub num_classes: usize,
    /// `(height, width)` of the network input the boxes are scaled to.
    pub image_size: (usize, usize),
    pub data_format: DataFormat,
    /// Candidates whose best class score is not above this are dropped.
    pub threshold: f32,
    pub encoding: Encoding,
}

impl DecodeParams {
    pub fn channels_per_box(&self) -> usize {
        self.num_classes + 5
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.anchors.is_empty() {
            anyhow::bail!("At least one anchor is required");
        }
        if self.num_classes == 0 {
            anyhow::bail!("num_classes must be positive");
        }
        if self.image_size.0 == 0 || self.image_size.1 == 0 {
            anyhow::bail!("image_size must be non-zero, got {:?}", self.image_size);
        }
        Ok(())
    }
}

/// Grid geometry of an output tensor, resolved against [`DecodeParams`].
struct GridLayout {
    rows: usize,
    cols: usize,
    channels: usize,
    data_format: DataFormat,
}

impl GridLayout {
    fn resolve(output: &Tensor, params: &DecodeParams) -> anyhow::Result<Self> {
        let dims = match output.shape() {
            &[1, a, b, c] | &[a, b, c] => (a, b, c),
            other => anyhow::bail!("Expected a grid output tensor, got shape {:?}", other),
        };
        let (rows, cols, channels) = match params.data_format {
            DataFormat::NHWC => (dims.0, dims.1, dims.2),
            DataFormat::NCHW => (dims.1, dims.2, dims.0),
        };

        let expected = params.anchors.len() * params.channels_per_box();
        if channels != expected {
            anyhow::bail!(
                "Output has {} channels, {} anchors x ({} classes + 5) need {}",
                channels,
                params.anchors.len(),
                params.num_classes,
                expected
            );
        }

        Ok(Self {
            rows,
            cols,
            channels,
            data_format: params.data_format,
        })
    }

    #[inline]
    fn index(&self, row: usize, col: usize, channel: usize) -> usize {
        match self.data_format {
            DataFormat::NHWC => (row * self.cols + col) * self.channels + channel,
            DataFormat::NCHW => (channel * self.rows + row) * self.cols + col,
        }
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax_in_place(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    if sum > 0.0 {
        for v in values.iter_mut() {
            *v /= sum;
        }
    }
}

/// Decodes a grid detection head with a fixed set of [`DecodeParams`].
#[derive(Debug, Clone)]
pub struct BoxDecoder {
    params: DecodeParams,
}

impl BoxDecoder {
    pub fn new(params: DecodeParams) -> anyhow::Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &DecodeParams {
        &self.params
    }

    /// Candidates above the threshold, sorted by descending score. Equal
    /// scores keep grid order (row, column, anchor).
    pub fn decode(&self, output: &Tensor) -> anyhow::Result<Vec<DetectedBox>> {
        let params = &self.params;
        let layout = GridLayout::resolve(output, params)?;
        let data = output.data();
        let per_box = params.channels_per_box();
        let (image_h, image_w) = (params.image_size.0 as f32, params.image_size.1 as f32);
        let (grid_h, grid_w) = (layout.rows as f32, layout.cols as f32);

        let mut probabilities = vec![0.0f32; params.num_classes];
        let mut boxes = Vec::new();

        for row in 0..layout.rows {
            for col in 0..layout.cols {
                for (anchor_idx, &(anchor_w, anchor_h)) in params.anchors.iter().enumerate() {
                    let base = anchor_idx * per_box;
                    let at = |offset: usize| data[layout.index(row, col, base + offset)];

                    for (c, p) in probabilities.iter_mut().enumerate() {
                        *p = at(c);
                    }
                    let n = params.num_classes;
                    let (objectness, tx, ty, tw, th) =
                        (at(n), at(n + 1), at(n + 2), at(n + 3), at(n + 4));

                    let (objectness, cx, cy, w, h) = match params.encoding {
                        Encoding::Logits => {
                            softmax_in_place(&mut probabilities);
                            (
                                sigmoid(objectness),
                                (sigmoid(tx) + col as f32) / grid_w,
                                (sigmoid(ty) + row as f32) / grid_h,
                                tw.exp() * anchor_w / grid_w,
                                th.exp() * anchor_h / grid_h,
                            )
                        }
                        Encoding::Probabilities => (
                            objectness,
                            (tx + col as f32) / grid_w,
                            (ty + row as f32) / grid_h,
                            tw * anchor_w / grid_w,
                            th * anchor_h / grid_h,
                        ),
                    };

                    // Strict comparison keeps the lowest class index on ties
                    let mut class_id = 0;
                    let mut best = objectness * probabilities[0];
                    for (c, &p) in probabilities.iter().enumerate().skip(1) {
                        let score = objectness * p;
                        if score > best {
                            best = score;
                            class_id = c;
                        }
                    }

                    if best <= params.threshold {
                        continue;
                    }

                    boxes.push(DetectedBox {
                        bbox: Box {
                            x: (cx - w / 2.0) * image_w,
                            y: (cy - h / 2.0) * image_h,
                            w: w * image_w,
                            h: h * image_h,
                        },
                        class_id,
                        score: best,
                    });
                }
            }
        }

        boxes.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(boxes)
    }
}

/// Decodes a raw grid output tensor into detected boxes.
pub fn format_detected_box(
    output: &Tensor,
    params: &DecodeParams,
) -> anyhow::Result<Vec<DetectedBox>> {
    BoxDecoder::new(params.clone())?.decode(output)
}

/// Packs boxes into an `[N, 6]` tensor of `x, y, w, h, class_id, score` rows.
pub fn detected_boxes_to_rows(boxes: &[DetectedBox]) -> Tensor {
    let data = boxes
        .iter()
        .flat_map(|b| {
            [
                b.bbox.x,
                b.bbox.y,
                b.bbox.w,
                b.bbox.h,
                b.class_id as f32,
                b.score,
            ]
        })
        .collect();
    Tensor::from_vec(vec![boxes.len(), BOX_ROW_LEN], data)
}

/// Reads back an `[N, 6]` box tensor.
pub fn detected_boxes_from_rows(rows: &Tensor) -> anyhow::Result<Vec<DetectedBox>> {
    if rows.rank() != 2 || rows.shape()[1] != BOX_ROW_LEN {
        anyhow::bail!(
            "Expected an [N, {}] box tensor, got shape {:?}",
            BOX_ROW_LEN,
            rows.shape()
        );
    }

    rows.data()
        .chunks_exact(BOX_ROW_LEN)
        .map(|row| {
            let class_id = row[4];
            if class_id < 0.0 || class_id.fract() != 0.0 {
                anyhow::bail!("Invalid class id {} in box row", class_id);
            }
            Ok(DetectedBox {
                bbox: Box {
                    x: row[0],
                    y: row[1],
                    w: row[2],
                    h: row[3],
                },
                class_id: class_id as usize,
                score: row[5],
            })
        })
        .collect()
}
