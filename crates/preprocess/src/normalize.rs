use crate::hwc_dims;
use tensor::Tensor;

pub fn divide_by_255(image: &Tensor) -> Tensor {
    let mut output = image.clone();
    for v in output.iter_mut() {
        *v /= 255.0;
    }
    output
}

/// Shifts the whole image to zero mean and unit variance.
///
/// The standard deviation is floored at `1 / sqrt(N)` so a flat image maps to
/// zeros instead of dividing by zero.
pub fn per_image_standardization(image: &Tensor) -> Tensor {
    let n = image.volume();
    if n == 0 {
        return image.clone();
    }

    let mean = image.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
    let variance = image
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n as f64;
    let adjusted_std = variance.sqrt().max(1.0 / (n as f64).sqrt());

    let mut output = image.clone();
    for v in output.iter_mut() {
        *v = ((*v as f64 - mean) / adjusted_std) as f32;
    }
    output
}

/// Per-channel `(x / scale - mean[c]) / std[c]` on an HWC image.
///
/// `mean` and `std` either hold one value per channel or a single value
/// shared by all channels. Without `scale` the division is skipped.
pub fn normalize(
    image: &Tensor,
    mean: &[f32],
    std: &[f32],
    scale: Option<f32>,
) -> anyhow::Result<Tensor> {
    let (_, _, channels) = hwc_dims(image)?;

    let per_channel = |values: &[f32], what: &str| -> anyhow::Result<Vec<f32>> {
        match values.len() {
            1 => Ok(vec![values[0]; channels]),
            n if n == channels => Ok(values.to_vec()),
            n => anyhow::bail!("Expected 1 or {} {} values, got {}", channels, what, n),
        }
    };
    let mean = per_channel(mean, "mean")?;
    let std = per_channel(std, "std")?;
    if std.iter().any(|&s| s == 0.0) {
        anyhow::bail!("Normalization std must be non-zero, got {:?}", std);
    }
    let scale = scale.unwrap_or(1.0);
    if scale == 0.0 {
        anyhow::bail!("Normalization scale must be non-zero");
    }

    let mut output = image.clone();
    for pixel in output.data_mut().chunks_exact_mut(channels) {
        for (c, v) in pixel.iter_mut().enumerate() {
            *v = (*v / scale - mean[c]) / std[c];
        }
    }
    Ok(output)
}
