//! Image kernels used by the pre-processing steps.
//!
//! Every kernel takes an `[height, width, channels]` tensor and returns a new
//! tensor; none of them mutate their input.

pub mod convert;
pub mod normalize;
pub mod resize;

pub use convert::pixels_to_tensor;
pub use normalize::{divide_by_255, normalize, per_image_standardization};
pub use resize::resize;

/// Height, width and channels of an HWC image tensor.
pub fn hwc_dims(image: &tensor::Tensor) -> anyhow::Result<(usize, usize, usize)> {
    match image.shape() {
        &[height, width, channels] => Ok((height, width, channels)),
        other => anyhow::bail!("Expected an [height, width, channels] image, got shape {:?}", other),
    }
}
