use crate::hwc_dims;
use common::span_debug;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use fast_image_resize::images::ImageRef;
use tensor::Tensor;

fn pixel_type(channels: usize) -> anyhow::Result<PixelType> {
    Ok(match channels {
        1 => PixelType::F32,
        2 => PixelType::F32x2,
        3 => PixelType::F32x3,
        4 => PixelType::F32x4,
        other => anyhow::bail!("Cannot resize an image with {} channels", other),
    })
}

/// Bilinear resize of an `[height, width, channels]` image to `size`
/// (`(height, width)`). Returns a copy when the image already has that size.
pub fn resize(image: &Tensor, size: (usize, usize)) -> anyhow::Result<Tensor> {
    let _s = span_debug!("resize");

    let (height, width, channels) = hwc_dims(image)?;
    let (new_height, new_width) = size;

    if new_height == 0 || new_width == 0 {
        anyhow::bail!("Resize target must be non-empty, got {:?}", size);
    }
    if (height, width) == size {
        return Ok(image.clone());
    }

    tracing::trace!(
        height,
        width,
        new_height,
        new_width,
        channels,
        "Resizing image"
    );

    let pixel_type = pixel_type(channels)?;
    let src = ImageRef::new(
        width as u32,
        height as u32,
        bytemuck::cast_slice(image.data()),
        pixel_type,
    )?;

    let mut output = vec![0.0f32; new_height * new_width * channels];
    {
        let mut resized = Image::from_slice_u8(
            new_width as u32,
            new_height as u32,
            bytemuck::cast_slice_mut(&mut output),
            pixel_type,
        )?;

        Resizer::new().resize(
            &src,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )?;
    }

    Ok(Tensor::from_vec(vec![new_height, new_width, channels], output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_output_shape() {
        let image = Tensor::from_vec(vec![4, 6, 3], vec![128.0; 4 * 6 * 3]);
        let resized = resize(&image, (8, 3)).unwrap();
        assert_eq!(resized.shape(), &[8, 3, 3]);
    }

    #[test]
    fn test_resize_constant_image_stays_constant() {
        let image = Tensor::from_vec(vec![10, 10, 1], vec![0.25; 100]);
        let resized = resize(&image, (5, 5)).unwrap();
        assert!(
            resized.iter().all(|&v| (v - 0.25).abs() < 1e-5),
            "Bilinear resize of a flat image must stay flat"
        );
    }

    #[test]
    fn test_resize_same_size_is_copy() {
        let image = Tensor::from_vec(vec![2, 2, 1], vec![1.0, 2.0, 3.0, 4.0]);
        let resized = resize(&image, (2, 2)).unwrap();
        assert!(resized.all_equal(&image));
    }

    #[test]
    fn test_resize_rejects_bad_inputs() {
        let flat = Tensor::zeros(vec![16]);
        assert!(resize(&flat, (2, 2)).is_err());

        let five_channels = Tensor::zeros(vec![2, 2, 5]);
        assert!(resize(&five_channels, (4, 4)).is_err());

        let image = Tensor::zeros(vec![2, 2, 3]);
        assert!(resize(&image, (0, 4)).is_err());
    }
}
