use tensor::Tensor;

/// Interleaved 8-bit pixels to an `[height, width, channels]` float tensor.
/// Values keep their 0..=255 range; scaling is left to the pipeline.
pub fn pixels_to_tensor(
    pixels: &[u8],
    width: u32,
    height: u32,
    channels: usize,
) -> anyhow::Result<Tensor> {
    let expected_size = width as usize * height as usize * channels;
    if pixels.len() != expected_size {
        anyhow::bail!(
            "Buffer size mismatch: expected {}, got {} bytes",
            expected_size,
            pixels.len()
        );
    }

    let data = pixels.iter().map(|&p| p as f32).collect();
    Ok(Tensor::from_vec(
        vec![height as usize, width as usize, channels],
        data,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixels_to_tensor_keeps_layout() {
        let pixels = vec![
            255, 0, 0, // Red pixel
            0, 255, 0, // Green pixel
        ];
        let t = pixels_to_tensor(&pixels, 2, 1, 3).unwrap();
        assert_eq!(t.shape(), &[1, 2, 3]);
        assert_eq!(t.data(), &[255.0, 0.0, 0.0, 0.0, 255.0, 0.0]);
    }

    #[test]
    fn test_buffer_size_mismatch_detection() {
        let pixels = vec![0u8; 200]; // Wrong size for 10x10

        let result = pixels_to_tensor(&pixels, 10, 10, 3);

        assert!(result.is_err(), "Size mismatch should return error");
        assert!(
            result.unwrap_err().to_string().contains("mismatch"),
            "Error should mention mismatch"
        );
    }
}
