use crate::error::PipelineError;
use crate::processing::pipeline::{Processor, Stage};
use meta::StepDescriptor;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Steps that change the spatial size of the image.
pub const RESIZE_STEPS: [&str; 2] = ["Resize", "ResizeWithGtBoxes"];

#[derive(Debug, Deserialize)]
struct ResizeParams {
    /// `[height, width]`
    size: [usize; 2],
}

#[derive(Debug, Deserialize)]
struct NormalizeParams {
    mean: Vec<f32>,
    std: Vec<f32>,
    #[serde(default)]
    scale: Option<f32>,
}

pub(crate) fn params<T: DeserializeOwned>(descriptor: &StepDescriptor) -> Result<T, PipelineError> {
    descriptor
        .params()
        .map_err(|source| PipelineError::InvalidParams {
            name: descriptor.name.clone(),
            source,
        })
}

pub fn is_resize_step(name: &str) -> bool {
    RESIZE_STEPS.contains(&name)
}

/// Maps a pre-process descriptor to its processor.
pub fn build_step(descriptor: &StepDescriptor) -> Result<Processor, PipelineError> {
    let name = descriptor.name.as_str();

    let processor = match name {
        "Resize" | "ResizeWithGtBoxes" => {
            let ResizeParams {
                size: [height, width],
            } = params(descriptor)?;
            if height == 0 || width == 0 {
                return Err(PipelineError::InvalidConfig {
                    name: name.to_string(),
                    reason: format!("size must be non-zero, got [{}, {}]", height, width),
                });
            }
            Processor::new(name, move |image| preprocess::resize(image, (height, width)))
        }
        "DivideBy255" => Processor::new(name, |image| Ok(preprocess::divide_by_255(image))),
        "PerImageStandardization" => Processor::new(name, |image| {
            Ok(preprocess::per_image_standardization(image))
        }),
        "Normalize" => {
            let NormalizeParams { mean, std, scale } = params(descriptor)?;
            if mean.is_empty() || std.is_empty() {
                return Err(PipelineError::InvalidConfig {
                    name: name.to_string(),
                    reason: "mean and std must not be empty".to_string(),
                });
            }
            Processor::new(name, move |image| {
                preprocess::normalize(image, &mean, &std, scale)
            })
        }
        _ => {
            return Err(PipelineError::UnknownStep {
                stage: Stage::Pre,
                name: name.to_string(),
            });
        }
    };

    Ok(processor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor::Tensor;

    fn step(yaml: &str) -> StepDescriptor {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_resize_step() {
        let processor = build_step(&step("Resize: {size: [4, 6]}")).unwrap();
        let output = processor.apply(&Tensor::zeros(vec![8, 8, 3])).unwrap();
        assert_eq!(output.shape(), &[4, 6, 3]);
        assert!(is_resize_step(processor.name()));
    }

    #[test]
    fn test_resize_with_gt_boxes_alias() {
        let processor = build_step(&step("ResizeWithGtBoxes: {size: [2, 2]}")).unwrap();
        let output = processor.apply(&Tensor::zeros(vec![4, 4, 1])).unwrap();
        assert_eq!(output.shape(), &[2, 2, 1]);
    }

    #[test]
    fn test_resize_requires_size() {
        let err = build_step(&step("Resize: null")).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParams { .. }));

        let err = build_step(&step("Resize: {size: [0, 4]}")).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig { .. }));
    }

    #[test]
    fn test_divide_by_255_step() {
        let processor = build_step(&StepDescriptor::named("DivideBy255")).unwrap();
        let output = processor
            .apply(&Tensor::from_vec(vec![1, 1, 3], vec![255.0, 51.0, 0.0]))
            .unwrap();
        assert!(output.all_close(&Tensor::from_vec(vec![1, 1, 3], vec![1.0, 0.2, 0.0])));
    }

    #[test]
    fn test_normalize_step() {
        let processor =
            build_step(&step("Normalize: {mean: [1.0], std: [2.0], scale: 2.0}")).unwrap();
        let output = processor
            .apply(&Tensor::from_vec(vec![1, 1, 3], vec![2.0, 6.0, 10.0]))
            .unwrap();
        assert_eq!(output.data(), &[0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_unknown_step() {
        let err = build_step(&StepDescriptor::named("Sharpen")).unwrap_err();
        assert_eq!(err.to_string(), "Unknown pre-process step: Sharpen");
    }
}
