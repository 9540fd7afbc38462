use crate::backend::NetworkBackend;
use crate::box_util::{DetectedBox, detected_boxes_from_rows};
use crate::error::PredictorError;
use crate::processing::pre::is_resize_step;
use crate::processing::{Pipeline, Stage};
use anyhow::Context;
use meta::{DataFormat, Meta, Task};
use std::path::Path;
use tensor::{Tensor, volume};

/// Runs one image through pre-processing, the network and post-processing.
///
/// Built once from model metadata; a `Predictor` value only exists after the
/// backend is loaded and both chains are built.
pub struct Predictor<B: NetworkBackend> {
    task: Task,
    classes: Vec<String>,
    data_format: DataFormat,
    expected_input_shape: Vec<usize>,
    network_input_shape: Vec<usize>,
    network_output_shape: Vec<usize>,
    resizes_input: bool,
    pre_process: Pipeline,
    post_process: Pipeline,
    backend: B,
}

impl<B: NetworkBackend> Predictor<B> {
    /// Loads metadata from `meta_path` and the network through `B::load`.
    pub fn new(meta_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let meta_path = meta_path.as_ref();
        let meta = Meta::from_path(meta_path)
            .with_context(|| format!("Failed to load metadata from {}", meta_path.display()))?;
        let backend = B::load().context("Failed to load network")?;
        Self::from_meta(meta, backend)
    }

    pub fn from_meta(meta: Meta, backend: B) -> anyhow::Result<Self> {
        let pre_process = Pipeline::from_descriptors(&meta.pre_processor, Stage::Pre)?;
        let post_process = Pipeline::from_descriptors(&meta.post_processor, Stage::Post)?;

        let network_input_shape = backend.input_shape().to_vec();
        let network_output_shape = backend.output_shape().to_vec();
        for (which, shape) in [
            ("input", &network_input_shape),
            ("output", &network_output_shape),
        ] {
            if shape.is_empty() || volume(shape) == 0 {
                return Err(PredictorError::InvalidNetworkShape {
                    which,
                    shape: shape.clone(),
                }
                .into());
            }
        }

        let resizes_input = pre_process.step_names().any(is_resize_step);

        tracing::info!(
            task = meta.task.as_str(),
            classes = meta.classes.len(),
            pre_process = ?pre_process.step_names().collect::<Vec<_>>(),
            post_process = ?post_process.step_names().collect::<Vec<_>>(),
            network_input_shape = ?network_input_shape,
            network_output_shape = ?network_output_shape,
            "Predictor ready"
        );

        Ok(Self {
            task: meta.task,
            expected_input_shape: meta.expected_input_shape(),
            classes: meta.classes,
            data_format: meta.data_format,
            network_input_shape,
            network_output_shape,
            resizes_input,
            pre_process,
            post_process,
            backend,
        })
    }

    pub fn task(&self) -> Task {
        self.task
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn expected_input_shape(&self) -> &[usize] {
        &self.expected_input_shape
    }

    pub fn network_input_shape(&self) -> &[usize] {
        &self.network_input_shape
    }

    pub fn network_output_shape(&self) -> &[usize] {
        &self.network_output_shape
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Runs an `[H, W, C]` image and returns the post-processed output.
    #[tracing::instrument(skip_all, fields(task = self.task.as_str()))]
    pub fn run(&mut self, image: &Tensor) -> anyhow::Result<Tensor> {
        self.check_input_shape(image)?;

        let pre = {
            let _s = common::span!("pre_process");
            self.pre_process
                .run(image)
                .context("Pre-process chain failed")?
        };

        let input = self.to_network_input(pre)?;
        let mut output = vec![0.0f32; volume(&self.network_output_shape)];
        {
            let _s = common::span!("network_run");
            self.backend
                .run(input.data(), &mut output)
                .context("Network run failed")?;
        }
        let output = Tensor::from_vec(self.network_output_shape.clone(), output);

        let _s = common::span!("post_process");
        self.post_process
            .run(&output)
            .context("Post-process chain failed")
    }

    /// Runs a detection model and reads its `[N, 6]` output rows as boxes.
    pub fn run_detection(&mut self, image: &Tensor) -> anyhow::Result<Vec<DetectedBox>> {
        if self.task != Task::ObjectDetection {
            return Err(PredictorError::NotDetection(self.task.as_str()).into());
        }
        let rows = self.run(image)?;
        detected_boxes_from_rows(&rows)
    }

    fn check_input_shape(&self, image: &Tensor) -> Result<(), PredictorError> {
        let expected = &self.expected_input_shape;
        let actual = image.shape();

        let compatible = actual.len() == 3
            && actual[2] == expected[2]
            && (self.resizes_input || actual[..2] == expected[..2]);

        if compatible {
            Ok(())
        } else {
            Err(PredictorError::InputShape {
                expected: expected.clone(),
                actual: actual.to_vec(),
            })
        }
    }

    /// `[H, W, C]` the pre-process chain must produce for an image network,
    /// or `None` when the network input is not a single image.
    fn network_image_shape(&self) -> Option<Vec<usize>> {
        let dims = match self.network_input_shape.as_slice() {
            &[1, a, b, c] | &[a, b, c] => [a, b, c],
            _ => return None,
        };
        Some(match self.data_format {
            DataFormat::NHWC => dims.to_vec(),
            DataFormat::NCHW => vec![dims[1], dims[2], dims[0]],
        })
    }

    fn to_network_input(&self, tensor: Tensor) -> anyhow::Result<Tensor> {
        let fits = match self.network_image_shape() {
            Some(image_shape) if tensor.rank() == 3 => tensor.shape() == image_shape.as_slice(),
            _ => tensor.volume() == volume(&self.network_input_shape),
        };
        if !fits {
            return Err(PredictorError::NetworkInputMismatch {
                expected: self.network_input_shape.clone(),
                actual: tensor.shape().to_vec(),
            }
            .into());
        }

        let tensor = match self.data_format {
            DataFormat::NCHW if tensor.rank() == 3 => {
                let chw = tensor.into_array().permuted_axes(vec![2, 0, 1]);
                Tensor::from(chw.as_standard_layout().into_owned())
            }
            _ => tensor,
        };

        Ok(tensor.reshape(self.network_input_shape.clone())?)
    }
}
