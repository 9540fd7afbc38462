use crate::{MetaError, StepDescriptor};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of channels of the images the runtime accepts.
pub const IMAGE_CHANNELS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Task {
    #[serde(rename = "IMAGE.CLASSIFICATION")]
    Classification,
    #[serde(rename = "IMAGE.OBJECT_DETECTION")]
    ObjectDetection,
    #[serde(rename = "IMAGE.SEMANTIC_SEGMENTATION")]
    SemanticSegmentation,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Classification => "IMAGE.CLASSIFICATION",
            Task::ObjectDetection => "IMAGE.OBJECT_DETECTION",
            Task::SemanticSegmentation => "IMAGE.SEMANTIC_SEGMENTATION",
        }
    }
}

/// Memory layout of the network input and output tensors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum DataFormat {
    #[default]
    NHWC,
    NCHW,
}

#[derive(Debug, Deserialize)]
struct RawMeta {
    #[serde(rename = "TASK")]
    task: Option<Task>,
    #[serde(rename = "CLASSES")]
    classes: Option<Vec<String>>,
    #[serde(rename = "IMAGE_SIZE")]
    image_size: Option<Vec<usize>>,
    #[serde(rename = "DATA_FORMAT", default)]
    data_format: DataFormat,
    #[serde(rename = "PRE_PROCESSOR", default)]
    pre_processor: Option<Vec<StepDescriptor>>,
    #[serde(rename = "POST_PROCESSOR", default)]
    post_processor: Option<Vec<StepDescriptor>>,
}

/// Validated model metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Meta {
    pub task: Task,
    pub classes: Vec<String>,
    /// `(height, width)` the network was trained on.
    pub image_size: (usize, usize),
    pub data_format: DataFormat,
    pub pre_processor: Vec<StepDescriptor>,
    pub post_processor: Vec<StepDescriptor>,
}

impl Meta {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MetaError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let meta = Self::from_yaml_str(&contents)?;

        tracing::debug!(
            path = %path.display(),
            task = meta.task.as_str(),
            classes = meta.classes.len(),
            pre_steps = meta.pre_processor.len(),
            post_steps = meta.post_processor.len(),
            "Loaded model metadata"
        );

        Ok(meta)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, MetaError> {
        let raw: RawMeta = serde_yaml::from_str(contents)?;

        let task = raw.task.ok_or(MetaError::MissingField("TASK"))?;
        let classes = raw.classes.ok_or(MetaError::MissingField("CLASSES"))?;
        let image_size = raw.image_size.ok_or(MetaError::MissingField("IMAGE_SIZE"))?;

        let image_size = match image_size.as_slice() {
            &[height, width] if height > 0 && width > 0 => (height, width),
            other => {
                return Err(MetaError::InvalidField {
                    field: "IMAGE_SIZE",
                    reason: format!("expected [height, width] with non-zero sizes, got {:?}", other),
                });
            }
        };

        Ok(Self {
            task,
            classes,
            image_size,
            data_format: raw.data_format,
            pre_processor: raw.pre_processor.unwrap_or_default(),
            post_processor: raw.post_processor.unwrap_or_default(),
        })
    }

    /// `[height, width, channels]` of the images `Predictor::run` expects.
    pub fn expected_input_shape(&self) -> Vec<usize> {
        vec![self.image_size.0, self.image_size.1, IMAGE_CHANNELS]
    }
}
