use crate::processing::Stage;
use thiserror::Error;

/// Configuration errors raised while building a pre/post chain.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unknown {stage} step: {name}")]
    UnknownStep { stage: Stage, name: String },

    #[error("Invalid parameters for {name}: {source}")]
    InvalidParams {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration for {name}: {reason}")]
    InvalidConfig { name: String, reason: String },
}

/// Boundary checks performed by [`crate::Predictor`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PredictorError {
    #[error("Input shape {actual:?} is incompatible with expected input shape {expected:?}")]
    InputShape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error(
        "Pre-processed tensor {actual:?} does not fit the network input shape {expected:?}"
    )]
    NetworkInputMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Network reported an invalid {which} shape: {shape:?}")]
    InvalidNetworkShape {
        which: &'static str,
        shape: Vec<usize>,
    },

    #[error("Task {0} does not produce detected boxes")]
    NotDetection(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        let err = PipelineError::UnknownStep {
            stage: Stage::Pre,
            name: "Sharpen".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown pre-process step: Sharpen");

        let err = PipelineError::InvalidConfig {
            name: "FormatYoloV2".to_string(),
            reason: "no anchors".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration for FormatYoloV2: no anchors"
        );

        let err = PredictorError::InputShape {
            expected: vec![32, 32, 3],
            actual: vec![32, 32],
        };
        assert_eq!(
            err.to_string(),
            "Input shape [32, 32] is incompatible with expected input shape [32, 32, 3]"
        );

        let err = PredictorError::NotDetection("IMAGE.CLASSIFICATION");
        assert_eq!(
            err.to_string(),
            "Task IMAGE.CLASSIFICATION does not produce detected boxes"
        );
    }

    #[test]
    fn test_invalid_params_keeps_source() {
        use std::error::Error;

        let source = serde_yaml::from_str::<u32>("not a number").unwrap_err();
        let err = PipelineError::InvalidParams {
            name: "Resize".to_string(),
            source,
        };
        assert!(err.to_string().starts_with("Invalid parameters for Resize:"));
        assert!(err.source().is_some());
    }
}
