pub mod backend;
pub mod box_util;
pub mod config;
pub mod error;
pub mod logging;
pub mod predictor;
pub mod processing;

pub use config::InferenceConfig;

// Re-export commonly used types for convenience
pub use backend::NetworkBackend;
pub use box_util::{DetectedBox, format_detected_box};
pub use error::{PipelineError, PredictorError};
pub use predictor::Predictor;
pub use processing::{Pipeline, Processor};
