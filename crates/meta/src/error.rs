use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetaError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Malformed metadata: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Missing metadata field: {0}")]
    MissingField(&'static str),

    #[error("Invalid metadata field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Invalid step descriptor: {0}")]
    InvalidStep(String),
}
