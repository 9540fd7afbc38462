use common::config::env_or;
use std::env;
use std::path::PathBuf;

pub use common::Environment;

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub environment: Environment,
    pub meta_path: PathBuf,
    pub image_path: PathBuf,
    /// Number of classes logged for classification results.
    pub top_k: usize,
}

impl InferenceConfig {
    /// Load configuration from environment variables. `IMAGE_PATH` is required.
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();

        let meta_path = env::var("META_PATH").unwrap_or_else(|_| "meta.yaml".to_string());

        let image_path = env::var("IMAGE_PATH")
            .map_err(|_| anyhow::anyhow!("IMAGE_PATH must be set to the image to run"))?;

        let top_k = env_or("TOP_K", 5);

        Ok(Self {
            environment,
            meta_path: meta_path.into(),
            image_path: image_path.into(),
            top_k,
        })
    }
}
