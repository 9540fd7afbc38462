use anyhow::Context;
use inference::backend::DlkNetwork;
use inference::processing::post::top_k;
use inference::{InferenceConfig, Predictor, logging::setup_logging};
use meta::Task;

fn main() -> anyhow::Result<()> {
    let config = InferenceConfig::from_env()?;
    setup_logging(&config);

    tracing::info!(config = ?config, "Loaded configuration");

    let mut predictor = Predictor::<DlkNetwork>::new(&config.meta_path)?;

    let image = image::open(&config.image_path)
        .with_context(|| format!("Failed to open image {}", config.image_path.display()))?
        .to_rgb8();
    let (width, height) = image.dimensions();
    let image = preprocess::pixels_to_tensor(image.as_raw(), width, height, 3)?;

    match predictor.task() {
        Task::ObjectDetection => {
            let boxes = predictor.run_detection(&image)?;
            tracing::info!(count = boxes.len(), "Detected boxes");
            for detected in &boxes {
                let class = predictor
                    .classes()
                    .get(detected.class_id)
                    .map(String::as_str)
                    .unwrap_or("unknown");
                tracing::info!(
                    class,
                    score = detected.score,
                    x = detected.bbox.x,
                    y = detected.bbox.y,
                    w = detected.bbox.w,
                    h = detected.bbox.h,
                    "Box"
                );
            }
        }
        task => {
            let output = predictor.run(&image)?;
            if task == Task::Classification {
                for (rank, (class_id, score)) in
                    top_k(output.data(), config.top_k).into_iter().enumerate()
                {
                    let class = predictor
                        .classes()
                        .get(class_id)
                        .map(String::as_str)
                        .unwrap_or("unknown");
                    tracing::info!(rank = rank + 1, class, score, "Class");
                }
            } else {
                tracing::info!(shape = ?output.shape(), "Output");
            }
        }
    }

    Ok(())
}
