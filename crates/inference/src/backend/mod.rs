pub mod dlk;

pub use dlk::DlkNetwork;

/// A compiled network the predictor can feed.
///
/// Shapes are fixed once the backend is loaded; `run` is synchronous and
/// fills the whole output buffer.
pub trait NetworkBackend {
    fn load() -> anyhow::Result<Self>
    where
        Self: Sized;

    fn input_shape(&self) -> &[usize];

    fn output_shape(&self) -> &[usize];

    /// `input` holds exactly `volume(input_shape)` values and `output`
    /// exactly `volume(output_shape)`.
    fn run(&mut self, input: &[f32], output: &mut [f32]) -> anyhow::Result<()>;
}
