pub mod error;
pub mod tensor;

pub use error::TensorError;
pub use tensor::{DEFAULT_ATOL, DEFAULT_RTOL, Tensor, volume};
