//! Typed view of the `meta.yaml` file shipped next to a compiled network.
//!
//! The file declares the task, the class labels, the network input size and
//! the ordered pre/post-processing steps the runtime has to apply.

pub mod error;
pub mod meta;
pub mod step;

pub use error::MetaError;
pub use meta::{DataFormat, Meta, Task};
pub use step::StepDescriptor;
