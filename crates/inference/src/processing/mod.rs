pub mod pipeline;
pub mod post;
pub mod pre;

pub use pipeline::{Pipeline, Processor, Stage};
