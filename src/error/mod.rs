mod error;

pub use error::PipelineError;
