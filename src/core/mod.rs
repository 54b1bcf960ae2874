pub mod config;
pub mod error;

pub use config::{PipelineConfig, DEFAULT_PROFILE_PATH};
pub use error::{ImportError, Result};
