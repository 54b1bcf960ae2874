use std::path::PathBuf;

use thiserror::Error;

/// Pipeline-level failures. Record-level problems never surface here; they are
/// absorbed into defaults, fallbacks, or clamping by the converter.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Malformed mapping profile: {0}")]
    ProfileShape(String),

    #[error("Source store not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, ImportError>;
