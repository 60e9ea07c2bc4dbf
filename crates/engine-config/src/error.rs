use std::path::PathBuf;
use thiserror::Error;

pub use crate::settings::error::SettingsError;

/// Errors raised while writing a run report to disk.
#[derive(Debug, Error)]
pub enum ReportGenerationError {
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
