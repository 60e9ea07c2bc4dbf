use connectors::sql::base::error::{ConnectorError, DbError};
use engine_config::error::ReportGenerationError;
use engine_core::{error::CheckpointStoreError, retry::RetryError};
use engine_processing::error::MigratorError;
use thiserror::Error;

/// Top-level errors for a sync run.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Initialization error: {0}")]
    InitializationError(String),

    /// The source or target could not be reached.
    #[error("Failed to connect to {role}: {source}")]
    Connect {
        role: &'static str,
        #[source]
        source: RetryError<ConnectorError>,
    },

    /// An entity migrator hit a fatal error; the run stops there.
    #[error("Migration failed: {0}")]
    Migrator(#[from] MigratorError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointStoreError),

    /// Db error.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Report error: {0}")]
    Report(#[from] ReportGenerationError),
}
