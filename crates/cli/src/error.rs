use connectors::sql::base::error::{ConnectorError, DbError};
use engine_config::error::SettingsError;
use engine_core::error::CheckpointStoreError;
use engine_runtime::error::MigrationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Sync failed: {0}")]
    Runner(#[from] MigrationError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointStoreError),

    #[error("Connection failed: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Invalid connection format provided: {0}")]
    InvalidConnectionFormat(String),
}
