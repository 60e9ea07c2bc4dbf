use connectors::sql::base::error::DbError;
use engine_core::retry::RetryError;
use model::error::ModelError;
use std::fmt;
use thiserror::Error;

/// Step of an entity migration that talks to a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Watermark,
    Read,
    ExistenceCheck,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Watermark => f.write_str("watermark lookup"),
            Stage::Read => f.write_str("source read"),
            Stage::ExistenceCheck => f.write_str("existence check"),
        }
    }
}

/// Entity-level failures. Any of these aborts the run.
#[derive(Error, Debug)]
pub enum MigratorError {
    #[error("{stage} failed for '{table}': {source}")]
    Database {
        stage: Stage,
        table: String,
        #[source]
        source: DbError,
    },

    #[error("{stage} for '{table}' still failing after retries: {source}")]
    RetriesExhausted {
        stage: Stage,
        table: String,
        #[source]
        source: DbError,
    },

    #[error("Invalid watermark in '{table}': {source}")]
    Watermark {
        table: String,
        #[source]
        source: ModelError,
    },
}

impl MigratorError {
    pub fn from_retry(stage: Stage, table: &str, err: RetryError<DbError>) -> Self {
        match err {
            RetryError::Fatal(source) => MigratorError::Database {
                stage,
                table: table.to_string(),
                source,
            },
            RetryError::AttemptsExceeded(source) => MigratorError::RetriesExhausted {
                stage,
                table: table.to_string(),
                source,
            },
        }
    }

    pub fn table(&self) -> &str {
        match self {
            MigratorError::Database { table, .. }
            | MigratorError::RetriesExhausted { table, .. }
            | MigratorError::Watermark { table, .. } => table,
        }
    }
}

/// Write failures the batch writer recovers from. They are logged and
/// recorded in the write report, never propagated.
#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Chunk of {rows} rows into '{table}' failed: {source}")]
    Chunk {
        table: String,
        rows: usize,
        #[source]
        source: RetryError<DbError>,
    },

    #[error("Row {id} into '{table}' failed: {source}")]
    Row {
        table: String,
        id: String,
        #[source]
        source: RetryError<DbError>,
    },
}

/// A forbidden domain that cannot be matched.
#[derive(Error, Debug)]
pub enum ForbiddenDomainError {
    /// An empty domain would match the scheme of every URL.
    #[error("forbidden domain is empty")]
    Empty,

    #[error("invalid forbidden domain pattern: {0}")]
    Pattern(#[from] regex::Error),
}
