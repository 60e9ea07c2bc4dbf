use thiserror::Error;

/// All errors coming from the database/query layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// PostgreSQL driver error.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// MySQL/MariaDB driver error.
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// No pooled connection could be obtained.
    #[error("Connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A column value could not be decoded into a model value.
    #[error("Failed to decode {table}.{column}: {message}")]
    Decode {
        table: String,
        column: String,
        message: String,
    },

    /// Writing rows to the database failed at the application level.
    #[error("Write error: {0}")]
    Write(String),

    /// The table is not part of the known table set.
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Errors happening during pool or connection setup.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Invalid connection string: {0}")]
    InvalidUrl(String),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("PostgreSQL connection failed: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Failed to build PostgreSQL pool: {0}")]
    PoolBuild(#[from] deadpool_postgres::BuildError),

    #[error("PostgreSQL pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("MySQL connection failed: {0}")]
    MySql(#[from] mysql_async::Error),

    #[error("Invalid pool size {0}: must be at least 1")]
    InvalidPoolSize(usize),
}
