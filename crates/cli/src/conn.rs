use crate::error::CliError;
use async_trait::async_trait;
use connectors::sql::{
    base::{destination::TargetStore, source::SourceStore},
    mysql::adapter::MySqlTarget,
    postgres::adapter::PgSource,
};
use std::str::FromStr;
use tracing::{error, info};

/// Pool size used for one-off connection checks.
const PING_POOL_SIZE: usize = 1;

/// What kind of connection to check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    MySql,
    Postgres,
}

impl FromStr for ConnectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(ConnectionKind::MySql),
            "pg" | "postgres" | "postgresql" => Ok(ConnectionKind::Postgres),
            other => Err(format!("Unknown connection kind: {other}")),
        }
    }
}

impl ConnectionKind {
    pub fn pinger(self, conn_str: String) -> Box<dyn ConnectionPinger> {
        match self {
            ConnectionKind::MySql => Box::new(MySqlConnectionPinger { conn_str }),
            ConnectionKind::Postgres => Box::new(PostgresConnectionPinger { conn_str }),
        }
    }
}

/// Trait for "pinging" a database
#[async_trait]
pub trait ConnectionPinger: Send + Sync {
    /// Attempts to ping; returns Err if unreachable
    async fn ping(&self) -> Result<(), CliError>;
}

/// MySQL/MariaDB pinger
pub struct MySqlConnectionPinger {
    pub conn_str: String,
}

/// Postgres pinger
pub struct PostgresConnectionPinger {
    pub conn_str: String,
}

#[async_trait]
impl ConnectionPinger for MySqlConnectionPinger {
    async fn ping(&self) -> Result<(), CliError> {
        info!("Pinging MySQL");

        let target = MySqlTarget::connect_url(&self.conn_str, PING_POOL_SIZE)
            .await
            .inspect_err(|e| error!(error = %e, "MySQL connection failed"))?;
        let result = target.ping().await;
        target.close().await;
        result.inspect_err(|e| error!(error = %e, "MySQL ping failed"))?;

        info!("MySQL ping succeeded");
        Ok(())
    }
}

#[async_trait]
impl ConnectionPinger for PostgresConnectionPinger {
    async fn ping(&self) -> Result<(), CliError> {
        info!("Pinging Postgres");

        let source = PgSource::connect_url(&self.conn_str, PING_POOL_SIZE)
            .await
            .inspect_err(|e| error!(error = %e, "Postgres connection failed"))?;
        let result = source.ping().await;
        source.close().await;
        result.inspect_err(|e| error!(error = %e, "Postgres ping failed"))?;

        info!("Postgres ping succeeded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_kind_aliases() {
        assert_eq!("MariaDB".parse::<ConnectionKind>(), Ok(ConnectionKind::MySql));
        assert_eq!("pg".parse::<ConnectionKind>(), Ok(ConnectionKind::Postgres));
        assert_eq!("postgresql".parse::<ConnectionKind>(), Ok(ConnectionKind::Postgres));
        assert!("ftp".parse::<ConnectionKind>().is_err());
    }
}
