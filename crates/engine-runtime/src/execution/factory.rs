use crate::error::MigrationError;
use connectors::sql::{
    base::{destination::TargetStore, source::SourceStore},
    mysql::adapter::MySqlTarget,
    postgres::adapter::PgSource,
};
use engine_config::settings::{connection::ConnectionSettings, transform::TransformSettings};
use engine_core::retry::RetryPolicy;
use engine_processing::{
    retry::classify_connector_error,
    transform::{cleanse::ForbiddenDomain, pipeline::RowTransformer},
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// The two pool handles a run owns.
#[derive(Clone)]
pub struct Stores {
    pub source: Arc<dyn SourceStore>,
    pub target: Arc<dyn TargetStore>,
}

impl Stores {
    pub fn new(source: Arc<dyn SourceStore>, target: Arc<dyn TargetStore>) -> Self {
        Stores { source, target }
    }

    pub async fn close(&self) {
        self.source.close().await;
        self.target.close().await;
    }
}

/// Hands a run its pools. The orchestrator calls this once per run and
/// releases whatever it returns.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Stores, MigrationError>;
}

/// Already-open stores are handed out as they are.
#[async_trait]
impl StoreConnector for Stores {
    async fn connect(&self) -> Result<Stores, MigrationError> {
        Ok(self.clone())
    }
}

/// Opens PostgreSQL and MariaDB pools from connection settings.
pub struct PoolConnector {
    settings: ConnectionSettings,
}

impl PoolConnector {
    pub fn new(settings: ConnectionSettings) -> Self {
        PoolConnector { settings }
    }
}

#[async_trait]
impl StoreConnector for PoolConnector {
    async fn connect(&self) -> Result<Stores, MigrationError> {
        connect(&self.settings).await
    }
}

/// Opens the source and target pools, retrying transient connection
/// failures. If the target cannot be reached the source pool is released
/// before returning.
pub async fn connect(settings: &ConnectionSettings) -> Result<Stores, MigrationError> {
    let retry = RetryPolicy::for_network();

    let source = retry
        .run_observed(
            || PgSource::connect(&settings.source),
            classify_connector_error,
            |err, attempt| warn!(attempt, error = %err, "Source connection attempt failed"),
        )
        .await
        .map_err(|source| MigrationError::Connect {
            role: "source",
            source,
        })?;

    let target = match retry
        .run_observed(
            || MySqlTarget::connect(&settings.target),
            classify_connector_error,
            |err, attempt| warn!(attempt, error = %err, "Target connection attempt failed"),
        )
        .await
    {
        Ok(target) => target,
        Err(err) => {
            source.close().await;
            return Err(MigrationError::Connect {
                role: "target",
                source: err,
            });
        }
    };

    Ok(Stores::new(Arc::new(source), Arc::new(target)))
}

pub fn create_transformer(settings: &TransformSettings) -> Result<RowTransformer, MigrationError> {
    let domain = ForbiddenDomain::new(&settings.forbidden_domain).map_err(|e| {
        MigrationError::InitializationError(format!(
            "invalid forbidden domain {:?}: {e}",
            settings.forbidden_domain
        ))
    })?;
    Ok(RowTransformer::new(domain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::memory::{MemorySource, MemoryTarget};
    use engine_config::settings::transform::DEFAULT_FORBIDDEN_DOMAIN;

    #[tokio::test]
    async fn test_close_releases_both_pools() {
        let source = Arc::new(MemorySource::new());
        let target = Arc::new(MemoryTarget::new());
        Stores::new(source.clone(), target.clone()).close().await;

        assert_eq!(source.close_count(), 1);
        assert_eq!(target.close_count(), 1);
    }

    #[tokio::test]
    async fn test_open_stores_connect_to_themselves() {
        let source = Arc::new(MemorySource::new());
        let target = Arc::new(MemoryTarget::new());
        let stores = Stores::new(source.clone(), target.clone());

        let connected = stores.connect().await.unwrap();
        connected.close().await;

        assert_eq!(source.close_count(), 1);
        assert_eq!(target.close_count(), 1);
    }

    #[test]
    fn test_transformer_uses_configured_domain() {
        let transformer = create_transformer(&TransformSettings::default()).unwrap();
        assert_eq!(transformer.forbidden_domain().domain(), DEFAULT_FORBIDDEN_DOMAIN);
    }

    #[test]
    fn test_empty_forbidden_domain_is_an_initialization_error() {
        let settings = TransformSettings {
            forbidden_domain: String::new(),
        };
        assert!(matches!(
            create_transformer(&settings),
            Err(MigrationError::InitializationError(_))
        ));
    }
}
