use crate::sql::{
    base::{
        endpoint::Endpoint,
        error::{ConnectorError, DbError},
        query::generator::{AGGREGATE_ALIAS, QueryGenerator},
        requests::FetchRowsRequest,
        source::SourceStore,
    },
    postgres::{
        params::PgParamStore,
        row::to_row_data,
        utils::{build_pool, config_from_endpoint, config_from_url, warn_if_plaintext},
    },
};
use async_trait::async_trait;
use deadpool_postgres::Pool;
use model::records::row::RowData;
use planner::query::dialect;
use std::time::Instant;
use tokio_postgres::Config;
use tracing::{debug, info};

/// Pooled reader over the scraper's PostgreSQL database.
#[derive(Clone)]
pub struct PgSource {
    pool: Pool,
    dialect: dialect::Postgres,
}

impl PgSource {
    pub async fn connect(endpoint: &Endpoint) -> Result<Self, ConnectorError> {
        let source = Self::from_config(config_from_endpoint(endpoint), endpoint.max_connections)
            .await?;
        info!(endpoint = %endpoint.describe(), "Connected to PostgreSQL source");
        Ok(source)
    }

    pub async fn connect_url(url: &str, max_connections: usize) -> Result<Self, ConnectorError> {
        Self::from_config(config_from_url(url)?, max_connections).await
    }

    async fn from_config(config: Config, max_connections: usize) -> Result<Self, ConnectorError> {
        warn_if_plaintext(&config);
        let pool = build_pool(config, max_connections)?;

        // Fail fast on bad credentials instead of at the first read.
        let client = pool.get().await?;
        client.simple_query("SELECT 1").await?;

        Ok(PgSource {
            pool,
            dialect: dialect::Postgres,
        })
    }
}

#[async_trait]
impl SourceStore for PgSource {
    async fn fetch_rows(&self, request: FetchRowsRequest) -> Result<Vec<RowData>, DbError> {
        let generator = QueryGenerator::new(&self.dialect);
        let (sql, params) = generator.select(&request);
        debug!(sql = %sql, params = params.len(), "Fetching source rows");

        let started = Instant::now();
        let client = self.pool.get().await?;
        let statement = client.prepare(&sql).await?;
        let bindings = PgParamStore::for_statement(params, statement.params());
        let rows = client.query(&statement, &bindings.as_refs()).await?;

        let result = rows
            .iter()
            .map(|row| to_row_data(row, &request.table))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            table = %request.table,
            rows = result.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Source rows fetched"
        );
        Ok(result)
    }

    async fn count_rows(&self, table: &str) -> Result<u64, DbError> {
        let (sql, _) = QueryGenerator::new(&self.dialect).count(table);
        let client = self.pool.get().await?;
        let row = client.query_one(&sql, &[]).await?;
        let count: i64 = row.try_get(AGGREGATE_ALIAS)?;
        Ok(count.max(0) as u64)
    }

    async fn ping(&self) -> Result<(), DbError> {
        let client = self.pool.get().await?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close();
            debug!("PostgreSQL source pool closed");
        }
    }
}
