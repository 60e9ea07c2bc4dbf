use crate::sql::{
    base::{
        destination::TargetStore,
        endpoint::{Endpoint, TlsMode},
        error::{ConnectorError, DbError},
        query::generator::QueryGenerator,
    },
    mysql::{
        ddl::create_table_sql,
        params::MySqlParamStore,
        row::{from_mysql_value, to_i64},
    },
};
use async_trait::async_trait;
use model::{core::value::Value, entity::EntityKind, records::batch::InsertBatch};
use mysql_async::{
    Conn, Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts, SslOpts, Value as MySqlValue,
    prelude::Queryable,
};
use planner::query::dialect;
use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tracing::{debug, info, warn};

/// Ids per `IN (...)` lookup.
pub const EXISTENCE_CHUNK_SIZE: usize = 1_000;

/// Pooled writer over the forum's MariaDB/MySQL database.
#[derive(Clone)]
pub struct MySqlTarget {
    pool: Pool,
    dialect: dialect::MySql,
    closed: Arc<AtomicBool>,
}

impl MySqlTarget {
    pub async fn connect(endpoint: &Endpoint) -> Result<Self, ConnectorError> {
        let mut builder = OptsBuilder::default()
            .ip_or_hostname(&endpoint.host)
            .tcp_port(endpoint.port)
            .user(Some(&endpoint.user))
            .pass(Some(&endpoint.password))
            .db_name(Some(&endpoint.database));

        match endpoint.tls {
            TlsMode::Disable => {}
            TlsMode::Prefer => {
                builder = builder.ssl_opts(SslOpts::default().with_danger_accept_invalid_certs(true))
            }
            TlsMode::Require => builder = builder.ssl_opts(SslOpts::default()),
        }

        let target = Self::from_builder(builder, endpoint.max_connections).await?;
        info!(endpoint = %endpoint.describe(), "Connected to MySQL target");
        Ok(target)
    }

    pub async fn connect_url(url: &str, max_connections: usize) -> Result<Self, ConnectorError> {
        let opts = Opts::from_url(url).map_err(|e| ConnectorError::InvalidUrl(e.to_string()))?;
        Self::from_builder(OptsBuilder::from_opts(opts), max_connections).await
    }

    async fn from_builder(
        builder: OptsBuilder,
        max_connections: usize,
    ) -> Result<Self, ConnectorError> {
        let constraints = PoolConstraints::new(1, max_connections)
            .ok_or(ConnectorError::InvalidPoolSize(max_connections))?;

        let opts: Opts = builder
            .init(vec!["SET NAMES utf8mb4"])
            .pool_opts(PoolOpts::new().with_constraints(constraints))
            .into();
        let pool = Pool::new(opts);

        // Fail fast on bad credentials instead of at the first write.
        let mut conn = pool.get_conn().await?;
        conn.query_drop("SELECT 1").await?;
        drop(conn);

        Ok(MySqlTarget {
            pool,
            dialect: dialect::MySql,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    async fn conn(&self) -> Result<Conn, DbError> {
        Ok(self.pool.get_conn().await?)
    }

    async fn scalar(&self, sql: &str, params: Vec<Value>) -> Result<Value, DbError> {
        let mut conn = self.conn().await?;
        let value: Option<MySqlValue> = conn
            .exec_first(sql, MySqlParamStore::from_values(&params).params())
            .await?;
        Ok(value.map(from_mysql_value).unwrap_or(Value::Null))
    }
}

#[async_trait]
impl TargetStore for MySqlTarget {
    async fn max_value(&self, table: &str, column: &str) -> Result<Value, DbError> {
        let (sql, params) = QueryGenerator::new(&self.dialect).max(table, column);
        self.scalar(&sql, params).await
    }

    async fn existing_keys(
        &self,
        table: &str,
        id_column: &str,
        ids: &[i64],
    ) -> Result<HashSet<i64>, DbError> {
        let mut found = HashSet::new();
        if ids.is_empty() {
            return Ok(found);
        }

        let generator = QueryGenerator::new(&self.dialect);
        let mut conn = self.conn().await?;
        for chunk in ids.chunks(EXISTENCE_CHUNK_SIZE) {
            let (sql, params) = generator.existing_ids(table, id_column, chunk);
            let rows: Vec<MySqlValue> = conn
                .exec(sql, MySqlParamStore::from_values(&params).params())
                .await?;
            found.extend(rows.into_iter().filter_map(to_i64));
        }

        debug!(table, candidates = ids.len(), existing = found.len(), "Existence check done");
        Ok(found)
    }

    async fn insert_rows(&self, batch: &InsertBatch) -> Result<u64, DbError> {
        let (sql, params) = QueryGenerator::new(&self.dialect).insert_batch(batch);
        if sql.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn().await?;
        conn.exec_drop(sql, MySqlParamStore::from_values(&params).params())
            .await?;
        Ok(conn.affected_rows())
    }

    async fn count_rows(&self, table: &str) -> Result<u64, DbError> {
        let (sql, params) = QueryGenerator::new(&self.dialect).count(table);
        let count = self.scalar(&sql, params).await?;
        count
            .as_i64()
            .map(|n| n.max(0) as u64)
            .ok_or_else(|| DbError::Unknown(format!("non-numeric row count for {table}: {count}")))
    }

    async fn ensure_table(&self, entity: EntityKind) -> Result<bool, DbError> {
        let Some(sql) = create_table_sql(entity) else {
            return Ok(false);
        };

        let mut conn = self.conn().await?;
        conn.query_drop(sql).await?;
        info!(table = %entity, "Ensured target table exists");
        Ok(true)
    }

    async fn ping(&self) -> Result<(), DbError> {
        let mut conn = self.conn().await?;
        conn.ping().await?;
        Ok(())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.pool.clone().disconnect().await {
            Ok(()) => debug!("MySQL target pool closed"),
            Err(err) => warn!(error = %err, "Failed to close MySQL target pool"),
        }
    }
}
