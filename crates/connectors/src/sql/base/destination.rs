use crate::sql::base::error::DbError;
use async_trait::async_trait;
use model::{core::value::Value, entity::EntityKind, records::batch::InsertBatch};
use std::collections::HashSet;

/// Write side of a sync run: the forum database.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// `MAX(column)`; `Value::Null` for an empty table.
    async fn max_value(&self, table: &str, column: &str) -> Result<Value, DbError>;

    /// Subset of `ids` already present in `table`. An empty `ids` slice
    /// returns an empty set without touching the database.
    async fn existing_keys(
        &self,
        table: &str,
        id_column: &str,
        ids: &[i64],
    ) -> Result<HashSet<i64>, DbError>;

    /// Inserts every row of `batch` with a single statement and returns the
    /// number of affected rows.
    async fn insert_rows(&self, batch: &InsertBatch) -> Result<u64, DbError>;

    async fn count_rows(&self, table: &str) -> Result<u64, DbError>;

    /// Creates the table for `entity` when it is missing. Returns `false`
    /// for entities whose tables are owned by the forum software.
    async fn ensure_table(&self, entity: EntityKind) -> Result<bool, DbError>;

    async fn ping(&self) -> Result<(), DbError>;

    /// Releases pooled connections. Calling it more than once is harmless.
    async fn close(&self);
}
