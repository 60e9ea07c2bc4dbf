//! In-process stores with the same contracts as the PostgreSQL source and
//! the MySQL target. They back dry pipeline runs in tests and can be told to
//! fail specific statements.

use crate::sql::{
    base::{
        destination::TargetStore, error::DbError, requests::FetchRowsRequest, source::SourceStore,
    },
    mysql::ddl::create_table_sql,
};
use async_trait::async_trait;
use model::{
    core::value::{FieldValue, Value},
    entity::EntityKind,
    records::{batch::InsertBatch, row::RowData},
};
use mysql_async::ServerError;
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, HashSet},
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering},
    },
};

const ER_DUP_ENTRY: u16 = 1062;
const ER_TRUNCATED_WRONG_VALUE: u16 = 1366;
const ER_TABLEACCESS_DENIED: u16 = 1142;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Orders two values of the same logical kind; `None` when incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Float(_), _) | (_, Value::Float(_)) => as_f64(a)?.partial_cmp(&as_f64(b)?),
        _ => match (a.as_timestamp(), b.as_timestamp()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => match (a.as_str(), b.as_str()) {
                (Some(x), Some(y)) => Some(x.cmp(y)),
                _ => None,
            },
        },
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        other => other.as_i64().map(|i| i as f64),
    }
}

#[derive(Debug, Default)]
pub struct MemorySource {
    tables: Mutex<HashMap<String, Vec<RowData>>>,
    failing_fetches: AtomicUsize,
    broken_tables: Mutex<HashSet<String>>,
    fetches: AtomicUsize,
    closes: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, table: &str, rows: Vec<RowData>) {
        lock(&self.tables)
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// The next `count` fetches fail with a non-retryable error.
    pub fn fail_next_fetches(&self, count: usize) {
        self.failing_fetches.store(count, AtomicOrdering::SeqCst);
    }

    /// Every fetch from `table` fails with a non-retryable error until
    /// [`MemorySource::repair_table`] is called.
    pub fn break_table(&self, table: &str) {
        lock(&self.broken_tables).insert(table.to_string());
    }

    pub fn repair_table(&self, table: &str) {
        lock(&self.broken_tables).remove(table);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(AtomicOrdering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(AtomicOrdering::SeqCst)
    }
}

#[async_trait]
impl SourceStore for MemorySource {
    async fn fetch_rows(&self, request: FetchRowsRequest) -> Result<Vec<RowData>, DbError> {
        self.fetches.fetch_add(1, AtomicOrdering::SeqCst);
        let injected = self
            .failing_fetches
            .fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected || lock(&self.broken_tables).contains(&request.table) {
            return Err(DbError::Unknown(format!(
                "injected read failure on {}",
                request.table
            )));
        }

        let tables = lock(&self.tables);
        let Some(rows) = tables.get(&request.table) else {
            return Ok(Vec::new());
        };

        let mut selected: Vec<&RowData> = rows
            .iter()
            .filter(|row| match &request.newer_than {
                Some(bound) => compare_values(&row.get_value(&bound.column), &bound.value)
                    == Some(Ordering::Greater),
                None => true,
            })
            .filter(|row| match &request.id_floor {
                Some(floor) => row
                    .get_value(&floor.column)
                    .as_i64()
                    .is_some_and(|id| id >= floor.min_id),
                None => true,
            })
            .collect();

        if let Some(order) = &request.order_by {
            selected.sort_by(|a, b| {
                compare_values(&a.get_value(order), &b.get_value(order)).unwrap_or(Ordering::Equal)
            });
        }

        Ok(selected
            .into_iter()
            .map(|row| {
                let fields = request
                    .columns
                    .iter()
                    .map(|c| FieldValue::new(c, row.get_value(c)))
                    .collect();
                RowData::new(&request.table, fields)
            })
            .collect())
    }

    async fn count_rows(&self, table: &str) -> Result<u64, DbError> {
        Ok(lock(&self.tables).get(table).map_or(0, |rows| rows.len() as u64))
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, AtomicOrdering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct MemoryTarget {
    tables: Mutex<HashMap<String, BTreeMap<i64, RowData>>>,
    rejected_ids: Mutex<HashSet<i64>>,
    transient_failures: AtomicUsize,
    ddl_denied: AtomicBool,
    insert_statements: AtomicUsize,
    existence_queries: AtomicUsize,
    closes: AtomicUsize,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates `table`; rows without an integer `id` are ignored.
    pub fn seed(&self, table: &str, rows: Vec<RowData>) {
        let mut tables = lock(&self.tables);
        let stored = tables.entry(table.to_string()).or_default();
        for row in rows {
            if let Some(id) = row.get_value("id").as_i64() {
                stored.insert(id, row);
            }
        }
    }

    /// Any statement carrying one of `ids` fails as a data error.
    pub fn reject_ids(&self, ids: &[i64]) {
        lock(&self.rejected_ids).extend(ids.iter().copied());
    }

    /// The next `count` insert statements fail with a connection error.
    pub fn fail_next_inserts(&self, count: usize) {
        self.transient_failures.store(count, AtomicOrdering::SeqCst);
    }

    /// Every `CREATE TABLE` fails as a permission error.
    pub fn deny_ddl(&self) {
        self.ddl_denied.store(true, AtomicOrdering::SeqCst);
    }

    pub fn rows(&self, table: &str) -> Vec<RowData> {
        lock(&self.tables)
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn ids(&self, table: &str) -> Vec<i64> {
        lock(&self.tables)
            .get(table)
            .map(|rows| rows.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn has_table(&self, table: &str) -> bool {
        lock(&self.tables).contains_key(table)
    }

    pub fn insert_statements(&self) -> usize {
        self.insert_statements.load(AtomicOrdering::SeqCst)
    }

    pub fn existence_queries(&self) -> usize {
        self.existence_queries.load(AtomicOrdering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(AtomicOrdering::SeqCst)
    }
}

fn server_error(code: u16, state: &str, message: String) -> DbError {
    DbError::MySql(mysql_async::Error::Server(ServerError {
        code,
        message,
        state: state.to_string(),
    }))
}

#[async_trait]
impl TargetStore for MemoryTarget {
    async fn max_value(&self, table: &str, column: &str) -> Result<Value, DbError> {
        let tables = lock(&self.tables);
        let max = tables
            .get(table)
            .into_iter()
            .flat_map(|rows| rows.values())
            .map(|row| row.get_value(column))
            .filter(|v| !v.is_null())
            .max_by(|a, b| compare_values(a, b).unwrap_or(Ordering::Equal));
        Ok(max.unwrap_or(Value::Null))
    }

    async fn existing_keys(
        &self,
        table: &str,
        _id_column: &str,
        ids: &[i64],
    ) -> Result<HashSet<i64>, DbError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        self.existence_queries.fetch_add(1, AtomicOrdering::SeqCst);

        let tables = lock(&self.tables);
        Ok(match tables.get(table) {
            Some(rows) => ids.iter().copied().filter(|id| rows.contains_key(id)).collect(),
            None => HashSet::new(),
        })
    }

    async fn insert_rows(&self, batch: &InsertBatch) -> Result<u64, DbError> {
        if batch.is_empty() {
            return Ok(0);
        }
        self.insert_statements.fetch_add(1, AtomicOrdering::SeqCst);

        if self
            .transient_failures
            .fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(DbError::MySql(mysql_async::Error::from(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "injected connection reset",
            ))));
        }

        let id_index = batch
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case("id"))
            .ok_or_else(|| DbError::Write(format!("no id column in insert into {}", batch.table)))?;

        let rejected = lock(&self.rejected_ids).clone();
        let mut tables = lock(&self.tables);
        let stored = tables.entry(batch.table.clone()).or_default();

        // A statement is atomic: validate every row before applying any.
        let mut seen = HashSet::new();
        let mut staged = Vec::with_capacity(batch.len());
        for values in &batch.rows {
            let id = values
                .get(id_index)
                .and_then(Value::as_i64)
                .ok_or_else(|| DbError::Write(format!("null id in insert into {}", batch.table)))?;
            if rejected.contains(&id) {
                return Err(server_error(
                    ER_TRUNCATED_WRONG_VALUE,
                    "HY000",
                    format!("Incorrect value in row with id {id}"),
                ));
            }
            if stored.contains_key(&id) || !seen.insert(id) {
                return Err(server_error(
                    ER_DUP_ENTRY,
                    "23000",
                    format!("Duplicate entry '{id}' for key 'PRIMARY'"),
                ));
            }

            let fields = batch
                .columns
                .iter()
                .zip(values)
                .map(|(name, value)| FieldValue::new(name, value.clone()))
                .collect();
            staged.push((id, RowData::new(&batch.table, fields)));
        }

        let inserted = staged.len() as u64;
        stored.extend(staged);
        Ok(inserted)
    }

    async fn count_rows(&self, table: &str) -> Result<u64, DbError> {
        Ok(lock(&self.tables).get(table).map_or(0, |rows| rows.len() as u64))
    }

    async fn ensure_table(&self, entity: EntityKind) -> Result<bool, DbError> {
        if create_table_sql(entity).is_none() {
            return Ok(false);
        }
        if self.ddl_denied.load(AtomicOrdering::SeqCst) {
            return Err(server_error(
                ER_TABLEACCESS_DENIED,
                "42000",
                format!("CREATE command denied for table '{}'", entity.table()),
            ));
        }
        lock(&self.tables).entry(entity.table().to_string()).or_default();
        Ok(true)
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, AtomicOrdering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::base::requests::FetchRowsRequestBuilder;
    use chrono::{TimeZone, Utc};

    fn row(table: &str, id: i64, created_secs: i64) -> RowData {
        RowData::new(
            table,
            vec![
                FieldValue::new("id", Value::Int(id)),
                FieldValue::new(
                    "created_at",
                    Value::Timestamp(Utc.timestamp_opt(created_secs, 0).unwrap()),
                ),
            ],
        )
    }

    #[tokio::test]
    async fn source_filters_strictly_newer_and_orders() {
        let source = MemorySource::new();
        source.insert("threads", vec![row("threads", 2, 300), row("threads", 1, 100), row("threads", 3, 200)]);

        let request = FetchRowsRequestBuilder::new("threads")
            .columns(&["id", "created_at"])
            .newer_than("created_at", Value::Timestamp(Utc.timestamp_opt(100, 0).unwrap()))
            .build();
        let rows = source.fetch_rows(request).await.unwrap();
        let ids: Vec<i64> = rows.iter().filter_map(|r| r.get_value("id").as_i64()).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[tokio::test]
    async fn target_statement_is_atomic_on_duplicate() {
        let target = MemoryTarget::new();
        target.seed("users", vec![row("users", 1, 0)]);

        let batch = InsertBatch::new(
            "users",
            &["id"],
            vec![vec![Value::Int(2)], vec![Value::Int(1)]],
        );
        assert!(target.insert_rows(&batch).await.is_err());
        assert_eq!(target.ids("users"), vec![1]);
    }

    #[tokio::test]
    async fn target_existence_skips_query_for_empty_input() {
        let target = MemoryTarget::new();
        assert!(target.existing_keys("users", "id", &[]).await.unwrap().is_empty());
        assert_eq!(target.existence_queries(), 0);
    }

    #[tokio::test]
    async fn target_max_value_of_empty_table_is_null() {
        let target = MemoryTarget::new();
        assert_eq!(target.max_value("users", "created_at").await.unwrap(), Value::Null);
        target.seed("users", vec![row("users", 1, 50), row("users", 2, 70)]);
        assert_eq!(
            target.max_value("users", "created_at").await.unwrap(),
            Value::Timestamp(Utc.timestamp_opt(70, 0).unwrap())
        );
    }

    #[test]
    fn compare_mixed_numbers() {
        assert_eq!(compare_values(&Value::Int(2), &Value::Float(1.5)), Some(Ordering::Greater));
        assert_eq!(compare_values(&Value::Float(1.5), &Value::Int(2)), Some(Ordering::Less));
        assert_eq!(compare_values(&Value::Null, &Value::Int(2)), None);
    }
}
