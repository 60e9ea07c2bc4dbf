use crate::{
    error::{MigratorError, Stage},
    retry::classify_db_error,
};
use connectors::sql::base::{
    requests::{FetchRowsRequest, FetchRowsRequestBuilder},
    source::SourceStore,
};
use engine_core::retry::RetryPolicy;
use model::{core::watermark::Watermark, entity::schema::EntitySchema, records::row::RowData};
use std::sync::Arc;
use tracing::{debug, warn};

/// Reads the rows of one entity that are newer than a watermark.
#[derive(Clone)]
pub struct SourceReader {
    source: Arc<dyn SourceStore>,
    retry: RetryPolicy,
}

impl SourceReader {
    pub fn new(source: Arc<dyn SourceStore>, retry: RetryPolicy) -> Self {
        Self { source, retry }
    }

    /// Builds the read for `schema`: the fixed column projection, rows with
    /// a watermark strictly greater than `watermark`, and `id >= from_id`.
    /// Entities without a watermark column are read in full, by id.
    pub fn request(
        schema: &EntitySchema,
        watermark: Option<Watermark>,
        from_id: Option<i64>,
    ) -> FetchRowsRequest {
        let builder = FetchRowsRequestBuilder::new(schema.table)
            .columns(schema.columns)
            .id_floor(schema.id_column, from_id);

        match (schema.watermark, watermark) {
            (Some(column), Some(watermark)) => builder
                .newer_than(column.column, watermark.to_value(column.kind))
                .build(),
            _ => builder.order_by(schema.id_column).build(),
        }
    }

    /// Fetch with automatic retry on transient failures.
    pub async fn fetch(
        &self,
        schema: &EntitySchema,
        watermark: Option<Watermark>,
        from_id: Option<i64>,
    ) -> Result<Vec<RowData>, MigratorError> {
        let request = Self::request(schema, watermark, from_id);
        let table = schema.table;

        let rows = self
            .retry
            .run_observed(
                || {
                    let source = self.source.clone();
                    let request = request.clone();
                    async move { source.fetch_rows(request).await }
                },
                classify_db_error,
                |err, attempt| warn!(table, attempt, error = %err, "Source read failed"),
            )
            .await
            .map_err(|e| MigratorError::from_retry(Stage::Read, table, e))?;

        debug!(table, rows = rows.len(), watermark = ?watermark.map(|w| w.to_string()), "Source rows read");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::{memory::MemorySource, sql::base::requests::IdFloor};
    use model::{
        core::{
            value::{FieldValue, Value},
            watermark::WatermarkKind,
        },
        entity::EntityKind,
    };
    use std::time::Duration;

    #[test]
    fn test_request_uses_column_native_watermark() {
        let wm = Watermark::from_epoch_secs(1_700_000_000);

        let threads = SourceReader::request(EntityKind::Threads.schema(), Some(wm), Some(50));
        let bound = threads.newer_than.unwrap();
        assert_eq!(bound.column, "created_at");
        assert_eq!(bound.value, wm.to_value(WatermarkKind::Timestamp));
        assert_eq!(threads.order_by.as_deref(), Some("created_at"));
        assert_eq!(
            threads.id_floor,
            Some(IdFloor {
                column: "id".into(),
                min_id: 50
            })
        );

        let drizzle = SourceReader::request(EntityKind::DrizzleMigrations.schema(), Some(wm), None);
        assert_eq!(drizzle.newer_than.unwrap().value, Value::Int(1_700_000_000_000));
    }

    #[test]
    fn test_full_read_entities_order_by_id() {
        let forums = SourceReader::request(EntityKind::Forums.schema(), None, None);
        assert!(forums.newer_than.is_none());
        assert_eq!(forums.order_by.as_deref(), Some("id"));
        assert_eq!(
            forums.columns,
            vec!["id", "name", "link", "threads_pages_count", "parent_forum_id"]
        );
    }

    #[tokio::test]
    async fn test_fatal_read_error_is_not_retried() {
        let source = Arc::new(MemorySource::new());
        source.insert(
            "forums",
            vec![RowData::new("forums", vec![FieldValue::new("id", Value::Int(1))])],
        );
        source.fail_next_fetches(1);

        let reader = SourceReader::new(source.clone(), RetryPolicy::fixed(3, Duration::ZERO));
        let err = reader
            .fetch(EntityKind::Forums.schema(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, MigratorError::Database { stage: Stage::Read, .. }));
        assert_eq!(source.fetch_count(), 1);

        let rows = reader.fetch(EntityKind::Forums.schema(), None, None).await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
