use crate::{error::WriterError, retry::classify_db_error};
use connectors::sql::base::destination::TargetStore;
use engine_core::retry::RetryPolicy;
use model::{core::value::Value, records::batch::InsertBatch};
use std::{sync::Arc, time::Instant};
use tracing::{debug, error, info, warn};

/// Error messages kept per report; the rest are only logged.
pub const MAX_RECORDED_ERRORS: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub inserted: u64,
    pub failed: u64,
    pub chunks: u64,
    /// Chunks that had to be retried row by row.
    pub fallbacks: u64,
    /// Ids of rows that could not be inserted, when the batch has an id column.
    pub failed_ids: Vec<i64>,
    pub errors: Vec<String>,
}

impl WriteReport {
    fn record(&mut self, err: WriterError) {
        if self.errors.len() < MAX_RECORDED_ERRORS {
            self.errors.push(err.to_string());
        }
    }
}

/// Writes rows with multi-row INSERTs, falling back to one INSERT per row
/// when a chunk fails. Failures are reported, never propagated.
#[derive(Clone)]
pub struct BatchWriter {
    target: Arc<dyn TargetStore>,
    retry: RetryPolicy,
    id_column: String,
}

impl BatchWriter {
    pub fn new(target: Arc<dyn TargetStore>, retry: RetryPolicy) -> Self {
        Self {
            target,
            retry,
            id_column: "id".to_string(),
        }
    }

    pub fn with_id_column(mut self, id_column: &str) -> Self {
        self.id_column = id_column.to_string();
        self
    }

    pub async fn insert_batch(&self, batch: &InsertBatch, batch_size: usize) -> WriteReport {
        let mut report = WriteReport::default();
        if batch.is_empty() {
            return report;
        }

        let chunk_size = batch.effective_chunk_size(batch_size);
        if chunk_size < batch_size {
            debug!(
                table = %batch.table,
                requested = batch_size,
                chunk_size,
                columns = batch.columns.len(),
                "Chunk size reduced to stay under the placeholder limit"
            );
        }

        for (index, rows) in batch.chunks(batch_size).enumerate() {
            report.chunks += 1;
            let chunk = InsertBatch {
                table: batch.table.clone(),
                columns: batch.columns.clone(),
                rows: rows.to_vec(),
            };
            self.write_chunk(index, &chunk, &mut report).await;
        }

        info!(
            table = %batch.table,
            inserted = report.inserted,
            failed = report.failed,
            chunks = report.chunks,
            fallbacks = report.fallbacks,
            "Batch insert finished"
        );
        report
    }

    async fn write_chunk(&self, index: usize, chunk: &InsertBatch, report: &mut WriteReport) {
        let start = Instant::now();

        let result = self
            .retry
            .run_observed(
                || {
                    let target = self.target.clone();
                    async move { target.insert_rows(chunk).await }
                },
                classify_db_error,
                |err, attempt| {
                    warn!(table = %chunk.table, chunk = index, attempt, error = %err, "Chunk insert failed")
                },
            )
            .await;

        match result {
            Ok(affected) => {
                let duration = start.elapsed();
                let rows_per_sec = chunk.len() as f64 / duration.as_secs_f64().max(f64::EPSILON);
                report.inserted += affected;
                info!(
                    table = %chunk.table,
                    chunk = index,
                    rows = chunk.len(),
                    duration_ms = duration.as_millis() as u64,
                    rows_per_sec = %format!("{:.2}", rows_per_sec),
                    "Chunk inserted"
                );
            }
            Err(err) => {
                let err = WriterError::Chunk {
                    table: chunk.table.clone(),
                    rows: chunk.len(),
                    source: err,
                };
                error!(error = %err, "Falling back to row-by-row inserts");
                report.fallbacks += 1;
                report.record(err);
                self.write_rows(chunk, report).await;
            }
        }
    }

    async fn write_rows(&self, chunk: &InsertBatch, report: &mut WriteReport) {
        let id_index = chunk.columns.iter().position(|c| *c == self.id_column);

        for values in &chunk.rows {
            let row = InsertBatch {
                table: chunk.table.clone(),
                columns: chunk.columns.clone(),
                rows: vec![values.clone()],
            };
            let single = &row;

            let result = self
                .retry
                .run(
                    || {
                        let target = self.target.clone();
                        async move { target.insert_rows(single).await }
                    },
                    classify_db_error,
                )
                .await;

            match result {
                Ok(affected) => report.inserted += affected,
                Err(err) => {
                    let id = id_index.and_then(|i| values.get(i)).and_then(Value::as_i64);
                    let err = WriterError::Row {
                        table: chunk.table.clone(),
                        id: id.map_or_else(|| "?".to_string(), |id| id.to_string()),
                        source: err,
                    };
                    warn!(error = %err, "Row insert failed");
                    report.failed += 1;
                    report.failed_ids.extend(id);
                    report.record(err);
                }
            }
        }
    }
}
