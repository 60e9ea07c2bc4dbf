//! Per-entity sync: watermark, read, filter, transform, write.

use crate::{
    consumer::writer::BatchWriter,
    error::{MigratorError, Stage},
    filter::existence::ExistenceFilter,
    producer::reader::SourceReader,
    retry::classify_db_error,
    transform::pipeline::{RowTransformer, Transformed},
};
use connectors::sql::base::{destination::TargetStore, source::SourceStore};
use engine_config::{report::summary::EntityReport, settings::SyncSettings};
use engine_core::retry::RetryPolicy;
use model::{
    core::watermark::Watermark,
    entity::{EntityKind, schema::EntitySchema},
    records::{batch::InsertBatch, row::RowData},
};
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, info, warn};

/// Run parameters a migrator honors.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrateOptions {
    pub batch_size: usize,
    pub from_id: Option<i64>,
    pub since: Option<Watermark>,
    pub dry_run: bool,
}

impl From<&SyncSettings> for MigrateOptions {
    fn from(settings: &SyncSettings) -> Self {
        MigrateOptions {
            batch_size: settings.batch_size,
            from_id: settings.from_id,
            since: settings.since,
            dry_run: settings.dry_run,
        }
    }
}

pub struct EntityMigrator {
    target: Arc<dyn TargetStore>,
    reader: SourceReader,
    filter: ExistenceFilter,
    writer: BatchWriter,
    transformer: RowTransformer,
    retry: RetryPolicy,
    options: MigrateOptions,
}

impl EntityMigrator {
    pub fn new(
        source: Arc<dyn SourceStore>,
        target: Arc<dyn TargetStore>,
        transformer: RowTransformer,
        retry: RetryPolicy,
        options: MigrateOptions,
    ) -> Self {
        EntityMigrator {
            reader: SourceReader::new(source, retry.clone()),
            filter: ExistenceFilter::new(target.clone(), retry.clone()),
            writer: BatchWriter::new(target.clone(), retry.clone()),
            target,
            transformer,
            retry,
            options,
        }
    }

    pub fn options(&self) -> &MigrateOptions {
        &self.options
    }

    /// Watermark to read from: the newest value already in the target, the
    /// epoch for an empty table, raised to `since` when configured. `None`
    /// for entities that are read in full.
    pub async fn watermark(&self, schema: &EntitySchema) -> Result<Option<Watermark>, MigratorError> {
        let Some(column) = schema.watermark else {
            return Ok(None);
        };
        let table = schema.table;

        let latest = self
            .retry
            .run_observed(
                || {
                    let target = self.target.clone();
                    async move { target.max_value(table, column.column).await }
                },
                classify_db_error,
                |err, attempt| warn!(table, attempt, error = %err, "Watermark lookup failed"),
            )
            .await
            .map_err(|e| MigratorError::from_retry(Stage::Watermark, table, e))?;

        let target_mark = Watermark::from_value(&latest, column.kind)
            .map_err(|source| MigratorError::Watermark {
                table: table.to_string(),
                source,
            })?
            .unwrap_or(Watermark::EPOCH);

        let watermark = match self.options.since {
            Some(since) if since > target_mark => since,
            _ => target_mark,
        };

        info!(table, latest = %target_mark, effective = %watermark, "Watermark determined");
        Ok(Some(watermark))
    }

    pub async fn migrate(&self, entity: EntityKind) -> Result<EntityReport, MigratorError> {
        let schema = entity.schema();
        let table = schema.table;
        let mut report = EntityReport::new(entity);
        info!(table, dry_run = self.options.dry_run, "Migrating entity");

        let watermark = self.watermark(schema).await?;
        report.watermark = watermark;

        let rows = self.reader.fetch(schema, watermark, self.options.from_id).await?;
        report.read = rows.len() as u64;

        let candidates = self.validate(schema, rows, &mut report);
        let partition = self.filter.partition(table, schema.id_column, candidates).await?;
        report.skipped_existing = partition.existing.len() as u64;

        let mut kept: Vec<(i64, RowData)> = Vec::with_capacity(partition.fresh.len());
        for (id, row) in partition.fresh {
            match self.transformer.apply(schema, row) {
                Transformed::Keep(row) => kept.push((id, row)),
                Transformed::Contaminated(field) => {
                    debug!(table, id, field, "Excluding row that links to the forbidden domain");
                    report.skipped_contaminated += 1;
                }
            }
        }

        let batch = InsertBatch::new(
            table,
            schema.columns,
            kept.iter().map(|(_, row)| schema.project(row)).collect(),
        );

        let failed_ids: HashSet<i64> = if self.options.dry_run {
            report.migrated = batch.len() as u64;
            HashSet::new()
        } else {
            let write = self
                .writer
                .insert_batch(&batch, self.options.batch_size)
                .await;
            report.migrated = write.inserted;
            report.failed = write.failed;
            report.chunks = write.chunks;
            report.fallbacks = write.fallbacks;
            report.errors = write.errors;
            write.failed_ids.into_iter().collect()
        };

        let written = kept.iter().filter(|(id, _)| !failed_ids.contains(id));
        for (id, row) in written {
            report.max_id = report.max_id.max(Some(*id));
            if let (Some(column), Some(current)) = (schema.watermark, report.watermark) {
                let observed = Watermark::from_value(&row.get_value(column.column), column.kind)
                    .ok()
                    .flatten();
                report.watermark = Some(current.max(observed.unwrap_or(current)));
            }
        }

        info!(
            table,
            read = report.read,
            migrated = report.migrated,
            skipped = report.skipped(),
            rejected = report.rejected,
            failed = report.failed,
            "Entity migrated"
        );
        Ok(report)
    }

    fn validate(
        &self,
        schema: &EntitySchema,
        rows: Vec<RowData>,
        report: &mut EntityReport,
    ) -> Vec<(i64, RowData)> {
        let mut seen = HashSet::with_capacity(rows.len());
        let mut candidates = Vec::with_capacity(rows.len());

        for row in rows {
            match schema.validate(&row) {
                Ok(id) if seen.insert(id) => candidates.push((id, row)),
                Ok(id) => debug!(table = schema.table, id, "Duplicate id in source read"),
                Err(reason) => {
                    warn!(
                        table = schema.table,
                        id = ?schema.row_id(&row),
                        %reason,
                        "Rejected source row"
                    );
                    report.rejected += 1;
                }
            }
        }
        candidates
    }
}
