use crate::{
    error::MigrationError,
    execution::{
        factory::{StoreConnector, Stores},
        schema,
    },
};
use engine_config::{
    report::summary::{EntityReport, RunSummary},
    settings::SyncSettings,
};
use engine_core::{
    metrics::Metrics,
    retry::RetryPolicy,
    state::{
        CheckpointStore,
        models::{Checkpoint, CheckpointUpdate, FinalStats, Operation},
    },
};
use engine_processing::{
    migrator::{EntityMigrator, MigrateOptions},
    transform::pipeline::RowTransformer,
};
use model::{core::watermark::Watermark, entity::EntityKind};
use serde_json::json;
use std::{collections::BTreeMap, sync::Arc, time::Instant};
use tracing::{error, info, warn};

pub async fn run(
    connector: Arc<dyn StoreConnector>,
    checkpoints: Arc<dyn CheckpointStore>,
    transformer: RowTransformer,
    retry: RetryPolicy,
    settings: SyncSettings,
) -> Result<RunSummary, MigrationError> {
    Orchestrator::new(connector, checkpoints, transformer, retry, settings)
        .run()
        .await
}

/// Drives every selected entity through its migrator in dependency order,
/// checkpointing after each one.
pub struct Orchestrator {
    connector: Arc<dyn StoreConnector>,
    checkpoints: Arc<dyn CheckpointStore>,
    transformer: RowTransformer,
    retry: RetryPolicy,
    settings: SyncSettings,
    metrics: Metrics,
}

impl Orchestrator {
    pub fn new(
        connector: Arc<dyn StoreConnector>,
        checkpoints: Arc<dyn CheckpointStore>,
        transformer: RowTransformer,
        retry: RetryPolicy,
        settings: SyncSettings,
    ) -> Self {
        Orchestrator {
            connector,
            checkpoints,
            transformer,
            retry,
            settings,
            metrics: Metrics::new(),
        }
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics.clone()
    }

    /// Opens the run in the checkpoint, acquires both pools and runs the
    /// sync. Pools acquired here are released exactly once, whether or not
    /// the sync succeeded.
    pub async fn run(self) -> Result<RunSummary, MigrationError> {
        let started = Instant::now();
        info!(
            dry_run = self.settings.dry_run,
            batch_size = self.settings.batch_size,
            entities = self.settings.entities.len(),
            "Starting sync"
        );

        let mut progress = self.open().await?;

        let stores = match self.connector.connect().await {
            Ok(stores) => stores,
            Err(err) => {
                error!(error = %err, "Could not acquire connections, aborting run");
                self.record_failure("connect", None, &err.to_string()).await;
                return Err(err);
            }
        };

        let result = self.execute(&stores, &mut progress, started).await;
        stores.close().await;
        result
    }

    /// Applies clear and resume, then saves the opening checkpoint so that
    /// a fatal error has somewhere to land.
    async fn open(&self) -> Result<RunProgress, MigrationError> {
        let dry_run = self.settings.dry_run;

        if self.settings.clear_checkpoint {
            if dry_run {
                info!("Dry run: leaving existing checkpoint in place");
            } else {
                self.checkpoints.clear().await?;
                info!("Checkpoint cleared");
            }
        }

        let mut progress = RunProgress::from_previous(self.checkpoints.load().await.as_ref());
        if self.settings.resume {
            match self.checkpoints.resume(Operation::Migrate).await {
                Some(checkpoint) => progress.resume_from(&checkpoint),
                None => info!("No resumable checkpoint found, starting from the beginning"),
            }
        }

        if !dry_run {
            self.checkpoints.save(progress.start()).await?;
        }
        Ok(progress)
    }

    async fn execute(
        &self,
        stores: &Stores,
        progress: &mut RunProgress,
        started: Instant,
    ) -> Result<RunSummary, MigrationError> {
        let dry_run = self.settings.dry_run;

        if self.settings.ensure_tables {
            if let Err(err) = schema::ensure_tables(stores.target.as_ref()).await {
                error!(error = %err, "Could not create auxiliary tables, aborting run");
                self.record_failure("ensure_tables", None, &err.to_string()).await;
                return Err(err.into());
            }
        }

        let migrator = EntityMigrator::new(
            stores.source.clone(),
            stores.target.clone(),
            self.transformer.clone(),
            self.retry.clone(),
            MigrateOptions::from(&self.settings),
        );

        let mut reports = Vec::new();
        for entity in EntityKind::ALL {
            if !self.settings.is_selected(entity) {
                continue;
            }
            if progress.completed.contains(&entity) {
                info!(entity = %entity, "Entity completed by a previous run, skipping");
                continue;
            }

            let report = match migrator.migrate(entity).await {
                Ok(report) => report,
                Err(err) => {
                    error!(entity = %entity, error = %err, "Entity migration failed, aborting run");
                    self.record_failure("migrate", Some(entity), &err.to_string()).await;
                    return Err(err.into());
                }
            };

            self.record_metrics(&report);
            progress.record(&report);
            if !dry_run {
                self.checkpoints.save(progress.update(&report)).await?;
            }
            reports.push(report);
        }

        let summary = RunSummary::new(reports, started.elapsed(), dry_run);
        if !dry_run {
            let final_stats = FinalStats {
                total_processed: Some(progress.total_processed),
                total_errors: Some(summary.totals.failed + summary.totals.rejected),
                duration: Some(summary.duration_ms),
            };
            self.checkpoints.complete(final_stats).await?;
        }

        if let Some(path) = &self.settings.report {
            summary.write_to(path)?;
            info!(path = %path.display(), "Run report written");
        }

        let snapshot = self.metrics.snapshot();
        info!(
            rows_read = snapshot.rows_read,
            rows_written = snapshot.rows_written,
            rows_skipped = snapshot.rows_skipped,
            rows_failed = snapshot.rows_failed,
            chunks = snapshot.chunks_written,
            fallbacks = snapshot.fallback_count,
            duration_ms = summary.duration_ms,
            "Sync finished"
        );
        Ok(summary)
    }

    /// Dry runs never touch the checkpoint.
    async fn record_failure(&self, stage: &str, entity: Option<EntityKind>, message: &str) {
        if self.settings.dry_run {
            return;
        }
        let context = json!({
            "operation": Operation::Migrate.to_string(),
            "stage": stage,
            "entity": entity,
        });
        if let Err(err) = self.checkpoints.add_error(message, context).await {
            warn!(error = %err, "Failed to record error in checkpoint");
        }
    }

    fn record_metrics(&self, report: &EntityReport) {
        self.metrics.increment_read(report.read);
        self.metrics.increment_written(report.migrated);
        self.metrics.increment_skipped(report.skipped());
        self.metrics.increment_failed(report.failed);
        self.metrics.increment_chunks(report.chunks);
        self.metrics.increment_fallbacks(report.fallbacks);
    }
}

/// Progress carried between entities and persisted in the checkpoint metadata.
#[derive(Debug, Default)]
struct RunProgress {
    completed: Vec<EntityKind>,
    watermarks: BTreeMap<String, Watermark>,
    row_errors: BTreeMap<String, Vec<String>>,
    total_processed: u64,
    resumed: bool,
}

impl RunProgress {
    /// Watermarks recorded by the last checkpoint are kept so that a run can
    /// notice one moving backwards, even when it is not resuming.
    fn from_previous(previous: Option<&Checkpoint>) -> Self {
        let watermarks = previous
            .and_then(|cp| cp.metadata.get("watermarks"))
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default();

        RunProgress {
            watermarks,
            ..RunProgress::default()
        }
    }

    fn resume_from(&mut self, checkpoint: &Checkpoint) {
        self.resumed = true;
        self.total_processed = checkpoint.total_processed;
        self.completed = checkpoint
            .metadata
            .get("completedEntities")
            .and_then(|value| value.as_array())
            .map(|names| {
                names
                    .iter()
                    .filter_map(|name| name.as_str()?.parse().ok())
                    .collect()
            })
            .unwrap_or_default();
        info!(
            completed = self.completed.len(),
            total_processed = self.total_processed,
            "Resuming sync"
        );
    }

    fn record(&mut self, report: &EntityReport) {
        let table = report.entity.table().to_string();
        self.completed.push(report.entity);
        self.total_processed += report.migrated;

        if let Some(watermark) = report.watermark {
            if let Some(previous) = self.watermarks.get(&table).filter(|prev| **prev > watermark) {
                warn!(
                    entity = %report.entity,
                    previous = %previous,
                    current = %watermark,
                    "Watermark moved backwards since the last checkpoint"
                );
            }
            self.watermarks.insert(table.clone(), watermark);
        }

        if !report.errors.is_empty() {
            self.row_errors.insert(table, report.errors.clone());
        }
    }

    /// A fresh run starts with an empty error list; a resumed one keeps the
    /// errors of the run it continues.
    fn start(&self) -> CheckpointUpdate {
        let update = CheckpointUpdate::new(Operation::Migrate)
            .total_processed(self.total_processed)
            .metadata(self.metadata(None));
        if self.resumed {
            update
        } else {
            update.errors(Vec::new())
        }
    }

    fn update(&self, report: &EntityReport) -> CheckpointUpdate {
        CheckpointUpdate::new(Operation::Migrate)
            .last_processed_id(report.max_id)
            .last_processed_date(report.watermark.map(|w| w.to_datetime()))
            .total_processed(self.total_processed)
            .metadata(self.metadata(Some(report.entity)))
    }

    fn metadata(&self, current: Option<EntityKind>) -> serde_json::Value {
        json!({
            "currentEntity": current,
            "completedEntities": self.completed,
            "watermarks": self.watermarks,
            "rowErrors": self.row_errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use connectors::{
        memory::{MemorySource, MemoryTarget},
        sql::base::error::ConnectorError,
    };
    use engine_core::retry::RetryError;
    use engine_core::state::{file_store::FileCheckpointStore, models::CheckpointStatus};
    use engine_processing::transform::cleanse::ForbiddenDomain;
    use model::{
        core::value::{FieldValue, Value},
        records::row::RowData,
    };
    use std::time::Duration;
    use tempfile::TempDir;

    fn user(id: i64, created_secs: i64) -> RowData {
        RowData::new(
            "users",
            vec![
                FieldValue::new("id", Value::Int(id)),
                FieldValue::new("username", Value::String(format!("user{id}"))),
                FieldValue::new("link", Value::String(format!("/members/user.{id}"))),
                FieldValue::new(
                    "created_at",
                    Value::Timestamp(Utc.timestamp_opt(created_secs, 0).unwrap()),
                ),
            ],
        )
    }

    fn forum(id: i64) -> RowData {
        RowData::new(
            "forums",
            vec![
                FieldValue::new("id", Value::Int(id)),
                FieldValue::new("name", Value::String(format!("forum {id}"))),
                FieldValue::new("link", Value::String(format!("/forums/{id}"))),
            ],
        )
    }

    struct Fixture {
        source: Arc<MemorySource>,
        target: Arc<MemoryTarget>,
        store: Arc<FileCheckpointStore>,
        _dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let store = Arc::new(FileCheckpointStore::new(
                dir.path().join("migration-checkpoint.json"),
                dir.path().join("checkpoints"),
                5,
            ));
            Fixture {
                source: Arc::new(MemorySource::new()),
                target: Arc::new(MemoryTarget::new()),
                store,
                _dir: dir,
            }
        }

        fn orchestrator(&self, settings: SyncSettings) -> Orchestrator {
            Orchestrator::new(
                Arc::new(Stores::new(self.source.clone(), self.target.clone())),
                self.store.clone(),
                RowTransformer::new(ForbiddenDomain::new("offshorecorptalk.com").unwrap()),
                RetryPolicy::fixed(2, Duration::ZERO),
                settings,
            )
        }
    }

    struct UnreachableTarget;

    #[async_trait]
    impl StoreConnector for UnreachableTarget {
        async fn connect(&self) -> Result<Stores, MigrationError> {
            Err(MigrationError::Connect {
                role: "target",
                source: RetryError::AttemptsExceeded(ConnectorError::InvalidUrl(
                    "mysql://forum-db:3306 refused the connection".to_string(),
                )),
            })
        }
    }

    fn only(entities: &[EntityKind]) -> SyncSettings {
        SyncSettings {
            entities: entities.to_vec(),
            ..SyncSettings::default(false)
        }
    }

    #[tokio::test]
    async fn test_run_checkpoints_and_completes() {
        let fx = Fixture::new();
        fx.source.insert("users", vec![user(1, 100), user(2, 200)]);
        fx.source.insert("forums", vec![forum(10)]);

        let summary = fx
            .orchestrator(only(&[EntityKind::Users, EntityKind::Forums]))
            .run()
            .await
            .unwrap();

        assert_eq!(summary.totals.migrated, 3);
        assert_eq!(fx.target.ids("users"), vec![1, 2]);
        assert_eq!(fx.target.ids("forums"), vec![10]);

        let checkpoint = fx.store.load().await.unwrap();
        assert_eq!(checkpoint.status, CheckpointStatus::Completed);
        assert_eq!(checkpoint.total_processed, 3);
        assert_eq!(checkpoint.metadata["completedEntities"], json!(["users", "forums"]));
        assert_eq!(checkpoint.metadata["watermarks"]["users"], json!(200));
        assert_eq!(
            checkpoint.final_stats.as_ref().and_then(|s| s.total_processed),
            Some(3)
        );

        assert_eq!(fx.source.close_count(), 1);
        assert_eq!(fx.target.close_count(), 1);
    }

    #[tokio::test]
    async fn test_fatal_error_records_and_releases_pools() {
        let fx = Fixture::new();
        fx.source.insert("users", vec![user(1, 100)]);
        fx.source.fail_next_fetches(1);

        let result = fx.orchestrator(only(&[EntityKind::Users])).run().await;
        assert!(matches!(result, Err(MigrationError::Migrator(_))));

        let checkpoint = fx.store.load().await.unwrap();
        assert_eq!(checkpoint.status, CheckpointStatus::InProgress);
        assert_eq!(checkpoint.errors.len(), 1);
        assert_eq!(checkpoint.errors[0].context["entity"], json!("users"));
        assert_eq!(checkpoint.errors[0].context["operation"], json!("migrate"));

        assert_eq!(fx.source.close_count(), 1);
        assert_eq!(fx.target.close_count(), 1);
    }

    #[tokio::test]
    async fn test_resume_skips_completed_entities() {
        let fx = Fixture::new();
        fx.store
            .save(
                CheckpointUpdate::new(Operation::Migrate)
                    .total_processed(7)
                    .metadata(json!({ "completedEntities": ["users"] })),
            )
            .await
            .unwrap();
        fx.source.insert("users", vec![user(1, 100)]);
        fx.source.insert("forums", vec![forum(10)]);

        let settings = SyncSettings {
            resume: true,
            ..only(&[EntityKind::Users, EntityKind::Forums])
        };
        let summary = fx.orchestrator(settings).run().await.unwrap();

        assert!(summary.report_for(EntityKind::Users).is_none());
        assert!(fx.target.ids("users").is_empty());
        assert_eq!(fx.target.ids("forums"), vec![10]);

        let checkpoint = fx.store.load().await.unwrap();
        assert_eq!(checkpoint.total_processed, 8);
    }

    #[tokio::test]
    async fn test_dry_run_leaves_checkpoint_alone() {
        let fx = Fixture::new();
        fx.store
            .save(CheckpointUpdate::new(Operation::Migrate).total_processed(4))
            .await
            .unwrap();
        fx.source.insert("users", vec![user(1, 100)]);

        let settings = SyncSettings {
            clear_checkpoint: true,
            ..SyncSettings {
                entities: vec![EntityKind::Users],
                ..SyncSettings::default(true)
            }
        };
        let summary = fx.orchestrator(settings).run().await.unwrap();

        assert!(summary.dry_run);
        assert_eq!(summary.totals.migrated, 1);
        assert!(fx.target.ids("users").is_empty());
        let checkpoint = fx.store.load().await.unwrap();
        assert_eq!(checkpoint.total_processed, 4);
        assert_eq!(checkpoint.status, CheckpointStatus::InProgress);
    }

    #[tokio::test]
    async fn test_ensure_tables_runs_before_migrating() {
        let fx = Fixture::new();
        let settings = SyncSettings {
            ensure_tables: true,
            ..only(&[EntityKind::Addresses])
        };
        let summary = fx.orchestrator(settings).run().await.unwrap();

        assert_eq!(summary.entities.len(), 1);
        assert!(fx.target.has_table("entities"));
        assert!(fx.target.has_table("__drizzle_migrations"));
        assert!(!fx.target.has_table("users"));
    }

    #[tokio::test]
    async fn test_metrics_follow_reports() {
        let fx = Fixture::new();
        fx.source.insert("users", vec![user(1, 100), user(2, 200), user(3, 300)]);
        fx.target.seed("users", vec![user(2, 200)]);

        let orchestrator = fx.orchestrator(only(&[EntityKind::Users]));
        let metrics = orchestrator.metrics();
        orchestrator.run().await.unwrap();

        let snap = metrics.snapshot();
        assert_eq!(snap.rows_read, 3);
        assert_eq!(snap.rows_written, 2);
        assert_eq!(snap.rows_skipped, 1);
        assert_eq!(snap.chunks_written, 1);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_warns_when_watermark_moves_backwards() {
        let fx = Fixture::new();
        fx.store
            .save(
                CheckpointUpdate::new(Operation::Migrate)
                    .metadata(json!({ "watermarks": { "users": 5_000 } })),
            )
            .await
            .unwrap();
        fx.source.insert("users", vec![user(1, 100)]);

        fx.orchestrator(only(&[EntityKind::Users])).run().await.unwrap();

        assert!(logs_contain("Watermark moved backwards"));
        let checkpoint = fx.store.load().await.unwrap();
        assert_eq!(checkpoint.metadata["watermarks"]["users"], json!(100));
    }

    #[tokio::test]
    async fn test_connect_failure_is_recorded() {
        let fx = Fixture::new();
        let orchestrator = Orchestrator::new(
            Arc::new(UnreachableTarget),
            fx.store.clone(),
            RowTransformer::new(ForbiddenDomain::new("offshorecorptalk.com").unwrap()),
            RetryPolicy::fixed(2, Duration::ZERO),
            only(&[EntityKind::Users]),
        );

        let result = orchestrator.run().await;
        assert!(matches!(result, Err(MigrationError::Connect { role: "target", .. })));

        let checkpoint = fx.store.load().await.unwrap();
        assert_eq!(checkpoint.status, CheckpointStatus::InProgress);
        assert_eq!(checkpoint.errors.len(), 1);
        assert_eq!(checkpoint.errors[0].context["stage"], json!("connect"));
        assert_eq!(checkpoint.errors[0].context["entity"], json!(null));
        assert!(checkpoint.errors[0].message.contains("refused the connection"));
    }

    #[tokio::test]
    async fn test_connect_failure_in_dry_run_leaves_no_checkpoint() {
        let fx = Fixture::new();
        let orchestrator = Orchestrator::new(
            Arc::new(UnreachableTarget),
            fx.store.clone(),
            RowTransformer::new(ForbiddenDomain::new("offshorecorptalk.com").unwrap()),
            RetryPolicy::fixed(2, Duration::ZERO),
            SyncSettings::default(true),
        );

        assert!(orchestrator.run().await.is_err());
        assert!(fx.store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_ensure_tables_failure_is_recorded_and_releases_pools() {
        let fx = Fixture::new();
        fx.target.deny_ddl();
        fx.source.insert("users", vec![user(1, 100)]);
        let settings = SyncSettings {
            ensure_tables: true,
            ..only(&[EntityKind::Users])
        };

        let result = fx.orchestrator(settings).run().await;
        assert!(matches!(result, Err(MigrationError::Database(_))));
        assert!(fx.target.ids("users").is_empty());

        let checkpoint = fx.store.load().await.unwrap();
        assert_eq!(checkpoint.errors.len(), 1);
        assert_eq!(checkpoint.errors[0].context["stage"], json!("ensure_tables"));
        assert!(checkpoint.errors[0].message.contains("CREATE command denied"));

        assert_eq!(fx.source.close_count(), 1);
        assert_eq!(fx.target.close_count(), 1);
    }
}
