use crate::{
    error::CheckpointStoreError,
    progress::CheckpointStats,
    state::models::{Checkpoint, CheckpointStatus, CheckpointUpdate, FinalStats, Operation},
};
use async_trait::async_trait;
use tracing::info;

pub mod file_store;
pub mod models;

/// Durable record of how far a run got.
///
/// `load` never fails: a missing, unreadable or malformed checkpoint is
/// reported as `None` so that a run can always start fresh.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn save(&self, update: CheckpointUpdate) -> Result<Checkpoint, CheckpointStoreError>;

    async fn load(&self) -> Option<Checkpoint>;

    /// Marks the current checkpoint completed. Returns `None` when there is
    /// nothing to complete.
    async fn complete(
        &self,
        final_stats: FinalStats,
    ) -> Result<Option<Checkpoint>, CheckpointStoreError>;

    async fn clear(&self) -> Result<(), CheckpointStoreError>;

    async fn add_error(
        &self,
        message: &str,
        context: serde_json::Value,
    ) -> Result<(), CheckpointStoreError>;

    async fn resume(&self, operation: Operation) -> Option<Checkpoint> {
        let checkpoint = self.load().await?;
        if checkpoint.operation != operation || checkpoint.status != CheckpointStatus::InProgress {
            return None;
        }

        info!(
            operation = %operation,
            total_processed = checkpoint.total_processed,
            last_id = ?checkpoint.last_processed_id,
            last_date = ?checkpoint.last_processed_date,
            previous_errors = checkpoint.errors.len(),
            "Resuming from checkpoint"
        );
        Some(checkpoint)
    }

    async fn stats(&self) -> CheckpointStats {
        match self.load().await {
            Some(checkpoint) => CheckpointStats::from_checkpoint(&checkpoint, chrono::Utc::now()),
            None => CheckpointStats::missing(),
        }
    }
}
