use crate::{
    error::CheckpointStoreError,
    state::{
        CheckpointStore,
        models::{Checkpoint, CheckpointErrorEntry, CheckpointStatus, CheckpointUpdate, FinalStats},
    },
};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

pub const DEFAULT_CHECKPOINT_FILE: &str = "migration-checkpoint.json";
pub const DEFAULT_BACKUP_DIR: &str = "checkpoints";
pub const DEFAULT_MAX_BACKUPS: usize = 5;

const BACKUP_PREFIX: &str = "checkpoint-";
const BACKUP_SUFFIX: &str = ".json";

/// JSON checkpoint file with timestamped backups in a sibling directory.
///
/// The live file is replaced atomically (write to a temp file, then rename)
/// so a crash mid-write leaves the previous checkpoint intact.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
    backup_dir: PathBuf,
    max_backups: usize,
}

impl FileCheckpointStore {
    /// A relative `backup_dir` is resolved against the checkpoint file's
    /// directory.
    pub fn new(path: impl Into<PathBuf>, backup_dir: impl AsRef<Path>, max_backups: usize) -> Self {
        let path = path.into();
        let backup_dir = if backup_dir.as_ref().is_absolute() {
            backup_dir.as_ref().to_path_buf()
        } else {
            path.parent()
                .unwrap_or_else(|| Path::new(""))
                .join(backup_dir.as_ref())
        };

        FileCheckpointStore {
            path,
            backup_dir,
            max_backups: max_backups.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Writes a timestamped copy of the current checkpoint, if any.
    pub async fn backup(&self) -> Result<Option<PathBuf>, CheckpointStoreError> {
        match self.load().await {
            Some(checkpoint) => self.write_backup(&checkpoint).await.map(Some),
            None => Ok(None),
        }
    }

    /// Backup files, newest first.
    pub async fn list_backups(&self) -> Result<Vec<PathBuf>, CheckpointStoreError> {
        let mut entries = match fs::read_dir(&self.backup_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(CheckpointStoreError::io(&self.backup_dir, err)),
        };

        let mut backups = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CheckpointStoreError::io(&self.backup_dir, e))?
        {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(BACKUP_PREFIX) && name.ends_with(BACKUP_SUFFIX) {
                backups.push(entry.path());
            }
        }

        // Names embed a zero-padded UTC timestamp, so lexical order is chronological.
        backups.sort();
        backups.reverse();
        Ok(backups)
    }

    /// Replaces the live checkpoint with the newest backup that parses.
    pub async fn restore_latest_backup(&self) -> Result<Option<Checkpoint>, CheckpointStoreError> {
        for backup in self.list_backups().await? {
            let raw = match fs::read_to_string(&backup).await {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(path = %backup.display(), error = %err, "Skipping unreadable backup");
                    continue;
                }
            };

            if let Some(checkpoint) = Checkpoint::parse(&raw) {
                self.write_live(&checkpoint).await?;
                info!(path = %backup.display(), "Checkpoint restored from backup");
                return Ok(Some(checkpoint));
            }
            warn!(path = %backup.display(), "Skipping invalid backup");
        }

        Ok(None)
    }

    async fn write_live(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointStoreError> {
        let json = serde_json::to_vec_pretty(checkpoint)?;
        write_atomic(&self.path, &json).await
    }

    async fn write_backup(&self, checkpoint: &Checkpoint) -> Result<PathBuf, CheckpointStoreError> {
        fs::create_dir_all(&self.backup_dir)
            .await
            .map_err(|e| CheckpointStoreError::io(&self.backup_dir, e))?;

        let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ");
        let path = self
            .backup_dir
            .join(format!("{BACKUP_PREFIX}{stamp}{BACKUP_SUFFIX}"));
        let json = serde_json::to_vec_pretty(checkpoint)?;
        fs::write(&path, json)
            .await
            .map_err(|e| CheckpointStoreError::io(&path, e))?;

        self.prune_backups().await;
        Ok(path)
    }

    async fn prune_backups(&self) {
        let backups = match self.list_backups().await {
            Ok(backups) => backups,
            Err(err) => {
                warn!(error = %err, "Failed to list checkpoint backups");
                return;
            }
        };

        for stale in backups.iter().skip(self.max_backups) {
            if let Err(err) = fs::remove_file(stale).await {
                warn!(path = %stale.display(), error = %err, "Failed to remove old backup");
            }
        }
    }
}

impl Default for FileCheckpointStore {
    fn default() -> Self {
        Self::new(DEFAULT_CHECKPOINT_FILE, DEFAULT_BACKUP_DIR, DEFAULT_MAX_BACKUPS)
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, update: CheckpointUpdate) -> Result<Checkpoint, CheckpointStoreError> {
        let previous = self.load().await;
        let checkpoint = update.into_checkpoint(Utc::now(), previous.as_ref());

        self.write_live(&checkpoint).await?;
        if let Err(err) = self.write_backup(&checkpoint).await {
            warn!(error = %err, "Failed to create checkpoint backup");
        }

        info!(
            operation = %checkpoint.operation,
            total_processed = checkpoint.total_processed,
            "Checkpoint saved"
        );
        Ok(checkpoint)
    }

    async fn load(&self) -> Option<Checkpoint> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No checkpoint found");
                return None;
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Failed to read checkpoint");
                return None;
            }
        };

        let checkpoint = Checkpoint::parse(&raw);
        if checkpoint.is_none() {
            warn!(path = %self.path.display(), "Invalid checkpoint format, starting fresh");
        }
        checkpoint
    }

    async fn complete(
        &self,
        final_stats: FinalStats,
    ) -> Result<Option<Checkpoint>, CheckpointStoreError> {
        let Some(mut checkpoint) = self.load().await else {
            warn!("No checkpoint to complete");
            return Ok(None);
        };

        checkpoint.status = CheckpointStatus::Completed;
        checkpoint.completed_at = Some(Utc::now());
        checkpoint.final_stats = Some(FinalStats {
            total_processed: final_stats
                .total_processed
                .or(Some(checkpoint.total_processed)),
            total_errors: final_stats
                .total_errors
                .or(Some(checkpoint.errors.len() as u64)),
            duration: final_stats.duration,
        });

        self.write_live(&checkpoint).await?;
        info!(operation = %checkpoint.operation, "Checkpoint marked as completed");
        Ok(Some(checkpoint))
    }

    async fn clear(&self) -> Result<(), CheckpointStoreError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "Checkpoint cleared");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CheckpointStoreError::io(&self.path, err)),
        }
    }

    async fn add_error(
        &self,
        message: &str,
        context: serde_json::Value,
    ) -> Result<(), CheckpointStoreError> {
        let Some(mut checkpoint) = self.load().await else {
            debug!("No checkpoint to record error against");
            return Ok(());
        };

        checkpoint.errors.push(CheckpointErrorEntry {
            message: message.to_string(),
            context,
            timestamp: Utc::now(),
        });
        self.write_live(&checkpoint).await
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CheckpointStoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| CheckpointStoreError::io(parent, e))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)
        .await
        .map_err(|e| CheckpointStoreError::io(&tmp, e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| CheckpointStoreError::io(path, e))
}
