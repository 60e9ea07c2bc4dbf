use engine_core::state::file_store::{
    DEFAULT_BACKUP_DIR, DEFAULT_CHECKPOINT_FILE, DEFAULT_MAX_BACKUPS, FileCheckpointStore,
};
use std::path::PathBuf;

/// Location and retention of the checkpoint file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointSettings {
    pub file: PathBuf,
    /// Relative paths resolve against the checkpoint file's directory.
    pub backup_dir: PathBuf,
    pub max_backups: usize,
}

impl Default for CheckpointSettings {
    fn default() -> Self {
        CheckpointSettings {
            file: PathBuf::from(DEFAULT_CHECKPOINT_FILE),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            max_backups: DEFAULT_MAX_BACKUPS,
        }
    }
}

impl CheckpointSettings {
    pub fn new(file: Option<PathBuf>, backup_dir: Option<PathBuf>) -> Self {
        let defaults = CheckpointSettings::default();
        CheckpointSettings {
            file: file.unwrap_or(defaults.file),
            backup_dir: backup_dir.unwrap_or(defaults.backup_dir),
            max_backups: defaults.max_backups,
        }
    }

    pub fn store(&self) -> FileCheckpointStore {
        FileCheckpointStore::new(self.file.clone(), &self.backup_dir, self.max_backups)
    }
}
