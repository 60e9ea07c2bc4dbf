use model::{core::watermark::Watermark, entity::EntityKind};
use std::path::PathBuf;

pub mod checkpoint;
pub mod connection;
pub mod error;
pub mod retry;
pub mod transform;
pub mod validator;

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Immutable, validated parameters of one migrate run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    /// Rows per multi-row INSERT.
    pub batch_size: usize,
    /// Skip entities a previous, unfinished run already completed.
    pub resume: bool,
    /// Delete the checkpoint before starting.
    pub clear_checkpoint: bool,
    /// Only read source rows with `id >= from_id`.
    pub from_id: Option<i64>,
    /// Never read source rows older than this, even when the target is behind.
    pub since: Option<Watermark>,
    /// Read, filter and transform, but write nothing.
    pub dry_run: bool,
    /// Create the auxiliary tables before migrating.
    pub ensure_tables: bool,
    /// Dependency-ordered subset to migrate. Never empty.
    pub entities: Vec<EntityKind>,
    /// Where to write the JSON run summary.
    pub report: Option<PathBuf>,
}

impl SyncSettings {
    pub fn default(dry_run: bool) -> Self {
        SyncSettings {
            batch_size: DEFAULT_BATCH_SIZE,
            resume: false,
            clear_checkpoint: false,
            from_id: None,
            since: None,
            dry_run,
            ensure_tables: false,
            entities: EntityKind::ALL.to_vec(),
            report: None,
        }
    }

    pub fn is_selected(&self, entity: EntityKind) -> bool {
        self.entities.contains(&entity)
    }

    /// True when no entity subset was requested.
    pub fn is_full_run(&self) -> bool {
        self.entities.len() == EntityKind::ALL.len()
    }
}

/// Raw run parameters as received from the command line, before validation.
#[derive(Debug, Clone, Default)]
pub struct SyncSettingsBuilder {
    pub batch_size: Option<usize>,
    pub resume: bool,
    pub clear_checkpoint: bool,
    pub from_id: Option<i64>,
    pub since: Option<String>,
    pub dry_run: bool,
    pub ensure_tables: bool,
    pub entities: Vec<String>,
    pub report: Option<PathBuf>,
}

impl SyncSettingsBuilder {
    pub fn new(dry_run: bool) -> Self {
        SyncSettingsBuilder {
            dry_run,
            ..Default::default()
        }
    }
}
