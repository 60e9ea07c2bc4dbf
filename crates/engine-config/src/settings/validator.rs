use crate::settings::{
    MAX_BATCH_SIZE, SyncSettings, SyncSettingsBuilder, error::SettingsError,
};
use chrono::{DateTime, NaiveDate, Utc};
use model::{core::watermark::Watermark, entity::EntityKind};
use tracing::{info, warn};

/// Validates raw run parameters before a run is started.
pub struct SettingsValidator<'a> {
    raw: &'a SyncSettingsBuilder,
}

impl<'a> SettingsValidator<'a> {
    pub fn new(raw: &'a SyncSettingsBuilder) -> Self {
        Self { raw }
    }

    pub fn validate(&self) -> Result<SyncSettings, SettingsError> {
        let mut settings = SyncSettings::default(self.raw.dry_run);
        let mut errors: Vec<String> = Vec::new();

        self.validate_batch_size(&mut settings, &mut errors);
        self.validate_from_id(&mut settings, &mut errors);
        self.validate_since(&mut settings, &mut errors);
        self.validate_entities(&mut settings, &mut errors);

        if !errors.is_empty() {
            return Err(SettingsError::ValidationFailed(errors));
        }

        settings.resume = self.raw.resume;
        settings.clear_checkpoint = self.raw.clear_checkpoint;
        settings.ensure_tables = self.raw.ensure_tables;
        settings.report = self.raw.report.clone();

        self.check_conflicts(&settings)?;
        self.log_validated_settings(&settings);
        Ok(settings)
    }

    fn validate_batch_size(&self, settings: &mut SyncSettings, errors: &mut Vec<String>) {
        match self.raw.batch_size {
            None => {}
            Some(size) if (1..=MAX_BATCH_SIZE).contains(&size) => settings.batch_size = size,
            Some(size) => errors.push(format!(
                "batch size must be between 1 and {MAX_BATCH_SIZE}, got {size}"
            )),
        }
    }

    fn validate_from_id(&self, settings: &mut SyncSettings, errors: &mut Vec<String>) {
        match self.raw.from_id {
            Some(id) if id < 0 => errors.push(format!("from-id must not be negative, got {id}")),
            other => settings.from_id = other,
        }
    }

    fn validate_since(&self, settings: &mut SyncSettings, errors: &mut Vec<String>) {
        let Some(raw) = self.raw.since.as_deref() else {
            return;
        };

        match parse_since(raw) {
            Some(ts) => settings.since = Some(Watermark::from_timestamp(ts)),
            None => errors.push(format!(
                "since must be a date (YYYY-MM-DD) or an RFC 3339 timestamp, got '{raw}'"
            )),
        }
    }

    fn validate_entities(&self, settings: &mut SyncSettings, errors: &mut Vec<String>) {
        if self.raw.entities.is_empty() {
            return;
        }

        let mut selected = Vec::new();
        for name in &self.raw.entities {
            match name.parse::<EntityKind>() {
                Ok(kind) if !selected.contains(&kind) => selected.push(kind),
                Ok(_) => {}
                Err(err) => errors.push(err.to_string()),
            }
        }

        // Migrate in dependency order regardless of the order given.
        selected.sort_by_key(EntityKind::order);
        settings.entities = selected;
    }

    fn check_conflicts(&self, settings: &SyncSettings) -> Result<(), SettingsError> {
        if settings.resume && settings.clear_checkpoint {
            warn!("--resume together with --clear-checkpoint: the checkpoint is cleared first, so nothing will be resumed");
        }

        if settings.dry_run && settings.ensure_tables {
            return Err(SettingsError::ConflictingSettings(vec![
                "ensure-tables creates tables and cannot be combined with dry-run".to_string(),
            ]));
        }

        if settings.batch_size > 5_000 {
            warn!(
                batch_size = settings.batch_size,
                "Large batch size; wide tables will be split further to stay under the placeholder limit"
            );
        }

        Ok(())
    }

    fn log_validated_settings(&self, settings: &SyncSettings) {
        info!(
            batch_size = settings.batch_size,
            resume = settings.resume,
            clear_checkpoint = settings.clear_checkpoint,
            from_id = ?settings.from_id,
            since = ?settings.since.map(|w| w.to_string()),
            dry_run = settings.dry_run,
            ensure_tables = settings.ensure_tables,
            entities = settings.entities.len(),
            "Settings validated"
        );
    }
}

fn parse_since(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
