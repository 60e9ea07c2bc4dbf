use crate::error::ReportGenerationError;
use chrono::{DateTime, Utc};
use model::{core::watermark::Watermark, entity::EntityKind};
use serde::Serialize;
use std::{path::Path, time::Duration};

/// Outcome of migrating one entity.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityReport {
    pub entity: EntityKind,
    /// Rows returned by the source read.
    pub read: u64,
    /// Rows written, or that would have been written in a dry run.
    pub migrated: u64,
    pub skipped_existing: u64,
    pub skipped_contaminated: u64,
    /// Rows missing a required field.
    pub rejected: u64,
    /// Rows the writer could not insert even one at a time.
    pub failed: u64,
    pub chunks: u64,
    /// Chunks that were retried row by row.
    pub fallbacks: u64,
    /// Watermark the source was read from.
    pub watermark: Option<Watermark>,
    /// Highest id among the rows written.
    pub max_id: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl EntityReport {
    pub fn new(entity: EntityKind) -> Self {
        EntityReport {
            entity,
            read: 0,
            migrated: 0,
            skipped_existing: 0,
            skipped_contaminated: 0,
            rejected: 0,
            failed: 0,
            chunks: 0,
            fallbacks: 0,
            watermark: None,
            max_id: None,
            errors: Vec::new(),
        }
    }

    pub fn skipped(&self) -> u64 {
        self.skipped_existing + self.skipped_contaminated
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunTotals {
    pub read: u64,
    pub migrated: u64,
    pub skipped: u64,
    pub rejected: u64,
    pub failed: u64,
    pub errors: u64,
}

impl RunTotals {
    pub fn from_reports(reports: &[EntityReport]) -> Self {
        reports.iter().fold(RunTotals::default(), |mut totals, r| {
            totals.read += r.read;
            totals.migrated += r.migrated;
            totals.skipped += r.skipped();
            totals.rejected += r.rejected;
            totals.failed += r.failed;
            totals.errors += r.errors.len() as u64;
            totals
        })
    }
}

/// Run-level summary returned by the orchestrator and optionally written as JSON.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub entities: Vec<EntityReport>,
    pub totals: RunTotals,
    /// Wall-clock run time in milliseconds.
    pub duration_ms: u64,
    pub dry_run: bool,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn new(entities: Vec<EntityReport>, duration: Duration, dry_run: bool) -> Self {
        let totals = RunTotals::from_reports(&entities);
        RunSummary {
            entities,
            totals,
            duration_ms: duration.as_millis() as u64,
            dry_run,
            finished_at: Utc::now(),
        }
    }

    pub fn report_for(&self, entity: EntityKind) -> Option<&EntityReport> {
        self.entities.iter().find(|r| r.entity == entity)
    }

    pub fn to_json(&self) -> Result<String, ReportGenerationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), ReportGenerationError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| ReportGenerationError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> EntityReport {
        EntityReport {
            read: 3,
            migrated: 2,
            skipped_existing: 1,
            watermark: Some(Watermark::from_epoch_secs(1_700_000_000)),
            max_id: Some(42),
            ..EntityReport::new(EntityKind::Users)
        }
    }

    #[test]
    fn test_totals_sum_entities() {
        let replies = EntityReport {
            read: 10,
            migrated: 6,
            skipped_contaminated: 2,
            rejected: 1,
            failed: 1,
            errors: vec!["row 9: data too long".into()],
            ..EntityReport::new(EntityKind::Replies)
        };
        let summary = RunSummary::new(vec![users(), replies], Duration::from_millis(1500), false);

        assert_eq!(
            summary.totals,
            RunTotals {
                read: 13,
                migrated: 8,
                skipped: 3,
                rejected: 1,
                failed: 1,
                errors: 1,
            }
        );
        assert_eq!(summary.duration_ms, 1500);
        assert_eq!(summary.report_for(EntityKind::Users).unwrap().skipped(), 1);
        assert!(summary.report_for(EntityKind::Forums).is_none());
    }

    #[test]
    fn test_writes_camel_case_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        RunSummary::new(vec![users()], Duration::ZERO, true)
            .write_to(&path)
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["dryRun"], serde_json::json!(true));
        assert_eq!(value["entities"][0]["entity"], serde_json::json!("users"));
        assert_eq!(value["entities"][0]["skippedExisting"], serde_json::json!(1));
        assert_eq!(value["entities"][0]["watermark"], serde_json::json!(1_700_000_000));
        assert!(value["entities"][0].get("errors").is_none());
    }
}
