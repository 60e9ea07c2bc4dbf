use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CHECKPOINT_VERSION: &str = "1.0.0";

/// Keys a checkpoint document must carry to be considered valid.
pub const REQUIRED_KEYS: [&str; 4] = ["timestamp", "operation", "lastProcessedId", "status"];

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Scrape,
    Migrate,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Scrape => f.write_str("scrape"),
            Operation::Migrate => f.write_str("migrate"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    InProgress,
    Completed,
}

impl fmt::Display for CheckpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointStatus::InProgress => f.write_str("in_progress"),
            CheckpointStatus::Completed => f.write_str("completed"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointErrorEntry {
    pub message: String,
    #[serde(default)]
    pub context: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinalStats {
    pub total_processed: Option<u64>,
    pub total_errors: Option<u64>,
    /// Wall-clock run time in milliseconds.
    pub duration: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
    pub last_processed_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub last_processed_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_processed: u64,
    #[serde(default)]
    pub errors: Vec<CheckpointErrorEntry>,
    pub status: CheckpointStatus,
    #[serde(default = "empty_object")]
    pub metadata: serde_json::Value,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_stats: Option<FinalStats>,
}

/// Fields supplied by a caller of `save`; everything else gets a default.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckpointUpdate {
    pub operation: Operation,
    pub last_processed_id: Option<i64>,
    pub last_processed_date: Option<DateTime<Utc>>,
    pub total_processed: Option<u64>,
    /// `None` keeps the errors already recorded for the same operation.
    pub errors: Option<Vec<CheckpointErrorEntry>>,
    pub metadata: Option<serde_json::Value>,
}

impl CheckpointUpdate {
    pub fn new(operation: Operation) -> Self {
        CheckpointUpdate {
            operation,
            last_processed_id: None,
            last_processed_date: None,
            total_processed: None,
            errors: None,
            metadata: None,
        }
    }

    pub fn last_processed_id(mut self, id: Option<i64>) -> Self {
        self.last_processed_id = id;
        self
    }

    pub fn last_processed_date(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.last_processed_date = date;
        self
    }

    pub fn total_processed(mut self, total: u64) -> Self {
        self.total_processed = Some(total);
        self
    }

    pub fn errors(mut self, errors: Vec<CheckpointErrorEntry>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Builds the checkpoint document written by `save`.
    pub fn into_checkpoint(
        self,
        now: DateTime<Utc>,
        previous: Option<&Checkpoint>,
    ) -> Checkpoint {
        let errors = match self.errors {
            Some(errors) => errors,
            // Only a run still in progress carries its errors into the next save.
            None => previous
                .filter(|cp| {
                    cp.operation == self.operation && cp.status == CheckpointStatus::InProgress
                })
                .map(|cp| cp.errors.clone())
                .unwrap_or_default(),
        };

        Checkpoint {
            timestamp: now,
            operation: self.operation,
            last_processed_id: self.last_processed_id,
            last_processed_date: self.last_processed_date,
            total_processed: self.total_processed.unwrap_or(0),
            errors,
            status: CheckpointStatus::InProgress,
            metadata: self.metadata.unwrap_or_else(empty_object),
            version: default_version(),
            completed_at: None,
            final_stats: None,
        }
    }
}

impl Checkpoint {
    /// Parses a checkpoint document, returning `None` for anything that is
    /// not a JSON object carrying every required key.
    pub fn parse(raw: &str) -> Option<Checkpoint> {
        let value: serde_json::Value = serde_json::from_str(raw).ok()?;
        let object = value.as_object()?;
        if !REQUIRED_KEYS.iter().all(|key| object.contains_key(*key)) {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

/// Dates written by older tooling are not always RFC 3339; those read as `None`.
fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|ts| ts.with_timezone(&Utc)))
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn default_version() -> String {
    CHECKPOINT_VERSION.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_requires_every_key() {
        let full = json!({
            "timestamp": "2024-05-01T10:00:00Z",
            "operation": "migrate",
            "lastProcessedId": 500,
            "status": "in_progress"
        });
        let cp = Checkpoint::parse(&full.to_string()).unwrap();
        assert_eq!(cp.last_processed_id, Some(500));
        assert_eq!(cp.total_processed, 0);
        assert_eq!(cp.version, CHECKPOINT_VERSION);

        for key in REQUIRED_KEYS {
            let mut partial = full.clone();
            partial.as_object_mut().unwrap().remove(key);
            assert!(Checkpoint::parse(&partial.to_string()).is_none(), "{key}");
        }
    }

    #[test]
    fn test_null_last_processed_id_is_present() {
        let raw = json!({
            "timestamp": "2024-05-01T10:00:00Z",
            "operation": "scrape",
            "lastProcessedId": null,
            "status": "completed"
        });
        let cp = Checkpoint::parse(&raw.to_string()).unwrap();
        assert_eq!(cp.last_processed_id, None);
        assert_eq!(cp.status, CheckpointStatus::Completed);
    }

    #[test]
    fn test_unparsable_date_is_dropped_not_fatal() {
        let raw = json!({
            "timestamp": "2024-05-01T10:00:00Z",
            "operation": "migrate",
            "lastProcessedId": 1,
            "lastProcessedDate": "last tuesday",
            "status": "in_progress"
        });
        let cp = Checkpoint::parse(&raw.to_string()).unwrap();
        assert_eq!(cp.last_processed_date, None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Checkpoint::parse("{not json").is_none());
        assert!(Checkpoint::parse("[1, 2, 3]").is_none());
        assert!(Checkpoint::parse("").is_none());
    }

    #[test]
    fn test_serializes_camel_case() {
        let cp = CheckpointUpdate::new(Operation::Migrate)
            .last_processed_id(Some(7))
            .total_processed(3)
            .into_checkpoint(Utc::now(), None);
        let value = serde_json::to_value(&cp).unwrap();
        assert_eq!(value["lastProcessedId"], json!(7));
        assert_eq!(value["totalProcessed"], json!(3));
        assert_eq!(value["status"], json!("in_progress"));
        assert_eq!(value["metadata"], json!({}));
        assert!(value.get("completedAt").is_none());
    }

    #[test]
    fn test_update_carries_errors_of_same_operation_only() {
        let entry = CheckpointErrorEntry {
            message: "boom".into(),
            context: json!({"entity": "users"}),
            timestamp: Utc::now(),
        };
        let mut previous = CheckpointUpdate::new(Operation::Migrate).into_checkpoint(Utc::now(), None);
        previous.errors.push(entry.clone());

        let carried = CheckpointUpdate::new(Operation::Migrate).into_checkpoint(Utc::now(), Some(&previous));
        assert_eq!(carried.errors, vec![entry]);

        let other = CheckpointUpdate::new(Operation::Scrape).into_checkpoint(Utc::now(), Some(&previous));
        assert!(other.errors.is_empty());

        let reset = CheckpointUpdate::new(Operation::Migrate)
            .errors(Vec::new())
            .into_checkpoint(Utc::now(), Some(&previous));
        assert!(reset.errors.is_empty());
    }
}
