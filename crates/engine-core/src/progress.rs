use crate::state::models::{Checkpoint, CheckpointStatus, Operation};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Summary of the active checkpoint, as shown by `checkpoint --status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointStats {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CheckpointStatus>,
    pub total_processed: u64,
    pub last_processed_id: Option<i64>,
    pub last_processed_date: Option<DateTime<Utc>>,
    pub errors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
}

impl CheckpointStats {
    pub fn missing() -> Self {
        CheckpointStats {
            exists: false,
            operation: None,
            status: None,
            total_processed: 0,
            last_processed_id: None,
            last_processed_date: None,
            errors: 0,
            age: None,
        }
    }

    pub fn from_checkpoint(checkpoint: &Checkpoint, now: DateTime<Utc>) -> Self {
        CheckpointStats {
            exists: true,
            operation: Some(checkpoint.operation),
            status: Some(checkpoint.status),
            total_processed: checkpoint.total_processed,
            last_processed_id: checkpoint.last_processed_id,
            last_processed_date: checkpoint.last_processed_date,
            errors: checkpoint.errors.len(),
            age: Some(describe_age(checkpoint.timestamp, now)),
        }
    }
}

impl fmt::Display for CheckpointStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.exists {
            return writeln!(f, "No checkpoint found");
        }

        let show = |v: Option<String>| v.unwrap_or_else(|| "n/a".to_string());
        writeln!(f, "{:<18} {}", "Operation", show(self.operation.map(|o| o.to_string())))?;
        writeln!(f, "{:<18} {}", "Status", show(self.status.map(|s| s.to_string())))?;
        writeln!(f, "{:<18} {}", "Total processed", self.total_processed)?;
        writeln!(f, "{:<18} {}", "Last ID", show(self.last_processed_id.map(|id| id.to_string())))?;
        writeln!(
            f,
            "{:<18} {}",
            "Last date",
            show(self.last_processed_date.map(|d| d.to_rfc3339()))
        )?;
        writeln!(f, "{:<18} {}", "Errors", self.errors)?;
        writeln!(f, "{:<18} {}", "Age", show(self.age.clone()))
    }
}

/// Coarse, human readable age of `then` relative to `now`.
pub fn describe_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - then).num_minutes().max(0);
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{days} days ago")
    } else if hours > 0 {
        format!("{hours} hours ago")
    } else if minutes > 0 {
        format!("{minutes} minutes ago")
    } else {
        "just now".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_describe_age_buckets() {
        let now = Utc::now();
        assert_eq!(describe_age(now - Duration::seconds(30), now), "just now");
        assert_eq!(describe_age(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(describe_age(now - Duration::minutes(125), now), "2 hours ago");
        assert_eq!(describe_age(now - Duration::hours(49), now), "2 days ago");
    }

    #[test]
    fn test_future_timestamp_is_just_now() {
        let now = Utc::now();
        assert_eq!(describe_age(now + Duration::minutes(3), now), "just now");
    }

    #[test]
    fn test_missing_stats_display() {
        assert_eq!(CheckpointStats::missing().to_string(), "No checkpoint found\n");
    }
}
