//! Ordering keys used to detect rows that are new since the last run.
//!
//! Watermarks are kept as UTC epoch seconds. Sub-second precision is floored
//! when a store value is converted, which can only widen the next read; rows
//! re-read inside the floored second are dropped by the existence check.

use crate::{core::value::Value, error::ModelError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage representation of a watermark column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkKind {
    /// `TIMESTAMP` / `DATETIME` column.
    Timestamp,
    /// `BIGINT` holding milliseconds since the Unix epoch.
    EpochMillis,
}

impl fmt::Display for WatermarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatermarkKind::Timestamp => f.write_str("timestamp"),
            WatermarkKind::EpochMillis => f.write_str("epoch-millis"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Watermark(i64);

impl Watermark {
    pub const EPOCH: Watermark = Watermark(0);

    pub fn from_epoch_secs(secs: i64) -> Self {
        Watermark(secs)
    }

    pub fn from_timestamp(ts: DateTime<Utc>) -> Self {
        Watermark(ts.timestamp())
    }

    pub fn from_epoch_millis(ms: i64) -> Self {
        Watermark(ms.div_euclid(1000))
    }

    pub fn epoch_secs(&self) -> i64 {
        self.0
    }

    pub fn is_epoch(&self) -> bool {
        self.0 == 0
    }

    /// Reads a watermark out of a value returned by `MAX(column)`.
    /// `Null` (empty table) yields `None`.
    pub fn from_value(value: &Value, kind: WatermarkKind) -> Result<Option<Self>, ModelError> {
        if value.is_null() {
            return Ok(None);
        }

        let parsed = match kind {
            WatermarkKind::Timestamp => value.as_timestamp().map(Watermark::from_timestamp),
            WatermarkKind::EpochMillis => value.as_i64().map(Watermark::from_epoch_millis),
        };

        parsed.map(Some).ok_or_else(|| ModelError::InvalidWatermark {
            value: value.to_string(),
            kind,
        })
    }

    /// Renders the watermark back into the column's native representation
    /// for use as a bound query parameter.
    pub fn to_value(&self, kind: WatermarkKind) -> Value {
        match kind {
            // Out-of-range seconds fall back to the epoch, which only widens the read.
            WatermarkKind::Timestamp => Value::Timestamp(self.to_datetime()),
            WatermarkKind::EpochMillis => Value::Int(self.0.saturating_mul(1000)),
        }
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.0, 0).unwrap_or_default()
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_datetime().to_rfc3339())
    }
}
