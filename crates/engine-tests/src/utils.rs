use connectors::memory::MemoryTarget;
use model::{core::watermark::Watermark, records::row::RowData};
use serde_json::Value as JsonValue;
use std::collections::HashSet;

/// Panics if any id appears twice in `table`.
pub fn assert_no_duplicates(target: &MemoryTarget, table: &str) {
    let rows = target.rows(table);
    let mut seen = HashSet::new();
    for row in &rows {
        let id = row.get_value("id").as_i64().expect("integer id");
        assert!(seen.insert(id), "duplicate id {id} in {table}");
    }
}

/// Text of `field` for every row in `table`.
pub fn column_text(target: &MemoryTarget, table: &str, field: &str) -> Vec<String> {
    target
        .rows(table)
        .iter()
        .filter_map(|row: &RowData| row.get_value(field).as_str().map(str::to_string))
        .collect()
}

/// Watermark recorded for `table` in a checkpoint's metadata.
pub fn recorded_watermark(metadata: &JsonValue, table: &str) -> Option<Watermark> {
    metadata["watermarks"][table]
        .as_i64()
        .map(Watermark::from_epoch_secs)
}
