use crate::core::value::Value;

/// Upper bound on bound parameters in a single MySQL statement.
pub const MAX_STATEMENT_PLACEHOLDERS: usize = 65_535;

/// Rows destined for one table with a fixed column projection.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertBatch {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl InsertBatch {
    pub fn new(table: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        InsertBatch {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows per statement: the requested size, lowered so that
    /// `rows * columns` stays within the placeholder limit.
    pub fn effective_chunk_size(&self, requested: usize) -> usize {
        let per_statement = (MAX_STATEMENT_PLACEHOLDERS / self.columns.len().max(1)).max(1);
        requested.clamp(1, per_statement)
    }

    pub fn chunks(&self, requested: usize) -> std::slice::Chunks<'_, Vec<Value>> {
        self.rows.chunks(self.effective_chunk_size(requested))
    }
}
