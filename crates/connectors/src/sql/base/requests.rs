use model::core::value::Value;

/// Lower bound on the ordering column, compared with a strict `>`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewerThan {
    pub column: String,
    pub value: Value,
}

/// Lower bound on the id column, compared with `>=`.
#[derive(Debug, Clone, PartialEq)]
pub struct IdFloor {
    pub column: String,
    pub min_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRowsRequest {
    pub table: String,
    pub columns: Vec<String>,
    pub newer_than: Option<NewerThan>,
    pub id_floor: Option<IdFloor>,
    pub order_by: Option<String>,
}

pub struct FetchRowsRequestBuilder {
    table: String,
    columns: Vec<String>,
    newer_than: Option<NewerThan>,
    id_floor: Option<IdFloor>,
    order_by: Option<String>,
}

impl FetchRowsRequestBuilder {
    pub fn new(table: &str) -> Self {
        FetchRowsRequestBuilder {
            table: table.to_string(),
            columns: Vec::new(),
            newer_than: None,
            id_floor: None,
            order_by: None,
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Rows whose `column` is strictly greater than `value`; the result is
    /// ordered by the same column.
    pub fn newer_than(mut self, column: &str, value: Value) -> Self {
        self.order_by = Some(column.to_string());
        self.newer_than = Some(NewerThan {
            column: column.to_string(),
            value,
        });
        self
    }

    pub fn id_floor(mut self, column: &str, min_id: Option<i64>) -> Self {
        self.id_floor = min_id.map(|min_id| IdFloor {
            column: column.to_string(),
            min_id,
        });
        self
    }

    pub fn order_by(mut self, column: &str) -> Self {
        self.order_by = Some(column.to_string());
        self
    }

    pub fn build(self) -> FetchRowsRequest {
        FetchRowsRequest {
            table: self.table,
            columns: self.columns,
            newer_than: self.newer_than,
            id_floor: self.id_floor,
            order_by: self.order_by,
        }
    }
}
