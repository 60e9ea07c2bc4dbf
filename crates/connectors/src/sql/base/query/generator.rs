use crate::sql::base::requests::FetchRowsRequest;
use model::{core::value::Value, records::batch::InsertBatch};
use planner::{
    binary_op,
    query::{
        ast::{common::OrderDir, expr::Expr},
        builder::{insert::InsertBuilder, select::SelectBuilder},
        count_all,
        dialect::Dialect,
        func, ident,
        renderer::render,
        table, value,
    },
};

/// Column alias used by single-value aggregate queries.
pub const AGGREGATE_ALIAS: &str = "value";

pub struct QueryGenerator<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> QueryGenerator<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    /// Generates a SQL SELECT statement and its parameters.
    pub fn select(&self, request: &FetchRowsRequest) -> (String, Vec<Value>) {
        let columns = request.columns.iter().map(|c| ident(c)).collect();

        let newer = request.newer_than.as_ref().map(|bound| {
            binary_op!(ident(&bound.column), Gt, value(bound.value.clone()))
        });
        let floor = request
            .id_floor
            .as_ref()
            .map(|floor| binary_op!(ident(&floor.column), GtEq, value(Value::Int(floor.min_id))));

        let condition = match (newer, floor) {
            (Some(newer), Some(floor)) => Some(binary_op!(newer, And, floor)),
            (newer, floor) => newer.or(floor),
        };

        let mut select = SelectBuilder::new()
            .select(columns)
            .from(table(&request.table), None)
            .where_opt(condition);

        if let Some(order) = &request.order_by {
            select = select.order_by(ident(order), Some(OrderDir::Asc));
        }

        render(&select.build(), self.dialect)
    }

    /// `SELECT MAX(column) AS value FROM table`
    pub fn max(&self, table_name: &str, column: &str) -> (String, Vec<Value>) {
        let select = SelectBuilder::new()
            .select(vec![aliased(func("MAX", vec![ident(column)]))])
            .from(table(table_name), None)
            .build();
        render(&select, self.dialect)
    }

    pub fn count(&self, table_name: &str) -> (String, Vec<Value>) {
        let select = SelectBuilder::new()
            .select(vec![aliased(count_all())])
            .from(table(table_name), None)
            .build();
        render(&select, self.dialect)
    }

    /// `SELECT id FROM table WHERE id IN (...)` for one chunk of ids.
    pub fn existing_ids(&self, table_name: &str, id_column: &str, ids: &[i64]) -> (String, Vec<Value>) {
        let list = ids.iter().map(|id| value(Value::Int(*id))).collect();
        let select = SelectBuilder::new()
            .select(vec![ident(id_column)])
            .from(table(table_name), None)
            .where_clause(Expr::InList {
                expr: Box::new(ident(id_column)),
                list,
            })
            .build();
        render(&select, self.dialect)
    }

    /// One multi-row INSERT covering every row of `batch`.
    pub fn insert_batch(&self, batch: &InsertBatch) -> (String, Vec<Value>) {
        if batch.is_empty() {
            return (String::new(), Vec::new());
        }

        let insert = InsertBuilder::new(table(&batch.table))
            .columns(batch.columns.as_slice())
            .rows(&batch.rows)
            .build();
        render(&insert, self.dialect)
    }
}

fn aliased(expr: Expr) -> Expr {
    Expr::Alias {
        expr: Box::new(expr),
        alias: AGGREGATE_ALIAS.to_string(),
    }
}
