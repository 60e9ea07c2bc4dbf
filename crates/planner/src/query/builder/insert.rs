//! Provides a fluent builder for constructing `Insert` ASTs.

use crate::query::ast::{common::TableRef, expr::Expr, insert::Insert};
use model::core::value::Value;

#[derive(Debug, Clone)]
pub struct InsertBuilder {
    ast: Insert,
}

impl InsertBuilder {
    pub fn new(table: TableRef) -> Self {
        Self {
            ast: Insert {
                table,
                ..Default::default()
            },
        }
    }

    pub fn columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.ast.columns = columns.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    /// Adds a row of values to the insert statement.
    /// This can be called multiple times for a batch insert.
    pub fn values(mut self, values: Vec<Expr>) -> Self {
        self.ast.values.push(values);
        self
    }

    /// Adds every row of plain values as bound parameters.
    pub fn rows(mut self, rows: &[Vec<Value>]) -> Self {
        self.ast.values.extend(
            rows.iter()
                .map(|row| row.iter().cloned().map(Expr::Value).collect()),
        );
        self
    }

    pub fn build(self) -> Insert {
        self.ast
    }
}
