use crate::query::ast::{
    common::TableRef,
    expr::{Expr, FunctionCall, Ident},
};
use model::core::value::Value;

pub mod ast;
pub mod builder;
pub mod dialect;
pub mod macros;
pub mod renderer;

pub fn ident(name: &str) -> Expr {
    Expr::Identifier(Ident {
        qualifier: None,
        name: name.to_string(),
    })
}

pub fn value(val: Value) -> Expr {
    Expr::Value(val)
}

pub fn table(name: &str) -> TableRef {
    TableRef {
        schema: None,
        name: name.to_string(),
    }
}

pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::FunctionCall(FunctionCall {
        name: name.to_string(),
        args,
        wildcard: false,
    })
}

pub fn count_all() -> Expr {
    Expr::FunctionCall(FunctionCall {
        name: "COUNT".to_string(),
        args: Vec::new(),
        wildcard: true,
    })
}
