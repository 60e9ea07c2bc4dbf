use crate::query::{
    ast::expr::{BinaryOp, BinaryOperator, Expr, FunctionCall, Ident},
    renderer::{Render, Renderer},
};

impl Render for Expr {
    fn render(&self, r: &mut Renderer) {
        match self {
            Expr::Identifier(ident) => ident.render(r),
            Expr::Value(val) => r.add_param(val.clone()),
            Expr::BinaryOp(op) => op.render(r),
            Expr::FunctionCall(func) => func.render(r),
            Expr::Alias { expr, alias } => {
                expr.render(r);
                r.sql.push_str(" AS ");
                r.sql.push_str(&r.dialect.quote_identifier(alias));
            }
            Expr::InList { expr, list } => {
                // An empty IN list is not valid SQL; it can never match.
                if list.is_empty() {
                    r.sql.push_str("(1 = 0)");
                    return;
                }
                expr.render(r);
                r.sql.push_str(" IN (");
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        r.sql.push_str(", ");
                    }
                    item.render(r);
                }
                r.sql.push(')');
            }
        }
    }
}

impl Render for Ident {
    fn render(&self, r: &mut Renderer) {
        if let Some(qualifier) = &self.qualifier {
            r.sql.push_str(&r.dialect.quote_identifier(qualifier));
            r.sql.push('.');
        }
        r.sql.push_str(&r.dialect.quote_identifier(&self.name));
    }
}

impl Render for BinaryOp {
    fn render(&self, r: &mut Renderer) {
        r.sql.push('(');
        self.left.render(r);

        let op_str = match self.op {
            BinaryOperator::Eq => " = ",
            BinaryOperator::NotEq => " <> ",
            BinaryOperator::Lt => " < ",
            BinaryOperator::LtEq => " <= ",
            BinaryOperator::Gt => " > ",
            BinaryOperator::GtEq => " >= ",
            BinaryOperator::And => " AND ",
            BinaryOperator::Or => " OR ",
        };
        r.sql.push_str(op_str);

        self.right.render(r);
        r.sql.push(')');
    }
}

impl Render for FunctionCall {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str(&self.name);
        r.sql.push('(');
        if self.wildcard {
            r.sql.push('*');
        } else {
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    r.sql.push_str(", ");
                }
                arg.render(r);
            }
        }
        r.sql.push(')');
    }
}

#[cfg(test)]
mod tests {
    use crate::query::{
        ast::expr::Expr,
        dialect::{MySql, Postgres},
        ident,
        renderer::render,
        value,
    };
    use model::core::value::Value;

    #[test]
    fn test_render_in_list_mysql() {
        let expr = Expr::InList {
            expr: Box::new(ident("id")),
            list: vec![value(Value::Int(1)), value(Value::Int(2))],
        };
        let (sql, params) = render(&expr, &MySql);
        assert_eq!(sql, "`id` IN (?, ?)");
        assert_eq!(params, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_render_empty_in_list_never_matches() {
        let expr = Expr::InList {
            expr: Box::new(ident("id")),
            list: vec![],
        };
        let (sql, params) = render(&expr, &Postgres);
        assert_eq!(sql, "(1 = 0)");
        assert!(params.is_empty());
    }

    #[test]
    fn test_render_nested_binary_ops() {
        let expr = crate::binary_op!(
            crate::binary_op!(ident("created_at"), Gt, value(Value::Int(10))),
            And,
            crate::binary_op!(ident("id"), GtEq, value(Value::Int(500)))
        );
        let (sql, params) = render(&expr, &Postgres);
        assert_eq!(sql, r#"(("created_at" > $1) AND ("id" >= $2))"#);
        assert_eq!(params, vec![Value::Int(10), Value::Int(500)]);
    }
}
