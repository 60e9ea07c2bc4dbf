#[macro_export]
macro_rules! binary_op {
    ($left:expr, $op:ident, $right:expr) => {
        $crate::query::ast::expr::Expr::BinaryOp(Box::new($crate::query::ast::expr::BinaryOp {
            left: $left,
            op: $crate::query::ast::expr::BinaryOperator::$op,
            right: $right,
        }))
    };
}
