use crate::ast::{Expr, ExprKind, TypeDescriptor};
use crate::expr::{ExpressionRecord, Fixity, OperandKind, UnaryOp};
use crate::operators::MutationOperator;

/// Prefix/postfix increment and decrement mutate to the opposite operator
/// and to a plain read of the operand.
///
/// Suppressed entirely when the operand is not an assignable storage
/// location; other unary operators (`!`, unary `-`) are never mutated.
pub struct UnaryExprOperator;

impl MutationOperator for UnaryExprOperator {
    fn applies_to(&self, expr: &Expr) -> bool {
        let (op, _, operand) = parts(expr);
        op.mutates_operand() && operand.is_assignable_place() && operand.ty.is_numeric()
    }

    fn original(&self, expr: &Expr) -> ExpressionRecord {
        let (op, fixity, _) = parts(expr);
        ExpressionRecord::unary(op, fixity)
    }

    fn valid_mutants(&self, expr: &Expr) -> Vec<ExpressionRecord> {
        let (op, fixity, _) = parts(expr);
        let Some(opposite) = op.opposite() else {
            return Vec::new();
        };
        vec![
            ExpressionRecord::unary(opposite, fixity),
            ExpressionRecord::operand_a(),
        ]
    }

    fn parameter_types(&self, expr: &Expr) -> Vec<TypeDescriptor> {
        let (_, _, operand) = parts(expr);
        vec![operand.ty.clone()]
    }

    fn return_type(&self, expr: &Expr) -> TypeDescriptor {
        let (_, _, operand) = parts(expr);
        operand.ty.clone()
    }

    fn operand_kind(&self, _expr: &Expr) -> OperandKind {
        OperandKind::MutableRef
    }

    fn schema_base_name(&self) -> &'static str {
        "UnaryExprSchema"
    }
}

fn parts(expr: &Expr) -> (UnaryOp, Fixity, &Expr) {
    match &expr.kind {
        ExprKind::Unary {
            op,
            fixity,
            operand,
        } => (*op, *fixity, operand),
        _ => unreachable!("unary operator dispatched on a non-unary node"),
    }
}
