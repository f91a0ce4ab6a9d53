//! The operator catalog: one stateless strategy per syntactic node shape.
//!
//! Node shapes are partitioned over the operators by a closed match in
//! [`operator_for`], so at most one operator can ever claim a node; the
//! "two operators claim the same node" fault class cannot occur.

mod binary;
mod compound;
mod literals;
mod unary;

pub use binary::BinaryExprOperator;
pub use compound::CompoundAssignOperator;
pub use literals::{BoolLiteralOperator, NumericLiteralOperator, StringLiteralOperator};
pub use unary::UnaryExprOperator;

use crate::ast::{Expr, ExprKind, TypeDescriptor};
use crate::expr::{ExpressionRecord, OperandKind};
use crate::group::{MutationGroup, SiteLocation};

/// Capability set of one mutation operator, specialized to one node shape.
pub trait MutationOperator: Sync {
    /// Is this node eligible for mutation? Returning false is not an error;
    /// the site is simply left unmutated.
    fn applies_to(&self, expr: &Expr) -> bool;

    /// Shape of the original expression at this site.
    fn original(&self, expr: &Expr) -> ExpressionRecord;

    /// Candidate mutant shapes after deduplication and redundancy pruning.
    /// May be empty, in which case no group is built.
    fn valid_mutants(&self, expr: &Expr) -> Vec<ExpressionRecord>;

    /// Types of the operands the dispatch routine receives.
    fn parameter_types(&self, expr: &Expr) -> Vec<TypeDescriptor>;

    /// Result type of the dispatch routine.
    fn return_type(&self, expr: &Expr) -> TypeDescriptor;

    /// How the routine receives its operands.
    fn operand_kind(&self, expr: &Expr) -> OperandKind;

    /// Base name of the generated routine; a dedup suffix id is appended.
    fn schema_base_name(&self) -> &'static str;
}

static BOOL_LITERAL: BoolLiteralOperator = BoolLiteralOperator;
static NUMERIC_LITERAL: NumericLiteralOperator = NumericLiteralOperator;
static STRING_LITERAL: StringLiteralOperator = StringLiteralOperator;
static BINARY_EXPR: BinaryExprOperator = BinaryExprOperator;
static COMPOUND_ASSIGN: CompoundAssignOperator = CompoundAssignOperator;
static UNARY_EXPR: UnaryExprOperator = UnaryExprOperator;

/// Closed dispatch over node shapes. Each shape maps to exactly one operator;
/// shapes with no operator are never mutated.
pub fn operator_for(expr: &Expr) -> Option<&'static dyn MutationOperator> {
    match &expr.kind {
        ExprKind::Bool(_) => Some(&BOOL_LITERAL),
        ExprKind::Int(_) => Some(&NUMERIC_LITERAL),
        ExprKind::Str(_) => Some(&STRING_LITERAL),
        ExprKind::Binary { .. } => Some(&BINARY_EXPR),
        ExprKind::CompoundAssign { .. } => Some(&COMPOUND_ASSIGN),
        ExprKind::Unary { .. } => Some(&UNARY_EXPR),
        _ => None,
    }
}

/// Build the mutation group for a node, or `None` when the node is ineligible
/// or every candidate was pruned. Never an error either way.
pub fn create_mutation_group(expr: &Expr) -> Option<MutationGroup> {
    create_mutation_group_typed(expr, None)
}

/// Like [`create_mutation_group`] but pins the routine's return type, used
/// when a literal is mutated in a context whose type differs from the
/// literal's own (the right-hand side of a compound assignment).
pub fn create_mutation_group_typed(
    expr: &Expr,
    return_type: Option<TypeDescriptor>,
) -> Option<MutationGroup> {
    let op = operator_for(expr)?;
    if !op.applies_to(expr) {
        return None;
    }

    let mutants = op.valid_mutants(expr);
    if mutants.is_empty() {
        return None;
    }

    Some(MutationGroup {
        schema_base_name: op.schema_base_name().to_string(),
        original: op.original(expr),
        mutants,
        parameter_types: op.parameter_types(expr),
        return_type: return_type.unwrap_or_else(|| op.return_type(expr)),
        operand_kind: op.operand_kind(expr),
        location: SiteLocation {
            span: expr.span,
            line_span: expr.line_span,
        },
    })
}
