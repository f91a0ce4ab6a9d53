use crate::ast::{Expr, ExprKind, TypeDescriptor};
use crate::expr::{BinOp, ExpressionRecord, OpFamily, OperandKind};
use crate::operators::MutationOperator;

/// Compound assignments (`op=`) mutate within the underlying operator's
/// family, with extra pruning when the right-hand side is a literal that
/// renders arithmetic variants redundant.
pub struct CompoundAssignOperator;

impl MutationOperator for CompoundAssignOperator {
    fn applies_to(&self, expr: &Expr) -> bool {
        let (op, lhs, rhs) = parts(expr);
        lhs.is_assignable_place()
            && op.supports_compound_assign()
            && lhs.ty.is_numeric()
            && rhs.ty.is_numeric()
    }

    fn original(&self, expr: &Expr) -> ExpressionRecord {
        let (op, _, _) = parts(expr);
        ExpressionRecord::compound_assign(op)
    }

    fn valid_mutants(&self, expr: &Expr) -> Vec<ExpressionRecord> {
        let (op, _, rhs) = parts(expr);
        match op.family() {
            OpFamily::Arithmetic => arithmetic_assign_set(op, rhs),
            OpFamily::Bitwise => family_minus(&BITWISE, op),
            OpFamily::Shift => family_minus(&[BinOp::Shl, BinOp::Shr], op),
            _ => unreachable!("operator does not support compound assignment: {op:?}"),
        }
    }

    fn parameter_types(&self, expr: &Expr) -> Vec<TypeDescriptor> {
        let (_, lhs, rhs) = parts(expr);
        vec![lhs.ty.clone(), rhs.ty.clone()]
    }

    fn return_type(&self, expr: &Expr) -> TypeDescriptor {
        let (_, lhs, _) = parts(expr);
        lhs.ty.clone()
    }

    fn operand_kind(&self, _expr: &Expr) -> OperandKind {
        OperandKind::MutableRef
    }

    fn schema_base_name(&self) -> &'static str {
        "CompoundAssignSchema"
    }
}

fn parts(expr: &Expr) -> (BinOp, &Expr, &Expr) {
    match &expr.kind {
        ExprKind::CompoundAssign { op, lhs, rhs } => (*op, lhs, rhs),
        _ => unreachable!("compound-assign operator dispatched on a different node"),
    }
}

const ARITHMETIC: [BinOp; 5] = [BinOp::Add, BinOp::Sub, BinOp::Mul, BinOp::Div, BinOp::Rem];
const BITWISE: [BinOp; 3] = [BinOp::BitAnd, BinOp::BitXor, BinOp::BitOr];

/// Arithmetic compound assignments with a literal right-hand side:
/// `x op= 0` keeps only the bitwise variants (every arithmetic variant is
/// either a no-op or collapses the place to a constant), and `x op= 1`
/// drops the no-op variants but keeps the rest alongside the bitwise family.
fn arithmetic_assign_set(op: BinOp, rhs: &Expr) -> Vec<ExpressionRecord> {
    match rhs.as_int_literal() {
        Some(0) => BITWISE
            .into_iter()
            .map(ExpressionRecord::compound_assign)
            .collect(),
        Some(1) => {
            let mut out: Vec<ExpressionRecord> = ARITHMETIC
                .into_iter()
                .filter(|&c| c != op && !is_identity_with_one(c))
                .map(ExpressionRecord::compound_assign)
                .collect();
            out.extend(BITWISE.into_iter().map(ExpressionRecord::compound_assign));
            out
        }
        _ => ARITHMETIC
            .into_iter()
            .filter(|&c| c != op)
            .map(ExpressionRecord::compound_assign)
            .collect(),
    }
}

/// `x *= 1` and `x /= 1` leave the place unchanged.
fn is_identity_with_one(c: BinOp) -> bool {
    matches!(c, BinOp::Mul | BinOp::Div)
}

fn family_minus(family: &[BinOp], original: BinOp) -> Vec<ExpressionRecord> {
    family
        .iter()
        .filter(|&&c| c != original)
        .map(|&c| ExpressionRecord::compound_assign(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::create_mutation_group;
    use crate::operators::testutil::*;

    #[test]
    fn add_assign_zero_retains_only_bitwise() {
        let node = compound(
            BinOp::Add,
            ident("x", TypeDescriptor::I32),
            int(0, TypeDescriptor::I32),
        );
        let group = create_mutation_group(&node).unwrap();
        assert_eq!(
            templates(&group),
            vec!["{0} &= {1}", "{0} ^= {1}", "{0} |= {1}"]
        );
        assert_eq!(group.operand_kind, OperandKind::MutableRef);
        assert_eq!(group.return_type, TypeDescriptor::I32);
    }

    #[test]
    fn add_assign_one_drops_noop_variants() {
        let node = compound(
            BinOp::Add,
            ident("x", TypeDescriptor::I32),
            int(1, TypeDescriptor::I32),
        );
        let group = create_mutation_group(&node).unwrap();
        assert_eq!(
            templates(&group),
            vec![
                "{0} -= {1}",
                "{0} %= {1}",
                "{0} &= {1}",
                "{0} ^= {1}",
                "{0} |= {1}"
            ]
        );
    }

    #[test]
    fn non_literal_rhs_mutates_within_family() {
        let node = compound(
            BinOp::Sub,
            ident("x", TypeDescriptor::I32),
            ident("y", TypeDescriptor::I32),
        );
        let group = create_mutation_group(&node).unwrap();
        assert_eq!(
            templates(&group),
            vec!["{0} += {1}", "{0} *= {1}", "{0} /= {1}", "{0} %= {1}"]
        );
    }

    #[test]
    fn bitwise_assign_mutates_within_family() {
        let node = compound(
            BinOp::BitAnd,
            ident("x", TypeDescriptor::U32),
            ident("y", TypeDescriptor::U32),
        );
        let group = create_mutation_group(&node).unwrap();
        assert_eq!(templates(&group), vec!["{0} ^= {1}", "{0} |= {1}"]);
    }

    #[test]
    fn shift_assign_swaps_direction() {
        let node = compound(
            BinOp::Shl,
            ident("x", TypeDescriptor::U32),
            int(2, TypeDescriptor::U32),
        );
        let group = create_mutation_group(&node).unwrap();
        assert_eq!(templates(&group), vec!["{0} >>= {1}"]);
    }

    #[test]
    fn unassignable_target_is_ineligible() {
        let op = CompoundAssignOperator;
        let mut lhs = ident("x", TypeDescriptor::I32);
        if let ExprKind::Ident { assignable, .. } = &mut lhs.kind {
            *assignable = false;
        }
        let node = compound(BinOp::Add, lhs, int(2, TypeDescriptor::I32));
        assert!(!op.applies_to(&node));
    }
}
