use crate::ast::{Expr, ExprKind, TypeDescriptor};
use crate::expr::{BinOp, ExpressionRecord, OpFamily, OperandKind};
use crate::operators::MutationOperator;

/// Binary expressions mutate within their operator family, pruned by the
/// minimal-covering redundancy rules.
///
/// The retained sets for the relational/equality families are an observed
/// contract, not derived from a proof; see the tables in `relational_set`
/// and `equality_set`.
pub struct BinaryExprOperator;

impl MutationOperator for BinaryExprOperator {
    fn applies_to(&self, expr: &Expr) -> bool {
        let (op, lhs, rhs) = parts(expr);
        match op.family() {
            OpFamily::Logical => lhs.ty == TypeDescriptor::Bool && rhs.ty == TypeDescriptor::Bool,
            OpFamily::Relational => lhs.ty.is_ordered() && rhs.ty.is_ordered(),
            OpFamily::Equality => lhs.ty == rhs.ty,
            OpFamily::Arithmetic | OpFamily::Bitwise | OpFamily::Shift => {
                lhs.ty.is_numeric() && rhs.ty.is_numeric()
            }
        }
    }

    fn original(&self, expr: &Expr) -> ExpressionRecord {
        let (op, _, _) = parts(expr);
        if op.is_short_circuit() {
            ExpressionRecord::binary_thunked(op)
        } else {
            ExpressionRecord::binary(op)
        }
    }

    fn valid_mutants(&self, expr: &Expr) -> Vec<ExpressionRecord> {
        let (op, lhs, rhs) = parts(expr);
        match op.family() {
            OpFamily::Relational => relational_set(op),
            OpFamily::Equality => equality_set(op, lhs.ty.is_ordered()),
            OpFamily::Logical => logical_set(op),
            OpFamily::Arithmetic => arithmetic_set(op, lhs, rhs),
            OpFamily::Bitwise => family_minus(&[BinOp::BitAnd, BinOp::BitXor, BinOp::BitOr], op),
            OpFamily::Shift => family_minus(&[BinOp::Shl, BinOp::Shr], op),
        }
    }

    fn parameter_types(&self, expr: &Expr) -> Vec<TypeDescriptor> {
        let (_, lhs, rhs) = parts(expr);
        vec![lhs.ty.clone(), rhs.ty.clone()]
    }

    fn return_type(&self, expr: &Expr) -> TypeDescriptor {
        let (op, lhs, _) = parts(expr);
        if op.is_comparison() {
            TypeDescriptor::Bool
        } else {
            lhs.ty.clone()
        }
    }

    fn operand_kind(&self, expr: &Expr) -> OperandKind {
        let (op, _, _) = parts(expr);
        if op.is_short_circuit() {
            OperandKind::Thunk
        } else {
            OperandKind::Value
        }
    }

    fn schema_base_name(&self) -> &'static str {
        "BinaryExprSchema"
    }
}

fn parts(expr: &Expr) -> (BinOp, &Expr, &Expr) {
    match &expr.kind {
        ExprKind::Binary { op, lhs, rhs } => (*op, lhs, rhs),
        _ => unreachable!("binary operator dispatched on a non-binary node"),
    }
}

/// Retained mutant set for the relational family.
///
/// Each operator keeps a constant, its boundary counterpart, and the
/// (in)equality that separates it from that counterpart; the remaining family
/// members are implied by the retained trio for arbitrary operands.
fn relational_set(op: BinOp) -> Vec<ExpressionRecord> {
    let (constant, rest) = match op {
        BinOp::Gt => (false, [BinOp::Ge, BinOp::Ne]),
        BinOp::Ge => (true, [BinOp::Gt, BinOp::Eq]),
        BinOp::Lt => (false, [BinOp::Le, BinOp::Ne]),
        BinOp::Le => (true, [BinOp::Lt, BinOp::Eq]),
        _ => unreachable!("not a relational operator: {op:?}"),
    };

    let mut out = vec![ExpressionRecord::bool_lit(constant)];
    out.extend(rest.into_iter().map(ExpressionRecord::binary));
    out
}

/// Retained mutant set for the equality family. Ordered operand types get the
/// boundary pair; other types only support the opposite test.
fn equality_set(op: BinOp, ordered: bool) -> Vec<ExpressionRecord> {
    match (op, ordered) {
        (BinOp::Eq, true) => vec![
            ExpressionRecord::bool_lit(false),
            ExpressionRecord::binary(BinOp::Le),
            ExpressionRecord::binary(BinOp::Ge),
        ],
        (BinOp::Eq, false) => vec![
            ExpressionRecord::bool_lit(false),
            ExpressionRecord::binary(BinOp::Ne),
        ],
        (BinOp::Ne, true) => vec![
            ExpressionRecord::bool_lit(true),
            ExpressionRecord::binary(BinOp::Lt),
            ExpressionRecord::binary(BinOp::Gt),
        ],
        (BinOp::Ne, false) => vec![
            ExpressionRecord::bool_lit(true),
            ExpressionRecord::binary(BinOp::Eq),
        ],
        _ => unreachable!("not an equality operator: {op:?}"),
    }
}

/// Mutants for the short-circuit operators. Evaluating both operands differs
/// observably from the original, so all variants work over thunks: return one
/// operand unevaluated-as-is, or compare both without short-circuiting.
fn logical_set(op: BinOp) -> Vec<ExpressionRecord> {
    match op {
        BinOp::AndAnd => vec![
            ExpressionRecord::bool_lit(false),
            ExpressionRecord::thunk_a(),
            ExpressionRecord::thunk_b(),
            ExpressionRecord::binary_thunked(BinOp::Eq),
        ],
        BinOp::OrOr => vec![
            ExpressionRecord::bool_lit(true),
            ExpressionRecord::thunk_a(),
            ExpressionRecord::thunk_b(),
            ExpressionRecord::binary_thunked(BinOp::Ne),
        ],
        _ => unreachable!("not a short-circuit operator: {op:?}"),
    }
}

const ARITHMETIC: [BinOp; 5] = [BinOp::Add, BinOp::Sub, BinOp::Mul, BinOp::Div, BinOp::Rem];
const BITWISE: [BinOp; 3] = [BinOp::BitAnd, BinOp::BitXor, BinOp::BitOr];

/// Arithmetic family minus the original. An additive expression with a
/// literal `0` or `1` operand additionally gains the bitwise family and
/// loses the arithmetic members that reduce to a no-op for that operand.
fn arithmetic_set(op: BinOp, lhs: &Expr, rhs: &Expr) -> Vec<ExpressionRecord> {
    let lhs_lit = lhs.as_int_literal();
    let rhs_lit = rhs.as_int_literal();
    let special = op == BinOp::Add
        && (matches!(lhs_lit, Some(0 | 1)) || matches!(rhs_lit, Some(0 | 1)));

    if !special {
        return family_minus(&ARITHMETIC, op);
    }

    let mut out: Vec<ExpressionRecord> = ARITHMETIC
        .into_iter()
        .filter(|&c| c != op && !is_identity_for(c, lhs_lit, rhs_lit))
        .map(ExpressionRecord::binary)
        .collect();
    out.extend(BITWISE.into_iter().map(ExpressionRecord::binary));
    out
}

/// Does `x c L == x` (or `L c x == x`) hold for all x, given the literal
/// operand? Such a candidate is a no-op and is pruned.
fn is_identity_for(c: BinOp, lhs_lit: Option<i128>, rhs_lit: Option<i128>) -> bool {
    match c {
        BinOp::Add => lhs_lit == Some(0) || rhs_lit == Some(0),
        BinOp::Sub => rhs_lit == Some(0),
        BinOp::Mul => lhs_lit == Some(1) || rhs_lit == Some(1),
        BinOp::Div => rhs_lit == Some(1),
        _ => false,
    }
}

fn family_minus(family: &[BinOp], original: BinOp) -> Vec<ExpressionRecord> {
    family
        .iter()
        .filter(|&&c| c != original)
        .map(|&c| ExpressionRecord::binary(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::create_mutation_group;
    use crate::operators::testutil::*;

    fn int_vars(op: BinOp) -> Expr {
        binary(
            op,
            ident("x", TypeDescriptor::I32),
            ident("y", TypeDescriptor::I32),
        )
    }

    fn bool_vars(op: BinOp) -> Expr {
        binary(
            op,
            ident("p", TypeDescriptor::Bool),
            ident("q", TypeDescriptor::Bool),
        )
    }

    #[test]
    fn greater_than_retains_exactly_the_minimal_trio() {
        let group = create_mutation_group(&int_vars(BinOp::Gt)).unwrap();
        assert_eq!(templates(&group), vec!["false", "{0} >= {1}", "{0} != {1}"]);
        assert_eq!(group.return_type, TypeDescriptor::Bool);
        assert_eq!(group.operand_kind, OperandKind::Value);
    }

    #[test]
    fn remaining_relational_tables() {
        let cases = [
            (BinOp::Ge, vec!["true", "{0} > {1}", "{0} == {1}"]),
            (BinOp::Lt, vec!["false", "{0} <= {1}", "{0} != {1}"]),
            (BinOp::Le, vec!["true", "{0} < {1}", "{0} == {1}"]),
        ];
        for (op, want) in cases {
            let group = create_mutation_group(&int_vars(op)).unwrap();
            assert_eq!(templates(&group), want, "operator {op:?}");
        }
    }

    #[test]
    fn equality_on_ordered_operands_gets_boundary_pair() {
        let group = create_mutation_group(&int_vars(BinOp::Eq)).unwrap();
        assert_eq!(templates(&group), vec!["false", "{0} <= {1}", "{0} >= {1}"]);

        let group = create_mutation_group(&int_vars(BinOp::Ne)).unwrap();
        assert_eq!(templates(&group), vec!["true", "{0} < {1}", "{0} > {1}"]);
    }

    #[test]
    fn equality_on_unordered_operands_only_flips() {
        let group = create_mutation_group(&bool_vars(BinOp::Eq)).unwrap();
        assert_eq!(templates(&group), vec!["false", "{0} != {1}"]);
    }

    #[test]
    fn short_circuit_and_yields_thunk_variants() {
        let group = create_mutation_group(&bool_vars(BinOp::AndAnd)).unwrap();
        assert_eq!(
            templates(&group),
            vec!["false", "{0}()", "{1}()", "{0}() == {1}()"]
        );
        assert_eq!(group.operand_kind, OperandKind::Thunk);
        assert_eq!(group.original.template, "{0}() && {1}()");
    }

    #[test]
    fn short_circuit_or_yields_thunk_variants() {
        let group = create_mutation_group(&bool_vars(BinOp::OrOr)).unwrap();
        assert_eq!(
            templates(&group),
            vec!["true", "{0}()", "{1}()", "{0}() != {1}()"]
        );
    }

    #[test]
    fn plain_arithmetic_mutates_within_family() {
        let group = create_mutation_group(&int_vars(BinOp::Mul)).unwrap();
        assert_eq!(
            templates(&group),
            vec!["{0} + {1}", "{0} - {1}", "{0} / {1}", "{0} % {1}"]
        );
        assert_eq!(group.return_type, TypeDescriptor::I32);
    }

    #[test]
    fn additive_zero_drops_noop_and_gains_bitwise() {
        let node = binary(
            BinOp::Add,
            ident("x", TypeDescriptor::I32),
            int(0, TypeDescriptor::I32),
        );
        let group = create_mutation_group(&node).unwrap();
        // x - 0 is a no-op; multiplication, division and modulo survive,
        // plus the full bitwise family.
        assert_eq!(
            templates(&group),
            vec![
                "{0} * {1}",
                "{0} / {1}",
                "{0} % {1}",
                "{0} & {1}",
                "{0} ^ {1}",
                "{0} | {1}"
            ]
        );
    }

    #[test]
    fn additive_one_drops_multiplicative_noops() {
        let node = binary(
            BinOp::Add,
            ident("x", TypeDescriptor::I32),
            int(1, TypeDescriptor::I32),
        );
        let group = create_mutation_group(&node).unwrap();
        assert_eq!(
            templates(&group),
            vec![
                "{0} - {1}",
                "{0} % {1}",
                "{0} & {1}",
                "{0} ^ {1}",
                "{0} | {1}"
            ]
        );
    }

    #[test]
    fn bitwise_and_shift_families() {
        let group = create_mutation_group(&int_vars(BinOp::BitXor)).unwrap();
        assert_eq!(templates(&group), vec!["{0} & {1}", "{0} | {1}"]);

        let group = create_mutation_group(&int_vars(BinOp::Shl)).unwrap();
        assert_eq!(templates(&group), vec!["{0} >> {1}"]);
    }

    #[test]
    fn logical_operator_requires_bool_operands() {
        let op = BinaryExprOperator;
        assert!(!op.applies_to(&int_vars(BinOp::AndAnd)));
        assert!(op.applies_to(&bool_vars(BinOp::OrOr)));
    }

    #[test]
    fn parameter_types_follow_operands() {
        let node = binary(
            BinOp::Gt,
            ident("x", TypeDescriptor::I64),
            ident("y", TypeDescriptor::I64),
        );
        let group = create_mutation_group(&node).unwrap();
        assert_eq!(
            group.parameter_types,
            vec![TypeDescriptor::I64, TypeDescriptor::I64]
        );
    }
}
