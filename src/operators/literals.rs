use crate::ast::{Expr, ExprKind, TypeDescriptor};
use crate::expr::{ExpressionRecord, OperandKind};
use crate::operators::MutationOperator;

/// Boolean constants mutate to their logical negation.
pub struct BoolLiteralOperator;

impl MutationOperator for BoolLiteralOperator {
    fn applies_to(&self, expr: &Expr) -> bool {
        matches!(expr.kind, ExprKind::Bool(_))
    }

    fn original(&self, expr: &Expr) -> ExpressionRecord {
        ExpressionRecord::bool_lit(bool_value(expr))
    }

    fn valid_mutants(&self, expr: &Expr) -> Vec<ExpressionRecord> {
        vec![ExpressionRecord::bool_lit(!bool_value(expr))]
    }

    fn parameter_types(&self, _expr: &Expr) -> Vec<TypeDescriptor> {
        Vec::new()
    }

    fn return_type(&self, _expr: &Expr) -> TypeDescriptor {
        TypeDescriptor::Bool
    }

    fn operand_kind(&self, _expr: &Expr) -> OperandKind {
        OperandKind::Value
    }

    fn schema_base_name(&self) -> &'static str {
        "BooleanLiteralSchema"
    }
}

/// Numeric constants `v` mutate to `{0, -v, v-1, v+1}`, value-distinct only.
///
/// Sign negation is skipped for unsigned types (not type-preserving), and
/// `v-1` is skipped for an unsigned zero for the same reason.
pub struct NumericLiteralOperator;

impl MutationOperator for NumericLiteralOperator {
    fn applies_to(&self, expr: &Expr) -> bool {
        matches!(expr.kind, ExprKind::Int(_)) && expr.ty.is_numeric()
    }

    fn original(&self, expr: &Expr) -> ExpressionRecord {
        ExpressionRecord::int_lit(int_value(expr))
    }

    fn valid_mutants(&self, expr: &Expr) -> Vec<ExpressionRecord> {
        let v = int_value(expr);
        let signed = expr.ty.is_signed();

        let mut candidates: Vec<i128> = Vec::with_capacity(4);
        candidates.push(0);
        if signed {
            candidates.push(-v);
        }
        if signed || v > 0 {
            candidates.push(v - 1);
        }
        candidates.push(v + 1);

        let mut mutants = Vec::new();
        let mut seen = Vec::new();
        for c in candidates {
            // Degenerate (equal to the original) and duplicate candidates
            // collapse away.
            if c == v || seen.contains(&c) {
                continue;
            }
            seen.push(c);
            mutants.push(ExpressionRecord::int_lit(c));
        }
        mutants
    }

    fn parameter_types(&self, _expr: &Expr) -> Vec<TypeDescriptor> {
        Vec::new()
    }

    fn return_type(&self, expr: &Expr) -> TypeDescriptor {
        expr.ty.clone()
    }

    fn operand_kind(&self, _expr: &Expr) -> OperandKind {
        OperandKind::Value
    }

    fn schema_base_name(&self) -> &'static str {
        "NumericLiteralSchema"
    }
}

/// Non-empty string constants mutate to the empty string.
pub struct StringLiteralOperator;

impl MutationOperator for StringLiteralOperator {
    fn applies_to(&self, expr: &Expr) -> bool {
        matches!(expr.kind, ExprKind::Str(_))
    }

    fn original(&self, expr: &Expr) -> ExpressionRecord {
        ExpressionRecord::str_lit(str_value(expr))
    }

    fn valid_mutants(&self, expr: &Expr) -> Vec<ExpressionRecord> {
        if str_value(expr).is_empty() {
            return Vec::new();
        }
        vec![ExpressionRecord::str_lit("")]
    }

    fn parameter_types(&self, _expr: &Expr) -> Vec<TypeDescriptor> {
        Vec::new()
    }

    fn return_type(&self, _expr: &Expr) -> TypeDescriptor {
        TypeDescriptor::Str
    }

    fn operand_kind(&self, _expr: &Expr) -> OperandKind {
        OperandKind::Value
    }

    fn schema_base_name(&self) -> &'static str {
        "StringLiteralSchema"
    }
}

fn bool_value(expr: &Expr) -> bool {
    match expr.kind {
        ExprKind::Bool(v) => v,
        _ => unreachable!("bool literal operator dispatched on a non-bool node"),
    }
}

fn int_value(expr: &Expr) -> i128 {
    match expr.kind {
        ExprKind::Int(v) => v,
        _ => unreachable!("numeric literal operator dispatched on a non-numeric node"),
    }
}

fn str_value(expr: &Expr) -> &str {
    match &expr.kind {
        ExprKind::Str(v) => v,
        _ => unreachable!("string literal operator dispatched on a non-string node"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::create_mutation_group;
    use crate::operators::testutil::*;

    #[test]
    fn bool_literal_negates() {
        let group = create_mutation_group(&expr(ExprKind::Bool(true), TypeDescriptor::Bool))
            .expect("bool literal should produce a group");
        assert_eq!(templates(&group), vec!["false"]);

        let group = create_mutation_group(&expr(ExprKind::Bool(false), TypeDescriptor::Bool))
            .expect("bool literal should produce a group");
        assert_eq!(templates(&group), vec!["true"]);
    }

    #[test]
    fn signed_zero_yields_minus_one_and_one() {
        let group = create_mutation_group(&int(0, TypeDescriptor::I32)).unwrap();
        assert_eq!(templates(&group), vec!["-1", "1"]);
    }

    #[test]
    fn zero_never_yields_itself() {
        for ty in [TypeDescriptor::I32, TypeDescriptor::U32] {
            let group = create_mutation_group(&int(0, ty)).unwrap();
            assert!(!templates(&group).contains(&"0"));
        }
    }

    #[test]
    fn unsigned_literal_has_no_sign_negation() {
        let group = create_mutation_group(&int(5, TypeDescriptor::U64)).unwrap();
        assert_eq!(templates(&group), vec!["0", "4", "6"]);
    }

    #[test]
    fn unsigned_zero_only_grows() {
        let group = create_mutation_group(&int(0, TypeDescriptor::U32)).unwrap();
        assert_eq!(templates(&group), vec!["1"]);
    }

    #[test]
    fn one_collapses_duplicate_candidates() {
        // For v = 1 the candidates 0 and v-1 coincide.
        let group = create_mutation_group(&int(1, TypeDescriptor::I32)).unwrap();
        assert_eq!(templates(&group), vec!["0", "-1", "2"]);
    }

    #[test]
    fn signed_literal_keeps_all_four() {
        let group = create_mutation_group(&int(5, TypeDescriptor::I64)).unwrap();
        assert_eq!(templates(&group), vec!["0", "-5", "4", "6"]);
    }

    #[test]
    fn string_literal_empties() {
        let group =
            create_mutation_group(&expr(ExprKind::Str("abc".to_string()), TypeDescriptor::Str))
                .unwrap();
        assert_eq!(templates(&group), vec!["\"\""]);
        assert_eq!(group.original.template, "\"abc\"");
    }

    #[test]
    fn empty_string_is_left_alone() {
        let node = expr(ExprKind::Str(String::new()), TypeDescriptor::Str);
        assert!(create_mutation_group(&node).is_none());
    }
}
