use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ast::TypeDescriptor;
use crate::expr::{ExpressionRecord, OperandKind};
use crate::span::{LineSpan, SourceSpan};

/// Where a mutation site sits in its file.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteLocation {
    pub span: SourceSpan,
    pub line_span: LineSpan,
}

/// All candidate mutants proposed for one mutation site, plus the metadata
/// needed to generate its dispatch routine.
///
/// Equality and hashing ignore `location`: two textually distinct sites with
/// the same operator shape and type signature are the same group and share a
/// generated routine. `mutants` is never empty; a site with no valid mutants
/// never produces a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationGroup {
    /// Base name for the generated routine (a dedup suffix id is appended).
    pub schema_base_name: String,

    /// Shape of the original expression.
    pub original: ExpressionRecord,

    /// Candidate mutant shapes, in a deterministic order.
    pub mutants: Vec<ExpressionRecord>,

    /// Types of the routine's operand parameters.
    pub parameter_types: Vec<TypeDescriptor>,

    /// Result type of the routine.
    pub return_type: TypeDescriptor,

    /// How the routine receives its operands.
    pub operand_kind: OperandKind,

    /// Source location of the site. Excluded from equality and hash.
    pub location: SiteLocation,
}

impl MutationGroup {
    /// Number of candidate mutants; always at least 1.
    pub fn mutant_count(&self) -> u64 {
        self.mutants.len() as u64
    }
}

impl PartialEq for MutationGroup {
    fn eq(&self, other: &Self) -> bool {
        self.schema_base_name == other.schema_base_name
            && self.original == other.original
            && self.mutants == other.mutants
            && self.parameter_types == other.parameter_types
            && self.return_type == other.return_type
            && self.operand_kind == other.operand_kind
    }
}

impl Eq for MutationGroup {}

impl Hash for MutationGroup {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.schema_base_name.hash(state);
        self.original.hash(state);
        self.mutants.hash(state);
        self.parameter_types.hash(state);
        self.return_type.hash(state);
        self.operand_kind.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::BinOp;
    use std::collections::hash_map::DefaultHasher;

    fn group_at(start: u32) -> MutationGroup {
        MutationGroup {
            schema_base_name: "BinaryExprSchema".to_string(),
            original: ExpressionRecord::binary(BinOp::Gt),
            mutants: vec![
                ExpressionRecord::bool_lit(false),
                ExpressionRecord::binary(BinOp::Ge),
                ExpressionRecord::binary(BinOp::Ne),
            ],
            parameter_types: vec![TypeDescriptor::I32, TypeDescriptor::I32],
            return_type: TypeDescriptor::Bool,
            operand_kind: OperandKind::Value,
            location: SiteLocation {
                span: SourceSpan::new(start, 5),
                line_span: LineSpan::new(1, start, 1, start + 5),
            },
        }
    }

    fn hash_of(g: &MutationGroup) -> u64 {
        let mut h = DefaultHasher::new();
        g.hash(&mut h);
        h.finish()
    }

    #[test]
    fn equality_ignores_location() {
        let a = group_at(10);
        let b = group_at(99);
        assert_ne!(a.location, b.location);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn equality_observes_every_other_field() {
        let base = group_at(10);

        let mut other = base.clone();
        other.original = ExpressionRecord::binary(BinOp::Lt);
        assert_ne!(base, other);

        let mut other = base.clone();
        other.parameter_types = vec![TypeDescriptor::I64, TypeDescriptor::I64];
        assert_ne!(base, other);

        let mut other = base.clone();
        other.mutants.pop();
        assert_ne!(base, other);

        let mut other = base.clone();
        other.operand_kind = OperandKind::Thunk;
        assert_ne!(base, other);
    }
}
