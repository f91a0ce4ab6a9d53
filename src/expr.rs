use serde::{Deserialize, Serialize};

/// Binary operators of the surface language.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitXor,
    BitOr,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
}

/// Operator family used for mutant candidate selection.
///
/// Families partition the binary operators: a mutant operator is only ever
/// drawn from the family of the original (the short-circuit operators get
/// extra thunk-based variants on top).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpFamily {
    Arithmetic,
    Bitwise,
    Shift,
    Equality,
    Relational,
    Logical,
}

impl BinOp {
    pub fn token(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::BitAnd => "&",
            BinOp::BitXor => "^",
            BinOp::BitOr => "|",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::AndAnd => "&&",
            BinOp::OrOr => "||",
        }
    }

    pub fn family(&self) -> OpFamily {
        match self {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => OpFamily::Arithmetic,
            BinOp::BitAnd | BinOp::BitXor | BinOp::BitOr => OpFamily::Bitwise,
            BinOp::Shl | BinOp::Shr => OpFamily::Shift,
            BinOp::Eq | BinOp::Ne => OpFamily::Equality,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => OpFamily::Relational,
            BinOp::AndAnd | BinOp::OrOr => OpFamily::Logical,
        }
    }

    /// Operators whose right operand must not be evaluated eagerly.
    pub fn is_short_circuit(&self) -> bool {
        matches!(self, BinOp::AndAnd | BinOp::OrOr)
    }

    /// Operators producing a boolean regardless of operand types.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self.family(),
            OpFamily::Equality | OpFamily::Relational | OpFamily::Logical
        )
    }

    /// Operators allowed in compound assignment (`op=`).
    pub fn supports_compound_assign(&self) -> bool {
        matches!(
            self.family(),
            OpFamily::Arithmetic | OpFamily::Bitwise | OpFamily::Shift
        )
    }

    /// Descriptive name used in flattened mutation records.
    pub fn record_name(&self) -> &'static str {
        match self {
            BinOp::Add => "Add",
            BinOp::Sub => "Subtract",
            BinOp::Mul => "Multiply",
            BinOp::Div => "Divide",
            BinOp::Rem => "Modulo",
            BinOp::BitAnd => "BitwiseAnd",
            BinOp::BitXor => "BitwiseXor",
            BinOp::BitOr => "BitwiseOr",
            BinOp::Shl => "LeftShift",
            BinOp::Shr => "RightShift",
            BinOp::Eq => "Equals",
            BinOp::Ne => "NotEquals",
            BinOp::Lt => "LessThan",
            BinOp::Le => "LessThanOrEqual",
            BinOp::Gt => "GreaterThan",
            BinOp::Ge => "GreaterThanOrEqual",
            BinOp::AndAnd => "LogicalAnd",
            BinOp::OrOr => "LogicalOr",
        }
    }
}

/// Prefix/postfix unary operators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Inc,
    Dec,
    Not,
    Neg,
}

impl UnaryOp {
    pub fn token(&self) -> &'static str {
        match self {
            UnaryOp::Inc => "++",
            UnaryOp::Dec => "--",
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
        }
    }

    /// The increment/decrement operators update their operand in place.
    pub fn mutates_operand(&self) -> bool {
        matches!(self, UnaryOp::Inc | UnaryOp::Dec)
    }

    pub fn opposite(&self) -> Option<UnaryOp> {
        match self {
            UnaryOp::Inc => Some(UnaryOp::Dec),
            UnaryOp::Dec => Some(UnaryOp::Inc),
            _ => None,
        }
    }
}

/// Whether a unary operator appears before or after its operand.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Fixity {
    Prefix,
    Postfix,
}

/// How a dispatch routine receives its operands.
///
/// Thunk operands are zero-argument closures so the routine can preserve the
/// short-circuit evaluation order of the original expression; mutable
/// references are needed for in-place updates (`++`, `--`, `op=`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OperandKind {
    Value,
    Thunk,
    MutableRef,
}

/// Semantic description of one original or mutant expression shape.
///
/// This is what the dispatch routine generator and the interpreter agree on;
/// the textual `template` in [`ExpressionRecord`] is derived from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Operation {
    /// A boolean constant.
    BoolLit(bool),

    /// A numeric constant.
    IntLit(i128),

    /// A string constant.
    StrLit(String),

    /// Binary operator applied to both operands.
    Binary(BinOp),

    /// Compound assignment (`{0} op= {1}`) updating operand 0 in place.
    CompoundAssign(BinOp),

    /// Prefix unary operator on operand 0.
    Prefix(UnaryOp),

    /// Postfix unary operator on operand 0.
    Postfix(UnaryOp),

    /// Evaluate and return operand 0 as-is (reads a place, or forces the
    /// left thunk of a short-circuit pair).
    OperandA,

    /// Evaluate and return operand 1 as-is.
    OperandB,
}

impl Operation {
    /// Stable name used in flattened mutation records.
    pub fn record_name(&self) -> String {
        match self {
            Operation::BoolLit(_) => "BooleanLiteral".to_string(),
            Operation::IntLit(_) => "NumericLiteral".to_string(),
            Operation::StrLit(_) => "StringLiteral".to_string(),
            Operation::Binary(op) => op.record_name().to_string(),
            Operation::CompoundAssign(op) => format!("{}Assignment", op.record_name()),
            Operation::Prefix(UnaryOp::Inc) => "PrefixIncrement".to_string(),
            Operation::Prefix(UnaryOp::Dec) => "PrefixDecrement".to_string(),
            Operation::Prefix(op) => format!("Prefix{:?}", op),
            Operation::Postfix(UnaryOp::Inc) => "PostfixIncrement".to_string(),
            Operation::Postfix(UnaryOp::Dec) => "PostfixDecrement".to_string(),
            Operation::Postfix(op) => format!("Postfix{:?}", op),
            Operation::OperandA => "LeftOperand".to_string(),
            Operation::OperandB => "RightOperand".to_string(),
        }
    }
}

/// One expression shape of a mutation site: the semantic operation plus its
/// textual template with positional `{0}`/`{1}` operand placeholders.
///
/// Equality is by value over both fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ExpressionRecord {
    pub operation: Operation,
    pub template: String,
}

impl ExpressionRecord {
    pub fn new(operation: Operation, template: impl Into<String>) -> Self {
        Self {
            operation,
            template: template.into(),
        }
    }

    /// Record for a plain binary expression: `{0} op {1}`.
    pub fn binary(op: BinOp) -> Self {
        Self::new(Operation::Binary(op), format!("{{0}} {} {{1}}", op.token()))
    }

    /// Record for a short-circuit binary expression over thunked operands:
    /// `{0}() op {1}()`.
    pub fn binary_thunked(op: BinOp) -> Self {
        Self::new(
            Operation::Binary(op),
            format!("{{0}}() {} {{1}}()", op.token()),
        )
    }

    /// Record for a compound assignment: `{0} op= {1}`.
    pub fn compound_assign(op: BinOp) -> Self {
        Self::new(
            Operation::CompoundAssign(op),
            format!("{{0}} {}= {{1}}", op.token()),
        )
    }

    /// Record for a boolean constant.
    pub fn bool_lit(value: bool) -> Self {
        Self::new(Operation::BoolLit(value), value.to_string())
    }

    /// Record for a numeric constant.
    pub fn int_lit(value: i128) -> Self {
        Self::new(Operation::IntLit(value), value.to_string())
    }

    /// Record for a string constant; the template is the quoted form.
    pub fn str_lit(value: &str) -> Self {
        Self::new(Operation::StrLit(value.to_string()), quote_str(value))
    }

    /// Record for a prefix or postfix unary expression on operand 0.
    pub fn unary(op: UnaryOp, fixity: Fixity) -> Self {
        match fixity {
            Fixity::Prefix => Self::new(Operation::Prefix(op), format!("{}{{0}}", op.token())),
            Fixity::Postfix => Self::new(Operation::Postfix(op), format!("{{0}}{}", op.token())),
        }
    }

    /// Record that reads operand 0 without mutating anything.
    pub fn operand_a() -> Self {
        Self::new(Operation::OperandA, "{0}")
    }

    /// Record that forces the left/right operand thunk.
    pub fn thunk_a() -> Self {
        Self::new(Operation::OperandA, "{0}()")
    }

    pub fn thunk_b() -> Self {
        Self::new(Operation::OperandB, "{1}()")
    }

    /// Substitute operand names into the template.
    pub fn render(&self, operands: &[String]) -> String {
        render_template(&self.template, operands)
    }
}

/// Replace positional `{N}` placeholders with the given operand names.
pub fn render_template(template: &str, operands: &[String]) -> String {
    let mut out = template.to_string();
    for (i, name) in operands.iter().enumerate() {
        out = out.replace(&format!("{{{i}}}"), name);
    }
    out
}

/// Quote a string literal the way the surface language writes it.
pub fn quote_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_record_template_uses_operator_token() {
        let rec = ExpressionRecord::binary(BinOp::Ge);
        assert_eq!(rec.template, "{0} >= {1}");
        assert_eq!(rec.operation, Operation::Binary(BinOp::Ge));
    }

    #[test]
    fn thunked_record_calls_operands() {
        let rec = ExpressionRecord::binary_thunked(BinOp::Eq);
        assert_eq!(rec.template, "{0}() == {1}()");
    }

    #[test]
    fn render_substitutes_positional_placeholders() {
        let rec = ExpressionRecord::binary(BinOp::Gt);
        let rendered = rec.render(&["x".to_string(), "y".to_string()]);
        assert_eq!(rendered, "x > y");
    }

    #[test]
    fn string_literal_template_is_quoted() {
        assert_eq!(ExpressionRecord::str_lit("").template, "\"\"");
        assert_eq!(ExpressionRecord::str_lit("a\"b").template, "\"a\\\"b\"");
    }

    #[test]
    fn record_names_are_stable() {
        assert_eq!(
            Operation::Binary(BinOp::Gt).record_name(),
            "GreaterThan"
        );
        assert_eq!(
            Operation::CompoundAssign(BinOp::Add).record_name(),
            "AddAssignment"
        );
        assert_eq!(
            Operation::Postfix(UnaryOp::Inc).record_name(),
            "PostfixIncrement"
        );
    }

    #[test]
    fn records_compare_by_value() {
        assert_eq!(
            ExpressionRecord::binary(BinOp::Lt),
            ExpressionRecord::binary(BinOp::Lt)
        );
        assert_ne!(
            ExpressionRecord::binary(BinOp::Lt),
            ExpressionRecord::binary(BinOp::Le)
        );
    }
}
