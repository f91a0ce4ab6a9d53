use serde::{Deserialize, Serialize};

use crate::expr::{BinOp, Fixity, OperandKind, UnaryOp};
use crate::span::{LineSpan, SourceSpan};

/// Type of an expression or declaration in the surface language.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Bool,
    I32,
    I64,
    U32,
    U64,
    Char,
    Str,
    Void,
    Array {
        elem: Box<TypeDescriptor>,
        len: usize,
    },
    Named(String),
}

impl TypeDescriptor {
    /// Bounded numeric types eligible for constant perturbation.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::I32 | TypeDescriptor::I64 | TypeDescriptor::U32 | TypeDescriptor::U64
        )
    }

    /// Sign negation is only type-preserving for signed types.
    pub fn is_signed(&self) -> bool {
        matches!(self, TypeDescriptor::I32 | TypeDescriptor::I64)
    }

    /// Types with a total order (relational operators make sense).
    pub fn is_ordered(&self) -> bool {
        self.is_numeric() || matches!(self, TypeDescriptor::Char)
    }

    /// Source-language spelling of the type.
    pub fn token(&self) -> String {
        match self {
            TypeDescriptor::Bool => "bool".to_string(),
            TypeDescriptor::I32 => "i32".to_string(),
            TypeDescriptor::I64 => "i64".to_string(),
            TypeDescriptor::U32 => "u32".to_string(),
            TypeDescriptor::U64 => "u64".to_string(),
            TypeDescriptor::Char => "char".to_string(),
            TypeDescriptor::Str => "str".to_string(),
            TypeDescriptor::Void => "void".to_string(),
            TypeDescriptor::Array { elem, len } => format!("[{}; {}]", elem.token(), len),
            TypeDescriptor::Named(name) => name.clone(),
        }
    }
}

/// Declaration visibility.
///
/// Generated dispatch routines live outside the declaring scope, so the
/// rewriter widens `Private` to `Internal` during instrumentation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Visibility {
    Private,
    Internal,
    Public,
}

/// A typed expression with source location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeDescriptor,
    pub span: SourceSpan,
    pub line_span: LineSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ExprKind {
    Bool(bool),
    Int(i128),
    Str(String),
    Char(char),

    /// Variable or parameter reference. `assignable` is false for `const`
    /// bindings.
    Ident { name: String, assignable: bool },

    Unary {
        op: UnaryOp,
        fixity: Fixity,
        operand: Box<Expr>,
    },

    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Plain assignment `lhs = rhs`.
    Assign {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Compound assignment `lhs op= rhs`.
    CompoundAssign {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    Call {
        name: String,
        args: Vec<Expr>,
    },

    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },

    ArrayLit(Vec<Expr>),

    /// Pattern-matching test introducing a binding: `scrutinee is var name`.
    /// Never rewritten: the binding's scope would not survive hoisting into a
    /// dispatch call.
    IsPattern {
        scrutinee: Box<Expr>,
        binding: String,
    },

    /// Zero-argument closure wrapping an operand of a short-circuit operator.
    Thunk(Box<Expr>),

    /// Default value of the expression's type (`default(ty)`).
    Default,

    /// Call into a generated dispatch routine, inserted by the rewriter.
    SchemaCall(Box<SchemaCall>),
}

/// A rewritten mutation site: a call into the dispatch routine named
/// `routine`, carrying the site's base id and its (possibly rewritten)
/// operands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaCall {
    pub routine: String,
    pub base_id: u64,
    pub group: crate::group::MutationGroup,
    pub operands: Vec<Expr>,
    pub operand_kind: OperandKind,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: TypeDescriptor, span: SourceSpan, line_span: LineSpan) -> Self {
        Self {
            kind,
            ty,
            span,
            line_span,
        }
    }

    /// True for expressions naming an assignable storage location.
    pub fn is_assignable_place(&self) -> bool {
        match &self.kind {
            ExprKind::Ident { assignable, .. } => *assignable,
            ExprKind::Index { base, .. } => base.is_assignable_place(),
            _ => false,
        }
    }

    /// Numeric literal value, if this is one.
    pub fn as_int_literal(&self) -> Option<i128> {
        match &self.kind {
            ExprKind::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// A `var`/`const` declaration statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decl {
    pub is_const: bool,
    pub name: String,
    pub ty: TypeDescriptor,
    /// The declared type was written with an explicit array length.
    pub explicit_array_len: bool,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Stmt {
    Decl(Decl),
    Expr(Expr),
    Return(Option<Expr>),
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    While {
        cond: Expr,
        body: Block,
    },
    Switch {
        scrutinee: Expr,
        cases: Vec<SwitchCase>,
        default: Option<Block>,
    },
    Break,
    /// Contract assertion; never mutated.
    Assert(Expr),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchCase {
    /// Case label; a compile-time constant, never mutated.
    pub label: Expr,
    pub body: Block,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeDescriptor,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Function {
    /// Symbolic attributes (`@inline` and friends); copied verbatim.
    pub attrs: Vec<String>,
    pub visibility: Visibility,
    pub name: String,
    /// Generic type parameters; copied verbatim.
    pub type_params: Vec<String>,
    pub params: Vec<Param>,
    pub return_type: TypeDescriptor,
    pub body: Block,
}

/// One parsed source file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SourceUnit {
    pub functions: Vec<Function>,
}

impl SourceUnit {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}
