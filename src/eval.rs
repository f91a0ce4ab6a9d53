//! Reference interpreter for (instrumented) source units.
//!
//! Runs the tree the rewriter produced, so a mutant's observable behavior can
//! be checked without a target-language toolchain: dispatch calls consult the
//! configured activation exactly like the generated routines would, and a
//! tracer (when attached) records reached sites as a side effect.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};

use crate::ast::{Block, Expr, ExprKind, SourceUnit, Stmt, TypeDescriptor};
use crate::expr::{BinOp, Fixity, OperandKind, Operation, UnaryOp};
use crate::runtime;
use crate::trace::MutantTracer;

/// Runtime value of the surface language.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Void,
    Bool(bool),
    Int(i128),
    Str(String),
    Char(char),
    Array(Vec<Value>),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Void => write!(f, "()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{}", crate::expr::quote_str(s)),
            Value::Char(c) => write!(f, "'{c}'"),
            Value::Array(elems) => {
                write!(f, "[")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::Char(_) => "char",
            Value::Array(_) => "array",
        }
    }

    fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => bail!("expected bool, got {}", other.type_name()),
        }
    }

    fn as_int(&self) -> Result<i128> {
        match self {
            Value::Int(v) => Ok(*v),
            other => bail!("expected int, got {}", other.type_name()),
        }
    }
}

/// Default value of a surface type, used for `default(ty)` and uninitialized
/// declarations.
pub fn default_value(ty: &TypeDescriptor) -> Value {
    match ty {
        TypeDescriptor::Bool => Value::Bool(false),
        TypeDescriptor::Char => Value::Char('\0'),
        TypeDescriptor::Str => Value::Str(String::new()),
        TypeDescriptor::Array { elem, len } => Value::Array(vec![default_value(elem); *len]),
        TypeDescriptor::Void => Value::Void,
        _ => Value::Int(0),
    }
}

enum Flow {
    Normal,
    Break,
    Return(Value),
}

struct Frame {
    scopes: Vec<HashMap<String, Value>>,
}

impl Frame {
    fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    fn define(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    fn get(&self, name: &str) -> Result<&Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.get(name))
            .with_context(|| format!("undefined variable {name:?}"))
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut Value> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|s| s.get_mut(name))
            .with_context(|| format!("undefined variable {name:?}"))
    }
}

/// Tree-walking evaluator over one source unit.
pub struct Evaluator<'a> {
    unit: &'a SourceUnit,
    activation: Option<u64>,
    tracer: Option<&'a MutantTracer>,
}

impl<'a> Evaluator<'a> {
    pub fn new(unit: &'a SourceUnit) -> Self {
        Self {
            unit,
            activation: None,
            tracer: None,
        }
    }

    /// Run with one activated mutant id, as if the activation signal were set.
    pub fn with_activation(mut self, mutant_id: u64) -> Self {
        self.activation = Some(mutant_id);
        self
    }

    /// Record every reached dispatch site through `tracer`.
    pub fn with_tracer(mut self, tracer: &'a MutantTracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Call a function by name with already-evaluated arguments.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        let f = self
            .unit
            .function(name)
            .with_context(|| format!("unknown function {name:?}"))?;
        if f.params.len() != args.len() {
            bail!(
                "{name} takes {} arguments, got {}",
                f.params.len(),
                args.len()
            );
        }

        let mut frame = Frame::new();
        for (p, arg) in f.params.iter().zip(args) {
            frame.define(&p.name, arg);
        }

        match self.exec_block(&mut frame, &f.body)? {
            Flow::Return(v) => Ok(v),
            _ => Ok(Value::Void),
        }
    }

    fn exec_block(&self, frame: &mut Frame, block: &Block) -> Result<Flow> {
        frame.scopes.push(HashMap::new());
        let mut flow = Flow::Normal;
        for stmt in &block.stmts {
            flow = self.exec_stmt(frame, stmt)?;
            if !matches!(flow, Flow::Normal) {
                break;
            }
        }
        frame.scopes.pop();
        Ok(flow)
    }

    fn exec_stmt(&self, frame: &mut Frame, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Decl(decl) => {
                let value = match &decl.init {
                    Some(init) => self.eval(frame, init)?,
                    None => default_value(&decl.ty),
                };
                frame.define(&decl.name, value);
                Ok(Flow::Normal)
            }
            Stmt::Expr(e) => {
                self.eval(frame, e)?;
                Ok(Flow::Normal)
            }
            Stmt::Return(None) => Ok(Flow::Return(Value::Void)),
            Stmt::Return(Some(e)) => Ok(Flow::Return(self.eval(frame, e)?)),
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                if self.eval(frame, cond)?.as_bool()? {
                    self.exec_block(frame, then_block)
                } else if let Some(else_block) = else_block {
                    self.exec_block(frame, else_block)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { cond, body } => {
                while self.eval(frame, cond)?.as_bool()? {
                    match self.exec_block(frame, body)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Switch {
                scrutinee,
                cases,
                default,
            } => {
                let v = self.eval(frame, scrutinee)?;
                for case in cases {
                    if self.eval(frame, &case.label)? == v {
                        return match self.exec_block(frame, &case.body)? {
                            Flow::Break => Ok(Flow::Normal),
                            flow => Ok(flow),
                        };
                    }
                }
                if let Some(default) = default {
                    return match self.exec_block(frame, default)? {
                        Flow::Break => Ok(Flow::Normal),
                        flow => Ok(flow),
                    };
                }
                Ok(Flow::Normal)
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Assert(e) => {
                if !self.eval(frame, e)?.as_bool()? {
                    bail!("assertion failed: {}", crate::codegen::print_expr(e));
                }
                Ok(Flow::Normal)
            }
        }
    }

    fn eval(&self, frame: &mut Frame, expr: &Expr) -> Result<Value> {
        match &expr.kind {
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Int(v) => Ok(Value::Int(*v)),
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),
            ExprKind::Char(c) => Ok(Value::Char(*c)),
            ExprKind::Ident { name, .. } => frame.get(name).cloned(),

            ExprKind::Unary {
                op,
                fixity,
                operand,
            } => match op {
                UnaryOp::Not => Ok(Value::Bool(!self.eval(frame, operand)?.as_bool()?)),
                UnaryOp::Neg => Ok(Value::Int(-self.eval(frame, operand)?.as_int()?)),
                UnaryOp::Inc | UnaryOp::Dec => self.step_place(frame, operand, *op, *fixity),
            },

            ExprKind::Binary { op, lhs, rhs } => match op {
                BinOp::AndAnd => {
                    if !self.eval(frame, lhs)?.as_bool()? {
                        return Ok(Value::Bool(false));
                    }
                    Ok(Value::Bool(self.eval(frame, rhs)?.as_bool()?))
                }
                BinOp::OrOr => {
                    if self.eval(frame, lhs)?.as_bool()? {
                        return Ok(Value::Bool(true));
                    }
                    Ok(Value::Bool(self.eval(frame, rhs)?.as_bool()?))
                }
                _ => {
                    let a = self.eval(frame, lhs)?;
                    let b = self.eval(frame, rhs)?;
                    apply_binop(*op, a, b)
                }
            },

            ExprKind::Assign { lhs, rhs } => {
                let value = self.eval(frame, rhs)?;
                self.write_place(frame, lhs, value.clone())?;
                Ok(value)
            }

            ExprKind::CompoundAssign { op, lhs, rhs } => {
                let old = self.eval(frame, lhs)?;
                let rhs = self.eval(frame, rhs)?;
                let new = apply_binop(*op, old, rhs)?;
                self.write_place(frame, lhs, new.clone())?;
                Ok(new)
            }

            ExprKind::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|a| self.eval(frame, a))
                    .collect::<Result<Vec<_>>>()?;
                self.call(name, args)
            }

            ExprKind::Index { base, index } => {
                let base = self.eval(frame, base)?;
                let idx = self.eval(frame, index)?.as_int()?;
                let Value::Array(elems) = base else {
                    bail!("indexing a non-array value of type {}", base.type_name());
                };
                usize::try_from(idx)
                    .ok()
                    .and_then(|i| elems.get(i).cloned())
                    .with_context(|| format!("index {idx} out of bounds (len {})", elems.len()))
            }

            ExprKind::ArrayLit(elems) => Ok(Value::Array(
                elems
                    .iter()
                    .map(|e| self.eval(frame, e))
                    .collect::<Result<Vec<_>>>()?,
            )),

            ExprKind::IsPattern { scrutinee, binding } => {
                let value = self.eval(frame, scrutinee)?;
                frame.define(binding, value);
                Ok(Value::Bool(true))
            }

            // A bare thunk only appears as a dispatch operand; forcing it
            // directly is the degenerate case.
            ExprKind::Thunk(inner) => self.eval(frame, inner),

            ExprKind::Default => Ok(default_value(&expr.ty)),

            ExprKind::SchemaCall(call) => {
                if let Some(tracer) = self.tracer {
                    tracer.record_reached(call.base_id, call.group.mutant_count())?;
                }
                let record = match runtime::select(
                    self.activation,
                    call.base_id,
                    call.group.mutant_count(),
                ) {
                    Some(k) => &call.group.mutants[k],
                    None => &call.group.original,
                };
                self.apply_record(frame, &record.operation, &call.operands, call.operand_kind)
            }
        }
    }

    /// Evaluate one dispatch-routine body: the selected operation applied to
    /// the site's operand expressions.
    fn apply_record(
        &self,
        frame: &mut Frame,
        operation: &Operation,
        operands: &[Expr],
        kind: OperandKind,
    ) -> Result<Value> {
        match operation {
            Operation::BoolLit(b) => Ok(Value::Bool(*b)),
            Operation::IntLit(v) => Ok(Value::Int(*v)),
            Operation::StrLit(s) => Ok(Value::Str(s.clone())),

            Operation::Binary(op) => match (op, kind) {
                // Thunked operands keep the original's evaluation order.
                (BinOp::AndAnd, OperandKind::Thunk) => {
                    if !self.force(frame, &operands[0])?.as_bool()? {
                        return Ok(Value::Bool(false));
                    }
                    Ok(Value::Bool(self.force(frame, &operands[1])?.as_bool()?))
                }
                (BinOp::OrOr, OperandKind::Thunk) => {
                    if self.force(frame, &operands[0])?.as_bool()? {
                        return Ok(Value::Bool(true));
                    }
                    Ok(Value::Bool(self.force(frame, &operands[1])?.as_bool()?))
                }
                _ => {
                    let a = self.force(frame, &operands[0])?;
                    let b = self.force(frame, &operands[1])?;
                    apply_binop(*op, a, b)
                }
            },

            Operation::CompoundAssign(op) => {
                let old = self.eval(frame, &operands[0])?;
                let rhs = self.eval(frame, &operands[1])?;
                let new = apply_binop(*op, old, rhs)?;
                self.write_place(frame, &operands[0], new.clone())?;
                Ok(new)
            }

            Operation::Prefix(op) => self.step_place(frame, &operands[0], *op, Fixity::Prefix),
            Operation::Postfix(op) => self.step_place(frame, &operands[0], *op, Fixity::Postfix),

            Operation::OperandA => self.force(frame, &operands[0]),
            Operation::OperandB => self.force(frame, &operands[1]),
        }
    }

    /// Evaluate a dispatch operand, unwrapping its thunk if it has one.
    fn force(&self, frame: &mut Frame, operand: &Expr) -> Result<Value> {
        match &operand.kind {
            ExprKind::Thunk(inner) => self.eval(frame, inner),
            _ => self.eval(frame, operand),
        }
    }

    /// `++`/`--` on a place; prefix yields the new value, postfix the old.
    fn step_place(
        &self,
        frame: &mut Frame,
        place: &Expr,
        op: UnaryOp,
        fixity: Fixity,
    ) -> Result<Value> {
        let old = self.eval(frame, place)?.as_int()?;
        let new = match op {
            UnaryOp::Inc => old + 1,
            UnaryOp::Dec => old - 1,
            other => bail!("{:?} is not an in-place operator", other),
        };
        self.write_place(frame, place, Value::Int(new))?;
        Ok(Value::Int(match fixity {
            Fixity::Prefix => new,
            Fixity::Postfix => old,
        }))
    }

    fn write_place(&self, frame: &mut Frame, place: &Expr, value: Value) -> Result<()> {
        let (root, path) = self.resolve_path(frame, place)?;
        let mut slot = frame.get_mut(&root)?;
        for idx in path {
            let Value::Array(elems) = slot else {
                bail!("indexing a non-array value");
            };
            let len = elems.len();
            slot = elems
                .get_mut(idx)
                .with_context(|| format!("index {idx} out of bounds (len {len})"))?;
        }
        *slot = value;
        Ok(())
    }

    /// Resolve an assignable place to its root variable and index path,
    /// evaluating index expressions along the way.
    fn resolve_path(&self, frame: &mut Frame, place: &Expr) -> Result<(String, Vec<usize>)> {
        match &place.kind {
            ExprKind::Ident { name, .. } => Ok((name.clone(), Vec::new())),
            ExprKind::Index { base, index } => {
                let (root, mut path) = self.resolve_path(frame, base)?;
                let idx = self.eval(frame, index)?.as_int()?;
                let idx = usize::try_from(idx)
                    .ok()
                    .with_context(|| format!("negative index {idx}"))?;
                path.push(idx);
                Ok((root, path))
            }
            other => bail!("not an assignable place: {other:?}"),
        }
    }
}

fn apply_binop(op: BinOp, a: Value, b: Value) -> Result<Value> {
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => {
            let (x, y) = (*x, *y);
            Ok(match op {
                BinOp::Add => Value::Int(x + y),
                BinOp::Sub => Value::Int(x - y),
                BinOp::Mul => Value::Int(x * y),
                BinOp::Div => {
                    if y == 0 {
                        bail!("division by zero");
                    }
                    Value::Int(x / y)
                }
                BinOp::Rem => {
                    if y == 0 {
                        bail!("remainder by zero");
                    }
                    Value::Int(x % y)
                }
                BinOp::BitAnd => Value::Int(x & y),
                BinOp::BitXor => Value::Int(x ^ y),
                BinOp::BitOr => Value::Int(x | y),
                BinOp::Shl | BinOp::Shr => {
                    let shift = u32::try_from(y)
                        .ok()
                        .filter(|s| *s < 128)
                        .with_context(|| format!("shift amount {y} out of range"))?;
                    match op {
                        BinOp::Shl => Value::Int(x << shift),
                        _ => Value::Int(x >> shift),
                    }
                }
                BinOp::Eq => Value::Bool(x == y),
                BinOp::Ne => Value::Bool(x != y),
                BinOp::Lt => Value::Bool(x < y),
                BinOp::Le => Value::Bool(x <= y),
                BinOp::Gt => Value::Bool(x > y),
                BinOp::Ge => Value::Bool(x >= y),
                BinOp::AndAnd | BinOp::OrOr => {
                    bail!("logical operator applied to int operands")
                }
            })
        }
        (Value::Bool(x), Value::Bool(y)) => Ok(match op {
            BinOp::Eq => Value::Bool(x == y),
            BinOp::Ne => Value::Bool(x != y),
            BinOp::AndAnd => Value::Bool(*x && *y),
            BinOp::OrOr => Value::Bool(*x || *y),
            _ => bail!("operator {:?} not defined on bool", op),
        }),
        (Value::Char(x), Value::Char(y)) => Ok(match op {
            BinOp::Eq => Value::Bool(x == y),
            BinOp::Ne => Value::Bool(x != y),
            BinOp::Lt => Value::Bool(x < y),
            BinOp::Le => Value::Bool(x <= y),
            BinOp::Gt => Value::Bool(x > y),
            BinOp::Ge => Value::Bool(x >= y),
            _ => bail!("operator {:?} not defined on char", op),
        }),
        (Value::Str(x), Value::Str(y)) => Ok(match op {
            BinOp::Eq => Value::Bool(x == y),
            BinOp::Ne => Value::Bool(x != y),
            _ => bail!("operator {:?} not defined on str", op),
        }),
        _ => bail!(
            "operator {:?} applied to mismatched operands {} and {}",
            op,
            a.type_name(),
            b.type_name()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_source_unit;
    use crate::registry::FileLevelSchemaRegistry;
    use crate::rewrite::instrument_unit;
    use crate::trace::reconstruct_trace;
    use tempfile::tempdir;

    fn instrumented(code: &str) -> (SourceUnit, FileLevelSchemaRegistry) {
        let unit = parse_source_unit(code).unwrap();
        let mut registry = FileLevelSchemaRegistry::new("test.src");
        let out = instrument_unit(&unit, &mut registry);
        (out, registry)
    }

    #[test]
    fn plain_program_evaluates_without_instrumentation() {
        let code = "\
fn fib(n: i32) -> i32 {
    if (n < 2) { return n; }
    return fib(n - 1) + fib(n - 2);
}
";
        let unit = parse_source_unit(code).unwrap();
        let eval = Evaluator::new(&unit);
        assert_eq!(eval.call("fib", vec![Value::Int(10)]).unwrap(), Value::Int(55));
    }

    #[test]
    fn unactivated_instrumented_program_matches_the_original() {
        let code = "\
fn check(x: i32, y: i32) -> bool {
    var z: bool = x > y;
    return z;
}
";
        let (unit, _reg) = instrumented(code);
        let eval = Evaluator::new(&unit);
        let call = |x, y| {
            eval.call("check", vec![Value::Int(x), Value::Int(y)])
                .unwrap()
        };
        assert_eq!(call(5, 3), Value::Bool(true));
        assert_eq!(call(3, 3), Value::Bool(false));
        assert_eq!(call(2, 3), Value::Bool(false));
    }

    #[test]
    fn activating_each_comparison_mutant_changes_behavior() {
        let code = "\
fn check(x: i32, y: i32) -> bool {
    var z: bool = x > y;
    return z;
}
";
        // The comparison has no literal children, so its site is base id 1
        // with mutants false (1), >= (2), != (3).
        let (unit, reg) = instrumented(code);
        assert_eq!(reg.mutant_count(), 3);

        let run = |id: u64, x, y| {
            Evaluator::new(&unit)
                .with_activation(id)
                .call("check", vec![Value::Int(x), Value::Int(y)])
                .unwrap()
        };
        // false
        assert_eq!(run(1, 5, 3), Value::Bool(false));
        // >=
        assert_eq!(run(2, 3, 3), Value::Bool(true));
        assert_eq!(run(2, 2, 3), Value::Bool(false));
        // !=
        assert_eq!(run(3, 5, 3), Value::Bool(true));
        assert_eq!(run(3, 3, 3), Value::Bool(false));
    }

    #[test]
    fn out_of_range_activation_runs_the_original() {
        let code = "\
fn check(x: i32, y: i32) -> bool {
    return x > y;
}
";
        let (unit, reg) = instrumented(code);
        let out = Evaluator::new(&unit)
            .with_activation(reg.mutant_count() + 10)
            .call("check", vec![Value::Int(5), Value::Int(3)])
            .unwrap();
        assert_eq!(out, Value::Bool(true));
    }

    #[test]
    fn instrumentation_preserves_short_circuit_evaluation() {
        let code = "\
fn safe(x: i32) -> bool {
    return x != 0 && 10 / x > 1;
}
";
        let (unit, _reg) = instrumented(code);
        let eval = Evaluator::new(&unit);
        // x == 0 must never force the division.
        assert_eq!(
            eval.call("safe", vec![Value::Int(0)]).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            eval.call("safe", vec![Value::Int(4)]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let code = "\
fn f(x: i32) -> i32 {
    return 10 / x;
}
";
        let unit = parse_source_unit(code).unwrap();
        let err = Evaluator::new(&unit)
            .call("f", vec![Value::Int(0)])
            .unwrap_err();
        assert!(format!("{err:#}").contains("division by zero"));
    }

    #[test]
    fn compound_assign_and_postfix_semantics() {
        let code = "\
fn f() -> i32 {
    var a: i32 = 5;
    a += 2;
    return a++;
}
";
        let unit = parse_source_unit(code).unwrap();
        let eval = Evaluator::new(&unit);
        assert_eq!(eval.call("f", vec![]).unwrap(), Value::Int(7));

        // The instrumented tree keeps the same observable behavior.
        let (unit, _reg) = instrumented(code);
        let eval = Evaluator::new(&unit);
        assert_eq!(eval.call("f", vec![]).unwrap(), Value::Int(7));
    }

    #[test]
    fn array_writes_go_through_index_paths() {
        let code = "\
fn f() -> i32 {
    var a: [i32; 3] = [1, 2, 3];
    a[1] = 10;
    a[1] += 5;
    return a[0] + a[1] + a[2];
}
";
        let unit = parse_source_unit(code).unwrap();
        let eval = Evaluator::new(&unit);
        assert_eq!(eval.call("f", vec![]).unwrap(), Value::Int(19));
    }

    #[test]
    fn switch_runs_one_case_or_default() {
        let code = "\
fn f(x: i32) -> i32 {
    var y: i32 = 0;
    switch (x) {
        case 1:
            y = 10;
        case 2:
            y = 20;
            break;
        default:
            y = 99;
    }
    return y;
}
";
        let unit = parse_source_unit(code).unwrap();
        let eval = Evaluator::new(&unit);
        assert_eq!(eval.call("f", vec![Value::Int(1)]).unwrap(), Value::Int(10));
        assert_eq!(eval.call("f", vec![Value::Int(2)]).unwrap(), Value::Int(20));
        assert_eq!(eval.call("f", vec![Value::Int(7)]).unwrap(), Value::Int(99));
    }

    #[test]
    fn failed_assertion_reports_the_condition() {
        let code = "\
fn f(x: i32) {
    assert(x > 0);
}
";
        let unit = parse_source_unit(code).unwrap();
        let err = Evaluator::new(&unit)
            .call("f", vec![Value::Int(-1)])
            .unwrap_err();
        assert!(format!("{err:#}").contains("assertion failed: x > 0"));
    }

    #[test]
    fn is_pattern_binds_and_yields_true() {
        let code = "\
fn f(x: i32) -> i32 {
    if (x is var y) { return y + 1; }
    return 0;
}
";
        let unit = parse_source_unit(code).unwrap();
        let eval = Evaluator::new(&unit);
        assert_eq!(eval.call("f", vec![Value::Int(4)]).unwrap(), Value::Int(5));
    }

    #[test]
    fn tracer_records_only_reached_sites() {
        let code = "\
fn f(x: i32) -> i32 {
    if (x > 0) {
        return x + 1;
    }
    return 0;
}
";
        let (unit, reg) = instrumented(code);
        let dir = tempdir().unwrap();
        let trace = dir.path().join("run.trace");
        let tracer = MutantTracer::new(reg.activation_signal_name(), &trace);

        // The negative path never reaches the then-branch sites.
        Evaluator::new(&unit)
            .with_tracer(&tracer)
            .call("f", vec![Value::Int(-1)])
            .unwrap();

        let reached: Vec<u64> = reconstruct_trace(&trace)
            .unwrap()
            .into_iter()
            .map(|i| i.mutant_id)
            .collect();
        // Sites in the condition (literal 0 and `>`) plus the final
        // `return 0` literal; nothing from `x + 1`.
        assert_eq!(reached, vec![1, 2, 3, 4, 5, 14, 15]);

        // The positive path adds the remaining ids.
        Evaluator::new(&unit)
            .with_tracer(&tracer)
            .call("f", vec![Value::Int(3)])
            .unwrap();
        let reached = reconstruct_trace(&trace).unwrap();
        assert_eq!(reached.len(), reg.mutant_count() as usize);
    }

    #[test]
    fn arithmetic_mutant_activation_flows_through_nested_sites() {
        let code = "\
fn f(x: i32) -> i32 {
    return x * 3;
}
";
        let (unit, reg) = instrumented(code);
        // Literal 3 registers first: candidates 0, -3, 2, 4 at ids 1..=4.
        assert_eq!(reg.site_count(), 2);

        let run = |id: Option<u64>, x| {
            let eval = Evaluator::new(&unit);
            let eval = match id {
                Some(id) => eval.with_activation(id),
                None => eval,
            };
            eval.call("f", vec![Value::Int(x)]).unwrap()
        };
        assert_eq!(run(None, 5), Value::Int(15));
        // Literal mutant 0 turns the product to zero.
        assert_eq!(run(Some(1), 5), Value::Int(0));
    }
}
