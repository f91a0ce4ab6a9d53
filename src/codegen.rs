//! Source emission for instrumented files.
//!
//! Prints the rewritten tree back to surface syntax and appends the generated
//! dispatch routines. A routine is emitted once per structural shape and takes
//! the site's base id as its first argument, so structurally equal sites share
//! one routine while keeping disjoint mutant id ranges.
//!
//! `activeMutant` returns 0 when the activation signal is unset; mutant ids
//! start at 1 precisely so 0 can serve as the "run unmutated" value.

use std::fmt::Write;

use crate::ast::{Block, Expr, ExprKind, Function, SourceUnit, Stmt, Visibility};
use crate::expr::OperandKind;
use crate::registry::FileLevelSchemaRegistry;

/// What the generated dispatch routines do at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentationMode {
    /// Routines consult the activation signal and substitute the active
    /// mutant's expression.
    Mutation,
    /// Routines record that the site was reached, then run the original.
    Trace,
}

/// Emit the complete instrumented file: rewritten source followed by the
/// generated schemata.
pub fn emit_instrumented_file(
    unit: &SourceUnit,
    registry: &FileLevelSchemaRegistry,
    mode: InstrumentationMode,
) -> String {
    let mut out = emit_source_unit(unit);
    if registry.site_count() > 0 {
        out.push('\n');
        out.push_str(&emit_dispatch_routines(registry, mode));
    }
    out
}

/// Print one source unit in surface syntax.
pub fn emit_source_unit(unit: &SourceUnit) -> String {
    let mut out = String::new();
    for (i, f) in unit.functions.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        emit_function(&mut out, f);
    }
    out
}

fn emit_function(out: &mut String, f: &Function) {
    for attr in &f.attrs {
        let _ = writeln!(out, "@{attr}");
    }
    match f.visibility {
        Visibility::Private => {}
        Visibility::Internal => out.push_str("internal "),
        Visibility::Public => out.push_str("pub "),
    }
    let _ = write!(out, "fn {}", f.name);
    if !f.type_params.is_empty() {
        let _ = write!(out, "<{}>", f.type_params.join(", "));
    }
    out.push('(');
    for (i, p) in f.params.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}: {}", p.name, p.ty.token());
    }
    out.push(')');
    if f.return_type != crate::ast::TypeDescriptor::Void {
        let _ = write!(out, " -> {}", f.return_type.token());
    }
    out.push(' ');
    emit_block(out, &f.body, 0);
    out.push('\n');
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("    ");
    }
}

fn emit_block(out: &mut String, block: &Block, depth: usize) {
    out.push_str("{\n");
    for stmt in &block.stmts {
        emit_stmt(out, stmt, depth + 1);
    }
    indent(out, depth);
    out.push('}');
}

fn emit_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    indent(out, depth);
    match stmt {
        Stmt::Decl(decl) => {
            out.push_str(if decl.is_const { "const " } else { "var " });
            out.push_str(&decl.name);
            let _ = write!(out, ": {}", decl.ty.token());
            if let Some(init) = &decl.init {
                let _ = write!(out, " = {}", print_expr(init));
            }
            out.push_str(";\n");
        }
        Stmt::Expr(e) => {
            let _ = writeln!(out, "{};", print_expr(e));
        }
        Stmt::Return(None) => out.push_str("return;\n"),
        Stmt::Return(Some(e)) => {
            let _ = writeln!(out, "return {};", print_expr(e));
        }
        Stmt::If {
            cond,
            then_block,
            else_block,
        } => {
            let _ = write!(out, "if ({}) ", print_expr(cond));
            emit_block(out, then_block, depth);
            if let Some(else_block) = else_block {
                out.push_str(" else ");
                emit_block(out, else_block, depth);
            }
            out.push('\n');
        }
        Stmt::While { cond, body } => {
            let _ = write!(out, "while ({}) ", print_expr(cond));
            emit_block(out, body, depth);
            out.push('\n');
        }
        Stmt::Switch {
            scrutinee,
            cases,
            default,
        } => {
            let _ = writeln!(out, "switch ({}) {{", print_expr(scrutinee));
            for case in cases {
                indent(out, depth + 1);
                let _ = writeln!(out, "case {}:", print_expr(&case.label));
                for s in &case.body.stmts {
                    emit_stmt(out, s, depth + 2);
                }
            }
            if let Some(default) = default {
                indent(out, depth + 1);
                out.push_str("default:\n");
                for s in &default.stmts {
                    emit_stmt(out, s, depth + 2);
                }
            }
            indent(out, depth);
            out.push_str("}\n");
        }
        Stmt::Break => out.push_str("break;\n"),
        Stmt::Assert(e) => {
            let _ = writeln!(out, "assert({});", print_expr(e));
        }
    }
}

/// Print one expression in surface syntax.
pub fn print_expr(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Bool(v) => v.to_string(),
        ExprKind::Int(v) => v.to_string(),
        ExprKind::Str(s) => crate::expr::quote_str(s),
        ExprKind::Char(c) => format!("'{c}'"),
        ExprKind::Ident { name, .. } => name.clone(),
        ExprKind::Unary {
            op,
            fixity,
            operand,
        } => match fixity {
            crate::expr::Fixity::Prefix => format!("{}{}", op.token(), print_operand(operand)),
            crate::expr::Fixity::Postfix => format!("{}{}", print_operand(operand), op.token()),
        },
        ExprKind::Binary { op, lhs, rhs } => format!(
            "{} {} {}",
            print_operand(lhs),
            op.token(),
            print_operand(rhs)
        ),
        ExprKind::Assign { lhs, rhs } => {
            format!("{} = {}", print_expr(lhs), print_operand(rhs))
        }
        ExprKind::CompoundAssign { op, lhs, rhs } => format!(
            "{} {}= {}",
            print_expr(lhs),
            op.token(),
            print_operand(rhs)
        ),
        ExprKind::Call { name, args } => {
            let args: Vec<String> = args.iter().map(print_expr).collect();
            format!("{}({})", name, args.join(", "))
        }
        ExprKind::Index { base, index } => {
            format!("{}[{}]", print_operand(base), print_expr(index))
        }
        ExprKind::ArrayLit(elems) => {
            let elems: Vec<String> = elems.iter().map(print_expr).collect();
            format!("[{}]", elems.join(", "))
        }
        ExprKind::IsPattern { scrutinee, binding } => {
            format!("{} is var {}", print_operand(scrutinee), binding)
        }
        ExprKind::Thunk(inner) => format!("() => {}", print_expr(inner)),
        ExprKind::Default => format!("default({})", expr.ty.token()),
        ExprKind::SchemaCall(call) => {
            let mut args = vec![call.base_id.to_string()];
            for operand in &call.operands {
                args.push(match call.operand_kind {
                    OperandKind::MutableRef => format!("&mut {}", print_expr(operand)),
                    _ => print_expr(operand),
                });
            }
            format!("{}({})", call.routine, args.join(", "))
        }
    }
}

/// Operand position: parenthesize anything that is not atomic so the printed
/// text never re-associates.
fn print_operand(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Binary { .. }
        | ExprKind::Assign { .. }
        | ExprKind::CompoundAssign { .. }
        | ExprKind::IsPattern { .. }
        | ExprKind::Thunk(_) => format!("({})", print_expr(expr)),
        _ => print_expr(expr),
    }
}

/// Emit every generated dispatch routine of one file's registry.
pub fn emit_dispatch_routines(
    registry: &FileLevelSchemaRegistry,
    mode: InstrumentationMode,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "// {}: {} sites, {} mutants",
        registry.schema_class_name(),
        registry.site_count(),
        registry.mutant_count()
    );

    for (name, group) in registry.routines() {
        out.push('\n');

        let mut params = vec!["baseId: u64".to_string()];
        let arg_names: Vec<String> = (0..group.parameter_types.len())
            .map(|i| format!("arg{i}"))
            .collect();
        for (arg, ty) in arg_names.iter().zip(&group.parameter_types) {
            let ty = match group.operand_kind {
                OperandKind::Value => ty.token(),
                OperandKind::Thunk => format!("fn() -> {}", ty.token()),
                OperandKind::MutableRef => format!("&mut {}", ty.token()),
            };
            params.push(format!("{arg}: {ty}"));
        }

        let _ = writeln!(
            out,
            "internal fn {}({}) -> {} {{",
            name,
            params.join(", "),
            group.return_type.token()
        );

        match mode {
            InstrumentationMode::Mutation => {
                let _ = writeln!(
                    out,
                    "    var active: u64 = activeMutant(\"{}\");",
                    registry.activation_signal_name()
                );
                for (k, mutant) in group.mutants.iter().enumerate() {
                    let _ = writeln!(
                        out,
                        "    if (active == baseId + {k}) {{ return {}; }}",
                        mutant.render(&arg_names)
                    );
                }
            }
            InstrumentationMode::Trace => {
                let _ = writeln!(
                    out,
                    "    traceReached(\"{}\", baseId, {});",
                    registry.activation_signal_name(),
                    group.mutant_count()
                );
            }
        }

        let _ = writeln!(out, "    return {};", group.original.render(&arg_names));
        out.push_str("}\n");
    }

    out
}
