//! Bottom-up tree rewriter: replaces every eligible expression with a call
//! into its generated dispatch routine.
//!
//! Children are rewritten (and registered) before their parent, so mutant id
//! order follows evaluation order within an expression. Groups are computed
//! from the original node shapes; the operands embedded in the dispatch call
//! are the rewritten children.

use crate::ast::{Block, Expr, ExprKind, Function, SchemaCall, SourceUnit, Stmt, Visibility};
use crate::group::MutationGroup;
use crate::operators::{create_mutation_group, create_mutation_group_typed};
use crate::registry::FileLevelSchemaRegistry;

/// Instrument one parsed file against its registry.
pub fn instrument_unit(unit: &SourceUnit, registry: &mut FileLevelSchemaRegistry) -> SourceUnit {
    let functions = unit
        .functions
        .iter()
        .map(|f| instrument_function(f, registry))
        .collect();
    SourceUnit { functions }
}

fn instrument_function(f: &Function, registry: &mut FileLevelSchemaRegistry) -> Function {
    let mut body = instrument_block(&f.body, registry);

    // A mutant can turn the terminal statement into a non-returning path, and
    // the instrumented file must compile with every mutant in place at once.
    // Normalize non-void bodies to end in an explicit return.
    if f.return_type != crate::ast::TypeDescriptor::Void
        && !matches!(body.stmts.last(), Some(Stmt::Return(_)))
    {
        body.stmts.push(Stmt::Return(Some(Expr::new(
            ExprKind::Default,
            f.return_type.clone(),
            Default::default(),
            Default::default(),
        ))));
    }

    Function {
        attrs: f.attrs.clone(),
        // Dispatch routines live at file scope, outside the declaring scope,
        // so private functions are widened one step.
        visibility: match f.visibility {
            Visibility::Private => Visibility::Internal,
            other => other,
        },
        name: f.name.clone(),
        type_params: f.type_params.clone(),
        params: f.params.clone(),
        return_type: f.return_type.clone(),
        body,
    }
}

fn instrument_block(block: &Block, registry: &mut FileLevelSchemaRegistry) -> Block {
    let stmts = block
        .stmts
        .iter()
        .map(|s| instrument_stmt(s, registry))
        .collect();
    Block { stmts }
}

fn instrument_stmt(stmt: &Stmt, registry: &mut FileLevelSchemaRegistry) -> Stmt {
    match stmt {
        Stmt::Decl(decl) => {
            // Const initializers must stay compile-time constants. Array
            // literals bound to an explicit length stay untouched so the
            // declared length keeps matching the initializer.
            let init = match &decl.init {
                Some(e) if decl.is_const => Some(e.clone()),
                Some(e) if decl.explicit_array_len && matches!(e.kind, ExprKind::ArrayLit(_)) => {
                    Some(e.clone())
                }
                Some(e) => Some(instrument_expr(e, registry)),
                None => None,
            };
            Stmt::Decl(crate::ast::Decl {
                init,
                ..decl.clone()
            })
        }
        Stmt::Expr(e) => Stmt::Expr(instrument_expr(e, registry)),
        Stmt::Return(e) => Stmt::Return(e.as_ref().map(|e| instrument_expr(e, registry))),
        Stmt::If {
            cond,
            then_block,
            else_block,
        } => Stmt::If {
            cond: instrument_expr(cond, registry),
            then_block: instrument_block(then_block, registry),
            else_block: else_block.as_ref().map(|b| instrument_block(b, registry)),
        },
        Stmt::While { cond, body } => Stmt::While {
            cond: instrument_expr(cond, registry),
            body: instrument_block(body, registry),
        },
        Stmt::Switch {
            scrutinee,
            cases,
            default,
        } => {
            let cases = cases
                .iter()
                .map(|case| {
                    let mut body = instrument_block(&case.body, registry);
                    // Mutants inside a case must not change which cases run;
                    // normalize implicit fallthrough to an explicit break.
                    if !matches!(body.stmts.last(), Some(Stmt::Break | Stmt::Return(_))) {
                        body.stmts.push(Stmt::Break);
                    }
                    crate::ast::SwitchCase {
                        // Case labels are compile-time constants.
                        label: case.label.clone(),
                        body,
                    }
                })
                .collect();
            Stmt::Switch {
                scrutinee: instrument_expr(scrutinee, registry),
                cases,
                default: default.as_ref().map(|b| instrument_block(b, registry)),
            }
        }
        Stmt::Break => Stmt::Break,
        // Assertions are the test oracle; mutating them would change what
        // "killed" means.
        Stmt::Assert(e) => Stmt::Assert(e.clone()),
    }
}

/// Rewrite one expression tree bottom-up.
pub fn instrument_expr(expr: &Expr, registry: &mut FileLevelSchemaRegistry) -> Expr {
    match &expr.kind {
        // Leaf literals: the node itself may be a site, nothing below it.
        ExprKind::Bool(_) | ExprKind::Int(_) | ExprKind::Str(_) => {
            match create_mutation_group(expr) {
                Some(group) => dispatch_call(expr, group, Vec::new(), registry),
                None => expr.clone(),
            }
        }

        ExprKind::Char(_) | ExprKind::Ident { .. } | ExprKind::Default => expr.clone(),

        // The binding introduced by the pattern is scoped to the surrounding
        // expression; hoisting any part into a routine would sever it.
        ExprKind::IsPattern { .. } => expr.clone(),

        ExprKind::Unary { op, fixity, operand } => {
            let group = create_mutation_group(expr);
            let operand = instrument_expr(operand, registry);
            match group {
                Some(group) => dispatch_call(expr, group, vec![operand], registry),
                None => Expr {
                    kind: ExprKind::Unary {
                        op: *op,
                        fixity: *fixity,
                        operand: Box::new(operand),
                    },
                    ..expr.clone()
                },
            }
        }

        ExprKind::Binary { op, lhs, rhs } => {
            let group = create_mutation_group(expr);
            let lhs = instrument_expr(lhs, registry);
            let rhs = instrument_expr(rhs, registry);
            match group {
                Some(group) => {
                    let (lhs, rhs) = if op.is_short_circuit() {
                        (thunk(lhs), thunk(rhs))
                    } else {
                        (lhs, rhs)
                    };
                    dispatch_call(expr, group, vec![lhs, rhs], registry)
                }
                None => Expr {
                    kind: ExprKind::Binary {
                        op: *op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    ..expr.clone()
                },
            }
        }

        ExprKind::CompoundAssign { op, lhs, rhs } => {
            let group = create_mutation_group(expr);
            let lhs_out = instrument_expr(lhs, registry);
            // A literal right-hand side is still a mutation site of its own,
            // but it lives at the left-hand side's type: candidate selection
            // (signedness) and the routine's return type both follow the lhs.
            let rhs_out = if rhs.as_int_literal().is_some() {
                let mut lit = rhs.as_ref().clone();
                lit.ty = lhs.ty.clone();
                match create_mutation_group_typed(&lit, Some(lhs.ty.clone())) {
                    Some(lit_group) => dispatch_call(&lit, lit_group, Vec::new(), registry),
                    None => rhs.as_ref().clone(),
                }
            } else {
                instrument_expr(rhs, registry)
            };
            match group {
                Some(group) => dispatch_call(expr, group, vec![lhs_out, rhs_out], registry),
                None => Expr {
                    kind: ExprKind::CompoundAssign {
                        op: *op,
                        lhs: Box::new(lhs_out),
                        rhs: Box::new(rhs_out),
                    },
                    ..expr.clone()
                },
            }
        }

        ExprKind::Assign { lhs, rhs } => Expr {
            kind: ExprKind::Assign {
                lhs: Box::new(instrument_expr(lhs, registry)),
                rhs: Box::new(instrument_expr(rhs, registry)),
            },
            ..expr.clone()
        },

        ExprKind::Call { name, args } => Expr {
            kind: ExprKind::Call {
                name: name.clone(),
                args: args.iter().map(|a| instrument_expr(a, registry)).collect(),
            },
            ..expr.clone()
        },

        ExprKind::Index { base, index } => Expr {
            kind: ExprKind::Index {
                base: Box::new(instrument_expr(base, registry)),
                index: Box::new(instrument_expr(index, registry)),
            },
            ..expr.clone()
        },

        ExprKind::ArrayLit(elems) => Expr {
            kind: ExprKind::ArrayLit(
                elems.iter().map(|e| instrument_expr(e, registry)).collect(),
            ),
            ..expr.clone()
        },

        // Only this pass produces these nodes.
        ExprKind::Thunk(_) | ExprKind::SchemaCall(_) => expr.clone(),
    }
}

fn thunk(inner: Expr) -> Expr {
    let ty = inner.ty.clone();
    let span = inner.span;
    let line_span = inner.line_span;
    Expr::new(ExprKind::Thunk(Box::new(inner)), ty, span, line_span)
}

fn dispatch_call(
    original: &Expr,
    group: MutationGroup,
    operands: Vec<Expr>,
    registry: &mut FileLevelSchemaRegistry,
) -> Expr {
    let base_id = registry.register(group.clone());
    let routine = registry.dispatch_routine_name(&group);
    Expr::new(
        ExprKind::SchemaCall(Box::new(SchemaCall {
            routine,
            base_id,
            operand_kind: group.operand_kind,
            operands,
            group: group.clone(),
        })),
        group.return_type,
        original.span,
        original.line_span,
    )
}
