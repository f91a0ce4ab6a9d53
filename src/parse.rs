//! Frontend for the surface language the engine instruments.
//!
//! A small recursive-descent parser producing the typed tree in
//! [`crate::ast`]. Types come from literal suffixes, declaration
//! annotations, and operator result types; an undeclared identifier is a
//! hard error since the rewriter needs a fully typed tree.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};

use crate::ast::{
    Block, Decl, Expr, ExprKind, Function, Param, SourceUnit, Stmt, SwitchCase, TypeDescriptor,
    Visibility,
};
use crate::expr::{BinOp, Fixity, UnaryOp};
use crate::span::{SourceSpan, line_span_for};

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Int(i128, TypeDescriptor),
    Str(String),
    Char(char),
    Punct(&'static str),
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    start: u32,
    end: u32,
}

const PUNCTS: &[&str] = &[
    // longest first so the lexer matches greedily
    "<<=", ">>=", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=", "%=",
    "&=", "^=", "|=", "<<", ">>", "->", "{", "}", "(", ")", "[", "]", "<", ">", ",", ";", ":",
    "=", "+", "-", "*", "/", "%", "&", "|", "^", "!", "@",
];

fn lex(code: &str) -> Result<Vec<Token>> {
    let bytes = code.as_bytes();
    let mut toks = Vec::new();
    let mut i = 0usize;

    'outer: while i < bytes.len() {
        let c = bytes[i] as char;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        // Line comments.
        if code[i..].starts_with("//") {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }

        let start = i;

        if c.is_ascii_digit() {
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let value: i128 = code[start..i]
                .parse()
                .with_context(|| format!("bad integer literal at byte {start}"))?;

            // Optional type suffix.
            let ty = if code[i..].starts_with("i64") {
                i += 3;
                TypeDescriptor::I64
            } else if code[i..].starts_with("u64") {
                i += 3;
                TypeDescriptor::U64
            } else if code[i..].starts_with("u32") {
                i += 3;
                TypeDescriptor::U32
            } else if code[i..].starts_with("i32") {
                i += 3;
                TypeDescriptor::I32
            } else if i < bytes.len() && bytes[i] == b'u' {
                i += 1;
                TypeDescriptor::U32
            } else {
                TypeDescriptor::I32
            };

            toks.push(Token {
                tok: Tok::Int(value, ty),
                start: start as u32,
                end: i as u32,
            });
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            toks.push(Token {
                tok: Tok::Ident(code[start..i].to_string()),
                start: start as u32,
                end: i as u32,
            });
            continue;
        }

        if c == '"' {
            i += 1;
            let mut value = String::new();
            while i < bytes.len() {
                match bytes[i] as char {
                    '"' => {
                        i += 1;
                        toks.push(Token {
                            tok: Tok::Str(value),
                            start: start as u32,
                            end: i as u32,
                        });
                        continue 'outer;
                    }
                    '\\' => {
                        i += 1;
                        let esc = *bytes.get(i).unwrap_or(&b'"') as char;
                        value.push(match esc {
                            'n' => '\n',
                            't' => '\t',
                            other => other,
                        });
                        i += 1;
                    }
                    other => {
                        value.push(other);
                        i += other.len_utf8();
                    }
                }
            }
            bail!("unterminated string literal at byte {start}");
        }

        if c == '\'' {
            let rest = &code[i + 1..];
            let ch = rest.chars().next().context("unterminated char literal")?;
            let close = 1 + ch.len_utf8();
            if !rest[close - 1..].starts_with('\'') {
                bail!("unterminated char literal at byte {start}");
            }
            i += close + 1;
            toks.push(Token {
                tok: Tok::Char(ch),
                start: start as u32,
                end: i as u32,
            });
            continue;
        }

        for p in PUNCTS {
            if code[i..].starts_with(p) {
                i += p.len();
                toks.push(Token {
                    tok: Tok::Punct(p),
                    start: start as u32,
                    end: i as u32,
                });
                continue 'outer;
            }
        }

        bail!("unexpected character {c:?} at byte {start}");
    }

    Ok(toks)
}

/// Parse one source file into a typed tree.
pub fn parse_source_unit(code: &str) -> Result<SourceUnit> {
    let toks = lex(code)?;
    let mut p = Parser {
        code,
        toks,
        pos: 0,
        scopes: Vec::new(),
    };
    p.source_unit()
}

/// Parse a single expression with the given variables in scope.
#[cfg(test)]
pub fn parse_expr_with_vars(code: &str, vars: &[(&str, TypeDescriptor)]) -> Result<Expr> {
    let toks = lex(code)?;
    let mut scope = HashMap::new();
    for (name, ty) in vars {
        scope.insert(
            name.to_string(),
            Binding {
                ty: ty.clone(),
                assignable: true,
            },
        );
    }
    let mut p = Parser {
        code,
        toks,
        pos: 0,
        scopes: vec![scope],
    };
    let expr = p.expr()?;
    if p.pos != p.toks.len() {
        bail!("trailing input after expression");
    }
    Ok(expr)
}

#[derive(Debug, Clone)]
struct Binding {
    ty: TypeDescriptor,
    assignable: bool,
}

struct Parser<'a> {
    code: &'a str,
    toks: Vec<Token>,
    pos: usize,
    scopes: Vec<HashMap<String, Binding>>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos).map(|t| &t.tok)
    }

    fn peek_punct(&self, p: &str) -> bool {
        matches!(self.peek(), Some(Tok::Punct(q)) if *q == p)
    }

    fn peek_kw(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Tok::Ident(w)) if w == kw)
    }

    fn bump(&mut self) -> Result<Token> {
        let t = self
            .toks
            .get(self.pos)
            .cloned()
            .context("unexpected end of input")?;
        self.pos += 1;
        Ok(t)
    }

    fn expect_punct(&mut self, p: &str) -> Result<Token> {
        let t = self.bump()?;
        match &t.tok {
            Tok::Punct(q) if *q == p => Ok(t),
            other => bail!("expected {p:?} at byte {}, found {other:?}", t.start),
        }
    }

    fn expect_kw(&mut self, kw: &str) -> Result<()> {
        let t = self.bump()?;
        match &t.tok {
            Tok::Ident(w) if w == kw => Ok(()),
            other => bail!("expected keyword {kw:?} at byte {}, found {other:?}", t.start),
        }
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.peek_punct(p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_kw(&mut self, kw: &str) -> bool {
        if self.peek_kw(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<String> {
        let t = self.bump()?;
        match t.tok {
            Tok::Ident(name) => Ok(name),
            other => bail!("expected identifier at byte {}, found {other:?}", t.start),
        }
    }

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    fn declare(&mut self, name: &str, ty: TypeDescriptor, assignable: bool) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), Binding { ty, assignable });
        }
    }

    fn mk_expr(&self, kind: ExprKind, ty: TypeDescriptor, start: u32, end: u32) -> Expr {
        let span = SourceSpan::new(start, end - start);
        let line_span = line_span_for(self.code, &span).unwrap_or_default();
        Expr::new(kind, ty, span, line_span)
    }

    fn span_start(&self) -> u32 {
        self.toks.get(self.pos).map(|t| t.start).unwrap_or(0)
    }

    fn prev_end(&self) -> u32 {
        self.toks
            .get(self.pos.saturating_sub(1))
            .map(|t| t.end)
            .unwrap_or(0)
    }

    // ---- declarations -----------------------------------------------------

    fn source_unit(&mut self) -> Result<SourceUnit> {
        let mut functions = Vec::new();
        while self.pos < self.toks.len() {
            functions.push(self.function()?);
        }
        Ok(SourceUnit { functions })
    }

    fn function(&mut self) -> Result<Function> {
        let mut attrs = Vec::new();
        while self.eat_punct("@") {
            attrs.push(self.ident()?);
        }

        let visibility = if self.eat_kw("pub") {
            Visibility::Public
        } else if self.eat_kw("internal") {
            Visibility::Internal
        } else {
            Visibility::Private
        };

        self.expect_kw("fn")?;
        let name = self.ident()?;

        let mut type_params = Vec::new();
        if self.eat_punct("<") {
            loop {
                type_params.push(self.ident()?);
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.expect_punct(">")?;
        }

        self.scopes.push(HashMap::new());

        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.peek_punct(")") {
            let pname = self.ident()?;
            self.expect_punct(":")?;
            let ty = self.type_descriptor()?;
            self.declare(&pname, ty.clone(), true);
            params.push(Param { name: pname, ty });
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;

        let return_type = if self.eat_punct("->") {
            self.type_descriptor()?
        } else {
            TypeDescriptor::Void
        };

        let body = self.block()?;
        self.scopes.pop();

        Ok(Function {
            attrs,
            visibility,
            name,
            type_params,
            params,
            return_type,
            body,
        })
    }

    fn type_descriptor(&mut self) -> Result<TypeDescriptor> {
        if self.eat_punct("[") {
            let elem = self.type_descriptor()?;
            self.expect_punct(";")?;
            let t = self.bump()?;
            let len = match t.tok {
                Tok::Int(v, _) if v >= 0 => v as usize,
                other => bail!("expected array length at byte {}, found {other:?}", t.start),
            };
            self.expect_punct("]")?;
            return Ok(TypeDescriptor::Array {
                elem: Box::new(elem),
                len,
            });
        }

        let name = self.ident()?;
        Ok(match name.as_str() {
            "bool" => TypeDescriptor::Bool,
            "i32" => TypeDescriptor::I32,
            "i64" => TypeDescriptor::I64,
            "u32" => TypeDescriptor::U32,
            "u64" => TypeDescriptor::U64,
            "char" => TypeDescriptor::Char,
            "str" => TypeDescriptor::Str,
            "void" => TypeDescriptor::Void,
            _ => TypeDescriptor::Named(name),
        })
    }

    // ---- statements -------------------------------------------------------

    fn block(&mut self) -> Result<Block> {
        self.expect_punct("{")?;
        self.scopes.push(HashMap::new());
        let mut stmts = Vec::new();
        while !self.peek_punct("}") {
            stmts.push(self.stmt()?);
        }
        self.scopes.pop();
        self.expect_punct("}")?;
        Ok(Block { stmts })
    }

    fn stmt(&mut self) -> Result<Stmt> {
        if self.peek_kw("var") || self.peek_kw("const") {
            return self.decl_stmt();
        }
        if self.eat_kw("return") {
            if self.eat_punct(";") {
                return Ok(Stmt::Return(None));
            }
            let e = self.expr()?;
            self.expect_punct(";")?;
            return Ok(Stmt::Return(Some(e)));
        }
        if self.eat_kw("if") {
            self.expect_punct("(")?;
            let cond = self.expr()?;
            self.expect_punct(")")?;
            let then_block = self.block()?;
            let else_block = if self.eat_kw("else") {
                Some(self.block()?)
            } else {
                None
            };
            return Ok(Stmt::If {
                cond,
                then_block,
                else_block,
            });
        }
        if self.eat_kw("while") {
            self.expect_punct("(")?;
            let cond = self.expr()?;
            self.expect_punct(")")?;
            let body = self.block()?;
            return Ok(Stmt::While { cond, body });
        }
        if self.eat_kw("switch") {
            return self.switch_stmt();
        }
        if self.eat_kw("break") {
            self.expect_punct(";")?;
            return Ok(Stmt::Break);
        }
        if self.eat_kw("assert") {
            self.expect_punct("(")?;
            let e = self.expr()?;
            self.expect_punct(")")?;
            self.expect_punct(";")?;
            return Ok(Stmt::Assert(e));
        }

        let e = self.expr()?;
        self.expect_punct(";")?;
        Ok(Stmt::Expr(e))
    }

    fn decl_stmt(&mut self) -> Result<Stmt> {
        let is_const = self.eat_kw("const");
        if !is_const {
            self.expect_kw("var")?;
        }
        let name = self.ident()?;

        let mut annotated = None;
        if self.eat_punct(":") {
            annotated = Some(self.type_descriptor()?);
        }

        let init = if self.eat_punct("=") {
            Some(self.expr()?)
        } else {
            None
        };
        self.expect_punct(";")?;

        let ty = match (&annotated, &init) {
            (Some(t), _) => t.clone(),
            (None, Some(e)) => e.ty.clone(),
            (None, None) => bail!("declaration of {name:?} needs a type or an initializer"),
        };

        let explicit_array_len = matches!(annotated, Some(TypeDescriptor::Array { .. }));
        self.declare(&name, ty.clone(), !is_const);

        Ok(Stmt::Decl(Decl {
            is_const,
            name,
            ty,
            explicit_array_len,
            init,
        }))
    }

    fn switch_stmt(&mut self) -> Result<Stmt> {
        self.expect_punct("(")?;
        let scrutinee = self.expr()?;
        self.expect_punct(")")?;
        self.expect_punct("{")?;

        let mut cases = Vec::new();
        let mut default = None;
        while !self.peek_punct("}") {
            if self.eat_kw("case") {
                let label = self.primary()?;
                self.expect_punct(":")?;
                let body = self.case_body()?;
                cases.push(SwitchCase { label, body });
            } else if self.eat_kw("default") {
                self.expect_punct(":")?;
                default = Some(self.case_body()?);
            } else {
                let t = self.bump()?;
                bail!("expected case/default at byte {}, found {:?}", t.start, t.tok);
            }
        }
        self.expect_punct("}")?;

        Ok(Stmt::Switch {
            scrutinee,
            cases,
            default,
        })
    }

    fn case_body(&mut self) -> Result<Block> {
        self.scopes.push(HashMap::new());
        let mut stmts = Vec::new();
        while !self.peek_punct("}") && !self.peek_kw("case") && !self.peek_kw("default") {
            stmts.push(self.stmt()?);
        }
        self.scopes.pop();
        Ok(Block { stmts })
    }

    // ---- expressions ------------------------------------------------------

    fn expr(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let start = self.span_start();
        let lhs = self.binary_level(0)?;

        const COMPOUND: &[(&str, BinOp)] = &[
            ("+=", BinOp::Add),
            ("-=", BinOp::Sub),
            ("*=", BinOp::Mul),
            ("/=", BinOp::Div),
            ("%=", BinOp::Rem),
            ("&=", BinOp::BitAnd),
            ("^=", BinOp::BitXor),
            ("|=", BinOp::BitOr),
            ("<<=", BinOp::Shl),
            (">>=", BinOp::Shr),
        ];

        for (tok, op) in COMPOUND {
            if self.eat_punct(tok) {
                let rhs = self.assignment()?;
                let end = self.prev_end();
                let ty = lhs.ty.clone();
                return Ok(self.mk_expr(
                    ExprKind::CompoundAssign {
                        op: *op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    ty,
                    start,
                    end,
                ));
            }
        }

        if self.eat_punct("=") {
            let rhs = self.assignment()?;
            let end = self.prev_end();
            let ty = lhs.ty.clone();
            return Ok(self.mk_expr(
                ExprKind::Assign {
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                ty,
                start,
                end,
            ));
        }

        Ok(lhs)
    }

    /// Binary operator precedence levels, loosest first.
    fn binary_level(&mut self, level: usize) -> Result<Expr> {
        const LEVELS: &[&[(&str, BinOp)]] = &[
            &[("||", BinOp::OrOr)],
            &[("&&", BinOp::AndAnd)],
            &[("|", BinOp::BitOr)],
            &[("^", BinOp::BitXor)],
            &[("&", BinOp::BitAnd)],
            &[("==", BinOp::Eq), ("!=", BinOp::Ne)],
            &[
                ("<=", BinOp::Le),
                (">=", BinOp::Ge),
                ("<", BinOp::Lt),
                (">", BinOp::Gt),
            ],
            &[("<<", BinOp::Shl), (">>", BinOp::Shr)],
            &[("+", BinOp::Add), ("-", BinOp::Sub)],
            &[("*", BinOp::Mul), ("/", BinOp::Div), ("%", BinOp::Rem)],
        ];

        if level == LEVELS.len() {
            return self.unary();
        }

        let start = self.span_start();
        let mut lhs = self.binary_level(level + 1)?;

        'scan: loop {
            for (tok, op) in LEVELS[level] {
                if self.peek_punct(tok) {
                    self.pos += 1;
                    let rhs = self.binary_level(level + 1)?;
                    let end = self.prev_end();
                    let ty = if op.is_comparison() {
                        TypeDescriptor::Bool
                    } else {
                        lhs.ty.clone()
                    };
                    lhs = self.mk_expr(
                        ExprKind::Binary {
                            op: *op,
                            lhs: Box::new(lhs),
                            rhs: Box::new(rhs),
                        },
                        ty,
                        start,
                        end,
                    );
                    continue 'scan;
                }
            }
            break;
        }

        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        let start = self.span_start();

        for (tok, op) in [("++", UnaryOp::Inc), ("--", UnaryOp::Dec)] {
            if self.eat_punct(tok) {
                let operand = self.unary()?;
                let end = self.prev_end();
                let ty = operand.ty.clone();
                return Ok(self.mk_expr(
                    ExprKind::Unary {
                        op,
                        fixity: Fixity::Prefix,
                        operand: Box::new(operand),
                    },
                    ty,
                    start,
                    end,
                ));
            }
        }

        if self.eat_punct("!") {
            let operand = self.unary()?;
            let end = self.prev_end();
            return Ok(self.mk_expr(
                ExprKind::Unary {
                    op: UnaryOp::Not,
                    fixity: Fixity::Prefix,
                    operand: Box::new(operand),
                },
                TypeDescriptor::Bool,
                start,
                end,
            ));
        }

        if self.eat_punct("-") {
            // Fold negation into a literal so `-5` is one numeric constant.
            if let Some(Tok::Int(..)) = self.peek() {
                let t = self.bump()?;
                let Tok::Int(v, ty) = t.tok else { unreachable!() };
                return Ok(self.mk_expr(ExprKind::Int(-v), ty, start, t.end));
            }
            let operand = self.unary()?;
            let end = self.prev_end();
            let ty = operand.ty.clone();
            return Ok(self.mk_expr(
                ExprKind::Unary {
                    op: UnaryOp::Neg,
                    fixity: Fixity::Prefix,
                    operand: Box::new(operand),
                },
                ty,
                start,
                end,
            ));
        }

        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr> {
        let start = self.span_start();
        let mut e = self.primary()?;

        loop {
            let mut matched = false;
            for (tok, op) in [("++", UnaryOp::Inc), ("--", UnaryOp::Dec)] {
                if self.eat_punct(tok) {
                    let end = self.prev_end();
                    let ty = e.ty.clone();
                    e = self.mk_expr(
                        ExprKind::Unary {
                            op,
                            fixity: Fixity::Postfix,
                            operand: Box::new(e),
                        },
                        ty,
                        start,
                        end,
                    );
                    matched = true;
                    break;
                }
            }
            if matched {
                continue;
            }

            if self.eat_punct("[") {
                let index = self.expr()?;
                self.expect_punct("]")?;
                let end = self.prev_end();
                let ty = match &e.ty {
                    TypeDescriptor::Array { elem, .. } => (**elem).clone(),
                    other => other.clone(),
                };
                e = self.mk_expr(
                    ExprKind::Index {
                        base: Box::new(e),
                        index: Box::new(index),
                    },
                    ty,
                    start,
                    end,
                );
                continue;
            }

            if self.peek_kw("is") {
                self.pos += 1;
                self.expect_kw("var")?;
                let binding = self.ident()?;
                let end = self.prev_end();
                self.declare(&binding, e.ty.clone(), false);
                e = self.mk_expr(
                    ExprKind::IsPattern {
                        scrutinee: Box::new(e),
                        binding,
                    },
                    TypeDescriptor::Bool,
                    start,
                    end,
                );
                continue;
            }

            break;
        }

        Ok(e)
    }

    fn primary(&mut self) -> Result<Expr> {
        let t = self.bump()?;
        let start = t.start;

        match t.tok {
            Tok::Int(v, ty) => Ok(self.mk_expr(ExprKind::Int(v), ty, start, t.end)),
            Tok::Str(s) => Ok(self.mk_expr(ExprKind::Str(s), TypeDescriptor::Str, start, t.end)),
            Tok::Char(c) => Ok(self.mk_expr(ExprKind::Char(c), TypeDescriptor::Char, start, t.end)),
            Tok::Punct("(") => {
                let inner = self.expr()?;
                self.expect_punct(")")?;
                let end = self.prev_end();
                // Re-span the parenthesized expression; the tree is the same.
                Ok(self.mk_expr(inner.kind, inner.ty, start, end))
            }
            Tok::Punct("[") => {
                let mut elems = Vec::new();
                while !self.peek_punct("]") {
                    elems.push(self.expr()?);
                    if !self.eat_punct(",") {
                        break;
                    }
                }
                self.expect_punct("]")?;
                let end = self.prev_end();
                let elem_ty = elems
                    .first()
                    .map(|e| e.ty.clone())
                    .unwrap_or(TypeDescriptor::Void);
                let len = elems.len();
                Ok(self.mk_expr(
                    ExprKind::ArrayLit(elems),
                    TypeDescriptor::Array {
                        elem: Box::new(elem_ty),
                        len,
                    },
                    start,
                    end,
                ))
            }
            Tok::Ident(name) => match name.as_str() {
                "true" => Ok(self.mk_expr(ExprKind::Bool(true), TypeDescriptor::Bool, start, t.end)),
                "false" => {
                    Ok(self.mk_expr(ExprKind::Bool(false), TypeDescriptor::Bool, start, t.end))
                }
                "default" => {
                    Ok(self.mk_expr(ExprKind::Default, TypeDescriptor::Void, start, t.end))
                }
                _ => {
                    if self.eat_punct("(") {
                        let mut args = Vec::new();
                        while !self.peek_punct(")") {
                            args.push(self.expr()?);
                            if !self.eat_punct(",") {
                                break;
                            }
                        }
                        self.expect_punct(")")?;
                        let end = self.prev_end();
                        // Calls are typed by the callee when known, else void.
                        return Ok(self.mk_expr(
                            ExprKind::Call { name, args },
                            TypeDescriptor::Void,
                            start,
                            end,
                        ));
                    }

                    let binding = self
                        .lookup(&name)
                        .with_context(|| format!("undeclared identifier {name:?}"))?
                        .clone();
                    Ok(self.mk_expr(
                        ExprKind::Ident {
                            name,
                            assignable: binding.assignable,
                        },
                        binding.ty,
                        start,
                        t.end,
                    ))
                }
            },
            other => bail!("unexpected token {other:?} at byte {start}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_typed_comparison() {
        let e = parse_expr_with_vars(
            "x > y",
            &[("x", TypeDescriptor::I32), ("y", TypeDescriptor::I32)],
        )
        .unwrap();
        assert_eq!(e.ty, TypeDescriptor::Bool);
        match e.kind {
            ExprKind::Binary { op, lhs, rhs } => {
                assert_eq!(op, BinOp::Gt);
                assert_eq!(lhs.ty, TypeDescriptor::I32);
                assert_eq!(rhs.ty, TypeDescriptor::I32);
            }
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn literal_suffixes_set_types() {
        let e = parse_expr_with_vars("5u", &[]).unwrap();
        assert_eq!(e.ty, TypeDescriptor::U32);
        let e = parse_expr_with_vars("5i64", &[]).unwrap();
        assert_eq!(e.ty, TypeDescriptor::I64);
        let e = parse_expr_with_vars("-5", &[]).unwrap();
        assert_eq!(e.kind, ExprKind::Int(-5));
    }

    #[test]
    fn undeclared_identifier_is_an_error() {
        let err = parse_expr_with_vars("nope + 1", &[]).unwrap_err();
        assert!(format!("{err:#}").contains("undeclared identifier"));
    }

    #[test]
    fn spans_cover_the_expression_text() {
        let code = "x > y";
        let e = parse_expr_with_vars(
            code,
            &[("x", TypeDescriptor::I32), ("y", TypeDescriptor::I32)],
        )
        .unwrap();
        assert_eq!(e.span, SourceSpan::new(0, 5));
        assert_eq!(e.line_span.start_line, 1);
        assert_eq!(e.line_span.end_col, 6);
    }

    #[test]
    fn parses_a_whole_function() {
        let code = "\
pub fn max(x: i32, y: i32) -> i32 {
    if (x > y) { return x; }
    return y;
}
";
        let unit = parse_source_unit(code).unwrap();
        assert_eq!(unit.functions.len(), 1);
        let f = &unit.functions[0];
        assert_eq!(f.name, "max");
        assert_eq!(f.visibility, Visibility::Public);
        assert_eq!(f.return_type, TypeDescriptor::I32);
        assert_eq!(f.body.stmts.len(), 2);
    }

    #[test]
    fn const_bindings_are_not_assignable() {
        let code = "\
fn f() -> i32 {
    const LIMIT: i32 = 10;
    return LIMIT;
}
";
        let unit = parse_source_unit(code).unwrap();
        let Stmt::Return(Some(ret)) = &unit.functions[0].body.stmts[1] else {
            panic!("expected return");
        };
        assert!(!ret.is_assignable_place());
    }

    #[test]
    fn is_pattern_introduces_a_binding() {
        let code = "\
fn f(x: i32) -> bool {
    return x is var y && y > 0;
}
";
        let unit = parse_source_unit(code).unwrap();
        let Stmt::Return(Some(ret)) = &unit.functions[0].body.stmts[0] else {
            panic!("expected return");
        };
        assert_eq!(ret.ty, TypeDescriptor::Bool);
    }

    #[test]
    fn explicit_array_size_is_flagged() {
        let code = "\
fn f() {
    var a: [i32; 3] = [1, 2, 3];
    var b = [4, 5];
}
";
        let unit = parse_source_unit(code).unwrap();
        let Stmt::Decl(a) = &unit.functions[0].body.stmts[0] else {
            panic!("expected decl");
        };
        assert!(a.explicit_array_len);
        let Stmt::Decl(b) = &unit.functions[0].body.stmts[1] else {
            panic!("expected decl");
        };
        assert!(!b.explicit_array_len);
    }

    #[test]
    fn parses_switch_with_cases_and_default() {
        let code = "\
fn f(x: i32) -> i32 {
    var y = 0;
    switch (x) {
        case 0:
            y = 1;
        case 1:
            y = 2;
            break;
        default:
            y = 3;
    }
    return y;
}
";
        let unit = parse_source_unit(code).unwrap();
        let Stmt::Switch { cases, default, .. } = &unit.functions[0].body.stmts[1] else {
            panic!("expected switch");
        };
        assert_eq!(cases.len(), 2);
        assert!(default.is_some());
    }

    #[test]
    fn parses_attributes_and_type_params() {
        let code = "\
@inline
fn pick<T>(flag: bool) -> i32 {
    return 1;
}
";
        let unit = parse_source_unit(code).unwrap();
        let f = &unit.functions[0];
        assert_eq!(f.attrs, vec!["inline".to_string()]);
        assert_eq!(f.type_params, vec!["T".to_string()]);
        assert_eq!(f.visibility, Visibility::Private);
    }

    #[test]
    fn precedence_binds_mul_tighter_than_add() {
        let e = parse_expr_with_vars(
            "a + b * c",
            &[
                ("a", TypeDescriptor::I32),
                ("b", TypeDescriptor::I32),
                ("c", TypeDescriptor::I32),
            ],
        )
        .unwrap();
        let ExprKind::Binary { op, rhs, .. } = &e.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinOp::Add);
        assert!(matches!(
            rhs.kind,
            ExprKind::Binary { op: BinOp::Mul, .. }
        ));
    }
}
