//! AST representing a parsed template.
//!
//! Statements and expressions are closed sum types so that the renderer can
//! dispatch with exhaustive pattern matching. Identifiers and raw text are
//! stored as spans into the owning template's source.

use crate::types::span::Span;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Scope {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Raw(Span),
    Print(Print),
    IfElse(IfElse),
    ForLoop(ForLoop),
    Block(Block),
    Extends(Extends),
}

/// An interpolation, e.g. `{{ user.name | lower }}`.
#[derive(Debug, Clone)]
pub struct Print {
    pub expr: Expr,
    pub tag: Trim,
}

/// Whitespace trim markers on a single `{{ .. }}` or `{% .. %}` tag.
///
/// `before` is a `-` against the opening delimiter and requests that output
/// already emitted be right-trimmed; `after` is a `-` against the closing
/// delimiter and requests that the next emitted text be left-trimmed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Trim {
    pub before: bool,
    pub after: bool,
}

#[derive(Debug, Clone)]
pub struct IfElse {
    pub cond: Expr,
    pub then_branch: Scope,
    pub else_branch: Option<Scope>,
    pub if_tag: Trim,
    pub else_tag: Trim,
    pub end_tag: Trim,
}

#[derive(Debug, Clone)]
pub struct ForLoop {
    pub var: Ident,
    pub iterable: Var,
    pub body: Scope,
    pub for_tag: Trim,
    pub end_tag: Trim,
}

/// A named, overridable region, e.g. `{% block content %} .. {% endblock %}`.
#[derive(Debug, Clone)]
pub struct Block {
    pub name: Ident,
    pub body: Scope,
    pub begin_tag: Trim,
    pub end_tag: Trim,
}

/// An inheritance directive, e.g. `{% extends "base.html" %}`.
#[derive(Debug, Clone)]
pub struct Extends {
    pub name: Str,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Var(Var),
    Literal(Literal),
    Not(Not),
    Binary(Binary),
    Filter(Filter),
}

/// A dotted variable path, e.g. `user.name`.
#[derive(Debug, Clone)]
pub struct Var {
    pub path: Vec<Ident>,
}

#[derive(Debug, Clone)]
pub struct Not {
    pub expr: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Binary {
    pub op: BinOp,
    pub span: Span,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

/// A filter application, e.g. the `| lower` in `{{ name | lower }}`.
///
/// Filters are stored as expression nodes rather than as a list on
/// [`Print`] so that a filtered expression can appear as a comparison
/// operand, e.g. `{{ text | wordcount > 4 }}`.
#[derive(Debug, Clone)]
pub struct Filter {
    pub name: Ident,
    pub arg: Option<Box<Expr>>,
    pub receiver: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub struct Ident {
    pub span: Span,
}

/// The contents of a string literal. The span covers the quoted source.
#[derive(Debug, Clone)]
pub struct Str {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Literal {
    pub value: Value,
    pub span: Span,
}

impl Scope {
    pub const fn new() -> Self {
        Self { stmts: Vec::new() }
    }
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Self::Var(var) => var.span(),
            Self::Literal(lit) => lit.span,
            Self::Not(not) => not.span,
            Self::Binary(binary) => binary.span,
            Self::Filter(filter) => filter.span,
        }
    }
}

impl Var {
    pub fn span(&self) -> Span {
        let first = self.path.first().unwrap().span;
        let last = self.path.last().unwrap().span;
        first.combine(last)
    }
}

impl BinOp {
    pub fn human(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}
