use crate::compile::lex::{Lexer, Token};
use crate::types::ast;
use crate::types::span::Span;
use crate::value::Value;
use crate::{Error, Result};

/// A parser that constructs an AST from the lexed token stream.
///
/// Nested statements like `if` and `for` are tracked with two stacks. One
/// stack for the statement kind and one stack of scopes that statements are
/// appended to. When a statement like `endif` is reached the corresponding
/// scopes are popped and the complete statement is appended to the parent
/// scope.
pub struct Parser<'source> {
    tokens: Lexer<'source>,
    peeked: Option<Option<(Token, Span)>>,
    /// Number of operators and filters in the current expression.
    expr_depth: usize,
}

/// The maximum number of operators and filters in a single expression.
///
/// Every operator nests the tree one level deeper, and evaluation recurses
/// per level, so unbounded expressions would exhaust the stack.
const MAX_EXPR_DEPTH: usize = 128;

/// An unfinished nested statement.
enum State {
    If {
        cond: ast::Expr,
        if_tag: ast::Trim,
        then_branch: Option<ast::Scope>,
        else_tag: ast::Trim,
        span: Span,
    },
    For {
        var: ast::Ident,
        iterable: ast::Var,
        for_tag: ast::Trim,
        span: Span,
    },
    Block {
        name: ast::Ident,
        begin_tag: ast::Trim,
        span: Span,
    },
}

/// A keyword in a statement tag or expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If,
    Else,
    EndIf,
    For,
    In,
    EndFor,
    Block,
    EndBlock,
    Extends,
    Not,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            tokens: Lexer::new(source),
            peeked: None,
            expr_depth: 0,
        }
    }

    fn source(&self) -> &'source str {
        self.tokens.source
    }

    /// Parses the entire template into the root scope.
    pub fn parse_template(mut self) -> Result<ast::Scope> {
        let mut blocks: Vec<State> = Vec::new();
        let mut scopes: Vec<ast::Scope> = vec![ast::Scope::new()];

        while let Some((tk, span)) = self.next()? {
            let stmt = match tk {
                Token::Raw => ast::Stmt::Raw(span),
                Token::BeginComment => {
                    self.parse_comment()?;
                    continue;
                }
                Token::BeginExpr => {
                    let expr = self.parse_expr()?;
                    let end = self.expect(Token::EndExpr)?;
                    ast::Stmt::Print(ast::Print {
                        expr,
                        tag: self.trim(span, end),
                    })
                }
                Token::BeginStmt => {
                    match self.parse_stmt(span, &mut blocks, &mut scopes)? {
                        Some(stmt) => stmt,
                        None => continue,
                    }
                }
                tk => {
                    return Err(self.err_unexpected_token(tk, span));
                }
            };
            scopes.last_mut().unwrap().stmts.push(stmt);
        }

        if let Some(block) = blocks.first() {
            let (human, span) = match block {
                State::If { span, .. } => ("if", *span),
                State::For { span, .. } => ("for", *span),
                State::Block { span, .. } => ("block", *span),
            };
            return Err(Error::parse(
                format!("unclosed `{human}` statement"),
                self.source(),
                span,
            ));
        }

        assert!(scopes.len() == 1, "unbalanced scopes");
        Ok(scopes.remove(0))
    }

    /// Skips over the contents of a comment.
    fn parse_comment(&mut self) -> Result<()> {
        loop {
            match self.next()? {
                Some((Token::Raw, _)) => continue,
                Some((Token::EndComment, _)) => return Ok(()),
                Some((tk, span)) => return Err(self.err_unexpected_token(tk, span)),
                None => unreachable!("lexer yields end comment or error"),
            }
        }
    }

    /// Parses a `{% .. %}` statement. Returns a statement when the tag
    /// completes one, otherwise updates the block state.
    fn parse_stmt(
        &mut self,
        begin: Span,
        blocks: &mut Vec<State>,
        scopes: &mut Vec<ast::Scope>,
    ) -> Result<Option<ast::Stmt>> {
        let (kw, kw_span) = self.expect_any_keyword()?;
        match kw {
            Keyword::If => {
                let cond = self.parse_expr()?;
                let end = self.expect(Token::EndStmt)?;
                blocks.push(State::If {
                    cond,
                    if_tag: self.trim(begin, end),
                    then_branch: None,
                    else_tag: ast::Trim::default(),
                    span: begin.combine(end),
                });
                scopes.push(ast::Scope::new());
                Ok(None)
            }

            Keyword::Else => {
                let end = self.expect(Token::EndStmt)?;
                match blocks.last_mut() {
                    Some(State::If {
                        then_branch,
                        else_tag,
                        ..
                    }) if then_branch.is_none() => {
                        *then_branch = Some(scopes.pop().unwrap());
                        *else_tag = self.trim(begin, end);
                        scopes.push(ast::Scope::new());
                        Ok(None)
                    }
                    _ => Err(self.err_unexpected_keyword(kw, kw_span)),
                }
            }

            Keyword::EndIf => {
                let end = self.expect(Token::EndStmt)?;
                match blocks.pop() {
                    Some(State::If {
                        cond,
                        if_tag,
                        then_branch,
                        else_tag,
                        ..
                    }) => {
                        let last = scopes.pop().unwrap();
                        let (then_branch, else_branch) = match then_branch {
                            Some(then_branch) => (then_branch, Some(last)),
                            None => (last, None),
                        };
                        Ok(Some(ast::Stmt::IfElse(ast::IfElse {
                            cond,
                            then_branch,
                            else_branch,
                            if_tag,
                            else_tag,
                            end_tag: self.trim(begin, end),
                        })))
                    }
                    _ => Err(self.err_unexpected_keyword(kw, kw_span)),
                }
            }

            Keyword::For => {
                let var = self.expect_ident()?;
                self.expect_keyword(Keyword::In)?;
                let iterable = self.parse_var()?;
                let end = self.expect(Token::EndStmt)?;
                blocks.push(State::For {
                    var,
                    iterable,
                    for_tag: self.trim(begin, end),
                    span: begin.combine(end),
                });
                scopes.push(ast::Scope::new());
                Ok(None)
            }

            Keyword::EndFor => {
                let end = self.expect(Token::EndStmt)?;
                match blocks.pop() {
                    Some(State::For {
                        var,
                        iterable,
                        for_tag,
                        ..
                    }) => Ok(Some(ast::Stmt::ForLoop(ast::ForLoop {
                        var,
                        iterable,
                        body: scopes.pop().unwrap(),
                        for_tag,
                        end_tag: self.trim(begin, end),
                    }))),
                    _ => Err(self.err_unexpected_keyword(kw, kw_span)),
                }
            }

            Keyword::Block => {
                let name = self.expect_ident()?;
                let end = self.expect(Token::EndStmt)?;
                blocks.push(State::Block {
                    name,
                    begin_tag: self.trim(begin, end),
                    span: begin.combine(end),
                });
                scopes.push(ast::Scope::new());
                Ok(None)
            }

            Keyword::EndBlock => {
                let end = self.expect(Token::EndStmt)?;
                match blocks.pop() {
                    Some(State::Block {
                        name, begin_tag, ..
                    }) => Ok(Some(ast::Stmt::Block(ast::Block {
                        name,
                        body: scopes.pop().unwrap(),
                        begin_tag,
                        end_tag: self.trim(begin, end),
                    }))),
                    _ => Err(self.err_unexpected_keyword(kw, kw_span)),
                }
            }

            Keyword::Extends => {
                let name = self.expect_string()?;
                self.expect(Token::EndStmt)?;
                Ok(Some(ast::Stmt::Extends(ast::Extends { name })))
            }

            Keyword::In | Keyword::Not => Err(self.err_unexpected_keyword(kw, kw_span)),
        }
    }

    /// Parses an expression, which is either a negated operand or an
    /// operand optionally followed by a single comparison.
    fn parse_expr(&mut self) -> Result<ast::Expr> {
        self.expr_depth = 0;
        if let Some(span) = self.eat_keyword(Keyword::Not)? {
            let expr = self.parse_operand()?;
            return Ok(ast::Expr::Not(ast::Not {
                span: span.combine(expr.span()),
                expr: Box::new(expr),
            }));
        }

        let lhs = self.parse_operand()?;
        let op = match self.peek()? {
            Some((Token::Gt, _)) => ast::BinOp::Gt,
            Some((Token::Lt, _)) => ast::BinOp::Lt,
            Some((Token::Ge, _)) => ast::BinOp::Ge,
            Some((Token::Le, _)) => ast::BinOp::Le,
            Some((Token::EqEq, _)) => ast::BinOp::Eq,
            Some((Token::Ne, _)) => ast::BinOp::Ne,
            _ => return Ok(lhs),
        };
        self.next()?;
        let rhs = self.parse_operand()?;
        self.binary(op, lhs, rhs)
    }

    /// Parses an additive expression with any number of trailing filters.
    ///
    /// Filters bind tighter than comparison so that an expression like
    /// `text | wordcount > 4` applies the filter first.
    fn parse_operand(&mut self) -> Result<ast::Expr> {
        let mut expr = self.parse_additive()?;
        while self.eat(Token::Pipe)?.is_some() {
            let name = self.expect_ident()?;
            self.bump_expr_depth(name.span)?;
            let (arg, end) = match self.eat(Token::LParen)? {
                Some(_) => {
                    let arg = self.parse_factor()?;
                    let rparen = self.expect(Token::RParen)?;
                    (Some(Box::new(arg)), rparen)
                }
                None => (None, name.span),
            };
            expr = ast::Expr::Filter(ast::Filter {
                name,
                arg,
                span: expr.span().combine(end),
                receiver: Box::new(expr),
            });
        }
        Ok(expr)
    }

    fn parse_additive(&mut self) -> Result<ast::Expr> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek()? {
                Some((Token::Plus, _)) => ast::BinOp::Add,
                Some((Token::Minus, _)) => ast::BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.next()?;
            let rhs = self.parse_term()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
    }

    fn parse_term(&mut self) -> Result<ast::Expr> {
        let mut lhs = self.parse_factor()?;
        loop {
            let op = match self.peek()? {
                Some((Token::Star, _)) => ast::BinOp::Mul,
                Some((Token::Slash, _)) => ast::BinOp::Div,
                Some((Token::Percent, _)) => ast::BinOp::Rem,
                _ => return Ok(lhs),
            };
            self.next()?;
            let rhs = self.parse_factor()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
    }

    fn parse_factor(&mut self) -> Result<ast::Expr> {
        match self.peek()? {
            Some((Token::Number, span)) => {
                self.next()?;
                let value = self.source()[span].parse::<i64>().map_err(|_| {
                    Error::parse("integer literal out of range", self.source(), span)
                })?;
                Ok(ast::Expr::Literal(ast::Literal {
                    value: Value::Integer(value),
                    span,
                }))
            }
            Some((Token::String, span)) => {
                self.next()?;
                Ok(ast::Expr::Literal(ast::Literal {
                    value: Value::String(self.unquote(span)),
                    span,
                }))
            }
            Some((Token::Ident, _)) => Ok(ast::Expr::Var(self.parse_var()?)),
            Some((tk, span)) => Err(self.err_unexpected_token(tk, span)),
            None => Err(self.err_eof("expression")),
        }
    }

    /// Parses a dotted variable path like `user.name`.
    fn parse_var(&mut self) -> Result<ast::Var> {
        let mut path = vec![self.expect_ident()?];
        while self.eat(Token::Dot)?.is_some() {
            path.push(self.expect_ident()?);
        }
        Ok(ast::Var { path })
    }

    /// Extracts the contents of a string literal.
    ///
    /// There is no escape sequence processing, the contents between the
    /// quotes are taken verbatim.
    fn unquote(&self, span: Span) -> String {
        let raw = &self.source()[span];
        raw[1..raw.len() - 1].to_owned()
    }

    /// Computes the trim flags for a tag from its begin and end delimiter
    /// spans, which include any `-` marker.
    fn trim(&self, begin: Span, end: Span) -> ast::Trim {
        ast::Trim {
            before: self.source()[begin].ends_with('-'),
            after: self.source()[end].starts_with('-'),
        }
    }

    fn expect(&mut self, exp: Token) -> Result<Span> {
        match self.next()? {
            Some((tk, span)) if tk == exp => Ok(span),
            Some((tk, span)) => Err(Error::parse(
                format!("expected {}, found {}", exp.human(), tk.human()),
                self.source(),
                span,
            )),
            None => Err(self.err_eof(exp.human())),
        }
    }

    fn expect_ident(&mut self) -> Result<ast::Ident> {
        let span = self.expect(Token::Ident)?;
        Ok(ast::Ident { span })
    }

    fn expect_string(&mut self) -> Result<ast::Str> {
        let span = self.expect(Token::String)?;
        Ok(ast::Str {
            name: self.unquote(span),
            span,
        })
    }

    fn expect_any_keyword(&mut self) -> Result<(Keyword, Span)> {
        match self.next()? {
            Some((Token::Keyword, span)) => {
                let kw = Keyword::from_str(&self.source()[span])
                    .expect("a keyword token is always a keyword");
                Ok((kw, span))
            }
            Some((tk, span)) => Err(Error::parse(
                format!("expected keyword, found {}", tk.human()),
                self.source(),
                span,
            )),
            None => Err(self.err_eof("keyword")),
        }
    }

    fn expect_keyword(&mut self, exp: Keyword) -> Result<Span> {
        let (kw, span) = self.expect_any_keyword()?;
        if kw != exp {
            return Err(Error::parse(
                format!("expected keyword `{}`", exp.as_str()),
                self.source(),
                span,
            ));
        }
        Ok(span)
    }

    /// Consumes the next token if it matches.
    fn eat(&mut self, exp: Token) -> Result<Option<Span>> {
        match self.peek()? {
            Some((tk, span)) if tk == exp => {
                self.next()?;
                Ok(Some(span))
            }
            _ => Ok(None),
        }
    }

    /// Consumes the next token if it is the given keyword.
    fn eat_keyword(&mut self, exp: Keyword) -> Result<Option<Span>> {
        match self.peek()? {
            Some((Token::Keyword, span)) if &self.source()[span] == exp.as_str() => {
                self.next()?;
                Ok(Some(span))
            }
            _ => Ok(None),
        }
    }

    fn next(&mut self) -> Result<Option<(Token, Span)>> {
        match self.peeked.take() {
            Some(peeked) => Ok(peeked),
            None => self.tokens.next(),
        }
    }

    fn peek(&mut self) -> Result<Option<(Token, Span)>> {
        if self.peeked.is_none() {
            self.peeked = Some(self.tokens.next()?);
        }
        Ok(self.peeked.unwrap())
    }

    fn err_unexpected_token(&self, tk: Token, span: Span) -> Error {
        Error::parse(
            format!("unexpected {}", tk.human()),
            self.source(),
            span,
        )
    }

    fn err_unexpected_keyword(&self, kw: Keyword, span: Span) -> Error {
        Error::parse(
            format!("unexpected `{}` statement", kw.as_str()),
            self.source(),
            span,
        )
    }

    fn binary(&mut self, op: ast::BinOp, lhs: ast::Expr, rhs: ast::Expr) -> Result<ast::Expr> {
        self.bump_expr_depth(rhs.span())?;
        Ok(ast::Expr::Binary(ast::Binary {
            op,
            span: lhs.span().combine(rhs.span()),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }))
    }

    fn bump_expr_depth(&mut self, span: Span) -> Result<()> {
        self.expr_depth += 1;
        if self.expr_depth > MAX_EXPR_DEPTH {
            return Err(Error::parse(
                format!("expression exceeds the maximum depth of {MAX_EXPR_DEPTH}"),
                self.source(),
                span,
            ));
        }
        Ok(())
    }

    fn err_eof(&self, exp: &str) -> Error {
        let n = self.source().len();
        Error::parse(
            format!("expected {exp}, found end of template"),
            self.source(),
            n..n,
        )
    }
}

impl Keyword {
    pub fn from_str(s: &str) -> Option<Self> {
        let kw = match s {
            "if" => Self::If,
            "else" => Self::Else,
            "endif" => Self::EndIf,
            "for" => Self::For,
            "in" => Self::In,
            "endfor" => Self::EndFor,
            "block" => Self::Block,
            "endblock" => Self::EndBlock,
            "extends" => Self::Extends,
            "not" => Self::Not,
            _ => return None,
        };
        Some(kw)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Else => "else",
            Self::EndIf => "endif",
            Self::For => "for",
            Self::In => "in",
            Self::EndFor => "endfor",
            Self::Block => "block",
            Self::EndBlock => "endblock",
            Self::Extends => "extends",
            Self::Not => "not",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_raw() {
        let scope = parse("lorem ipsum").unwrap();
        assert_eq!(scope.stmts.len(), 1);
        assert!(matches!(scope.stmts[0], ast::Stmt::Raw(_)));
    }

    #[test]
    fn parse_print() {
        let scope = parse("{{ user.name }}").unwrap();
        match &scope.stmts[0] {
            ast::Stmt::Print(print) => {
                assert!(matches!(&print.expr, ast::Expr::Var(v) if v.path.len() == 2));
            }
            stmt => panic!("unexpected statement {stmt:?}"),
        }
    }

    #[test]
    fn parse_print_trim() {
        let scope = parse("a {{- name -}} b").unwrap();
        match &scope.stmts[1] {
            ast::Stmt::Print(print) => {
                assert!(print.tag.before);
                assert!(print.tag.after);
            }
            stmt => panic!("unexpected statement {stmt:?}"),
        }
    }

    #[test]
    fn parse_precedence() {
        // `1 + 10 / 2` must parse as `1 + (10 / 2)`
        let scope = parse("{{ 1 + 10 / 2 }}").unwrap();
        match &scope.stmts[0] {
            ast::Stmt::Print(print) => match &print.expr {
                ast::Expr::Binary(outer) => {
                    assert_eq!(outer.op, ast::BinOp::Add);
                    assert!(matches!(&*outer.lhs, ast::Expr::Literal(_)));
                    match &*outer.rhs {
                        ast::Expr::Binary(inner) => assert_eq!(inner.op, ast::BinOp::Div),
                        expr => panic!("unexpected expression {expr:?}"),
                    }
                }
                expr => panic!("unexpected expression {expr:?}"),
            },
            stmt => panic!("unexpected statement {stmt:?}"),
        }
    }

    #[test]
    fn parse_filter_before_comparison() {
        // `text | wordcount > 4` must parse as `(text | wordcount) > 4`
        let scope = parse("{{ text | wordcount > 4 }}").unwrap();
        match &scope.stmts[0] {
            ast::Stmt::Print(print) => match &print.expr {
                ast::Expr::Binary(outer) => {
                    assert_eq!(outer.op, ast::BinOp::Gt);
                    assert!(matches!(&*outer.lhs, ast::Expr::Filter(_)));
                }
                expr => panic!("unexpected expression {expr:?}"),
            },
            stmt => panic!("unexpected statement {stmt:?}"),
        }
    }

    #[test]
    fn parse_if_else() {
        let scope = parse("{% if cond %}a{% else %}b{% endif %}").unwrap();
        match &scope.stmts[0] {
            ast::Stmt::IfElse(if_else) => {
                assert_eq!(if_else.then_branch.stmts.len(), 1);
                assert_eq!(if_else.else_branch.as_ref().unwrap().stmts.len(), 1);
            }
            stmt => panic!("unexpected statement {stmt:?}"),
        }
    }

    #[test]
    fn parse_for_loop() {
        let scope = parse("{% for item in basket.items %}{{ item }}{% endfor %}").unwrap();
        match &scope.stmts[0] {
            ast::Stmt::ForLoop(for_loop) => {
                assert_eq!(for_loop.iterable.path.len(), 2);
                assert_eq!(for_loop.body.stmts.len(), 1);
            }
            stmt => panic!("unexpected statement {stmt:?}"),
        }
    }

    #[test]
    fn parse_block() {
        let scope = parse("{% block content %}fallback{% endblock %}").unwrap();
        match &scope.stmts[0] {
            ast::Stmt::Block(block) => {
                assert_eq!(block.body.stmts.len(), 1);
            }
            stmt => panic!("unexpected statement {stmt:?}"),
        }
    }

    #[test]
    fn parse_extends() {
        let scope = parse(r#"{% extends "base.html" %}body"#).unwrap();
        match &scope.stmts[0] {
            ast::Stmt::Extends(extends) => {
                assert_eq!(extends.name.name, "base.html");
            }
            stmt => panic!("unexpected statement {stmt:?}"),
        }
    }

    #[test]
    fn parse_comment_is_dropped() {
        let scope = parse("a{# hidden #}b").unwrap();
        assert_eq!(scope.stmts.len(), 2);
        assert!(matches!(scope.stmts[0], ast::Stmt::Raw(_)));
        assert!(matches!(scope.stmts[1], ast::Stmt::Raw(_)));
    }

    #[test]
    fn parse_unclosed_if() {
        let err = parse("{% if cond %}a").unwrap_err();
        assert!(err.to_string().contains("unclosed `if` statement"));
    }

    #[test]
    fn parse_mismatched_end() {
        let err = parse("{% if cond %}a{% endfor %}").unwrap_err();
        assert!(err.to_string().contains("unexpected `endfor` statement"));
    }

    #[test]
    fn parse_dangling_else() {
        let err = parse("{% else %}").unwrap_err();
        assert!(err.to_string().contains("unexpected `else` statement"));
    }

    #[test]
    fn parse_expr_depth_capped() {
        let source = format!("{{{{ {} }}}}", vec!["1"; 200].join(" + "));
        let err = parse(&source).unwrap_err();
        assert!(err
            .to_string()
            .contains("expression exceeds the maximum depth of 128"));
    }

    #[test]
    fn parse_expr_depth_within_limit() {
        let source = format!("{{{{ {} }}}}", vec!["1"; 100].join(" + "));
        parse(&source).unwrap();
    }

    #[test]
    fn parse_expr_depth_resets_between_expressions() {
        let chain = vec!["1"; 100].join(" + ");
        let source = format!("{{{{ {chain} }}}}{{{{ {chain} }}}}");
        parse(&source).unwrap();
    }

    #[test]
    fn parse_number_out_of_range() {
        let err = parse("{{ 99999999999999999999 }}").unwrap_err();
        assert!(err.to_string().contains("integer literal out of range"));
    }

    fn parse(source: &str) -> Result<ast::Scope> {
        Parser::new(source).parse_template()
    }
}
