use crate::compile::parse::Keyword;
use crate::types::span::Span;
use crate::{Error, Result};

/// A lexer that tokenizes the template source into distinct chunks so that
/// the parser doesn't have to operate on raw text.
///
/// The lexer is implemented as a fallible iterator. The parser should
/// repeatedly call the [`.next()?`][Lexer::next] method to return the next
/// non-whitespace token until [`None`] is returned.
pub struct Lexer<'source> {
    /// The original template source.
    pub source: &'source str,

    /// A cursor over the template source.
    cursor: usize,

    /// The current state of the lexer.
    state: State,

    /// A buffer to store the next token.
    next: Option<(Token, Span)>,
}

/// The state of the lexer.
///
/// Tokenization differs between raw template text, the inside of an
/// expression or statement tag, and the inside of a comment.
#[derive(Clone, Copy)]
enum State {
    /// Within raw template.
    Template,

    /// Between expression or statement tags.
    Tag {
        /// The span of the begin tag.
        begin: Span,
        /// The end token we are expecting.
        end: Token,
    },

    /// Between comment tags.
    Comment {
        /// The span of the begin tag.
        begin: Span,
    },
}

/// The unit yielded by the lexer.
///
/// Begin and end tag spans include any trim marker `-`, so the parser can
/// recover trim flags from the span text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Raw template text
    Raw,
    /// `{{` or `{{-`
    BeginExpr,
    /// `}}` or `-}}`
    EndExpr,
    /// `{%` or `{%-`
    BeginStmt,
    /// `%}` or `-%}`
    EndStmt,
    /// `{#`
    BeginComment,
    /// `#}`
    EndComment,
    /// `.`
    Dot,
    /// `|`
    Pipe,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// `==`
    EqEq,
    /// `!=`
    Ne,
    /// A run of whitespace
    Whitespace,
    /// A keyword like `if` or `endfor`
    Keyword,
    /// A variable or filter name
    Ident,
    /// An integer literal
    Number,
    /// A double quoted string literal
    String,
}

/// The begin tags, used to detect a tag opened inside another tag.
const BEGIN_TAGS: [(&str, Token); 3] = [
    ("{{", Token::BeginExpr),
    ("{%", Token::BeginStmt),
    ("{#", Token::BeginComment),
];

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            source,
            cursor: 0,
            state: State::Template,
            next: None,
        }
    }

    /// Returns the next non-whitespace token and its span.
    pub fn next(&mut self) -> Result<Option<(Token, Span)>> {
        loop {
            match self.lex()? {
                Some((tk, sp)) if tk != Token::Whitespace => return Ok(Some((tk, sp))),
                None => return Ok(None),
                _ => continue,
            }
        }
    }

    /// Returns the next token and span.
    fn lex(&mut self) -> Result<Option<(Token, Span)>> {
        if let Some(next) = self.next.take() {
            return Ok(Some(next));
        }

        let i = self.cursor;

        if self.source[i..].is_empty() {
            return match self.state {
                State::Template => Ok(None),
                State::Tag { begin, end } => Err(self.err_unclosed(begin, end)),
                State::Comment { begin } => Err(self.err_unclosed(begin, Token::EndComment)),
            };
        }

        match self.state {
            State::Template => Ok(Some(self.lex_template(i))),
            State::Tag { begin, end } => self.lex_tag(begin, end, i).map(Some),
            State::Comment { begin } => self.lex_comment(begin, i).map(Some),
        }
    }

    fn lex_template(&mut self, i: usize) -> (Token, Span) {
        // We are within raw template, so all we have to do is find the next
        // begin tag. The following diagram describes the variable naming.
        //
        // xxxxxxx{{-xxxxxxxx
        //    ^   ^  ^
        //    i   j  k
        match find_begin_tag(self.source, i) {
            Some((tk, j, k)) => {
                let begin = Span::from(j..k);
                self.cursor = k;
                self.state = match tk {
                    Token::BeginComment => State::Comment { begin },
                    tk => State::Tag {
                        begin,
                        end: tk.pair(),
                    },
                };
                if i == j {
                    // The cursor was exactly at the tag.
                    (tk, begin)
                } else {
                    // Emit the raw text first and buffer the begin tag.
                    self.next = Some((tk, begin));
                    (Token::Raw, Span::from(i..j))
                }
            }
            None => {
                let j = self.source.len();
                self.cursor = j;
                (Token::Raw, Span::from(i..j))
            }
        }
    }

    fn lex_tag(&mut self, begin: Span, end: Token, i: usize) -> Result<(Token, Span)> {
        // We are between two tags {{ ... }} or {% ... %}, so we must lex
        // expression tokens and look out for the corresponding end tag.

        if let Some((tk, k)) = end_tag_at(self.source, i) {
            if tk != end {
                return Err(self.err_unexpected_token(tk, i..k));
            }
            self.cursor = k;
            self.state = State::Template;
            return Ok((tk, Span::from(i..k)));
        }
        if BEGIN_TAGS.iter().any(|(tag, _)| self.rest(i).starts_with(tag)) {
            return Err(self.err_unclosed(begin, end));
        }

        // We iterate over chars because that is nicer than operating on raw
        // bytes. The map call fixes the indexes to be relative to the actual
        // template source.
        let mut iter = self.source[i..].char_indices().map(|(d, c)| (i + d, c));

        // We can unwrap because we know there is more text remaining.
        let (i, c) = iter.next().unwrap();

        let (tk, j) = match c {
            // Single character to token mappings.
            '.' => (Token::Dot, i + 1),
            '|' => (Token::Pipe, i + 1),
            '(' => (Token::LParen, i + 1),
            ')' => (Token::RParen, i + 1),
            '+' => (Token::Plus, i + 1),
            '-' => (Token::Minus, i + 1),
            '*' => (Token::Star, i + 1),
            '/' => (Token::Slash, i + 1),
            '%' => (Token::Percent, i + 1),

            // Comparison operators, one or two characters.
            '>' => self.lex_cmp(iter, i, Token::Gt, Token::Ge),
            '<' => self.lex_cmp(iter, i, Token::Lt, Token::Le),
            '=' => self.lex_exact(iter, i, '=', Token::EqEq)?,
            '!' => self.lex_exact(iter, i, '=', Token::Ne)?,

            '"' => self.lex_string(iter, i)?,
            c if c.is_ascii_digit() => self.lex_number(iter),
            c if is_whitespace(c) => self.lex_whitespace(iter),
            c if is_ident_start(c) => self.lex_ident_or_keyword(iter, i),

            // Any other character...
            _ => {
                return Err(self.err_unexpected_character(i..(i + c.len_utf8())));
            }
        };

        self.cursor = j;
        Ok((tk, Span::from(i..j)))
    }

    fn lex_comment(&mut self, begin: Span, i: usize) -> Result<(Token, Span)> {
        // We are between two comment tags {# ... #}, so all we have to do is
        // find the end tag.
        match self.source[i..].find("#}") {
            Some(d) => {
                let j = i + d;
                let k = j + 2;
                self.cursor = k;
                self.state = State::Template;
                let end = (Token::EndComment, Span::from(j..k));
                if i == j {
                    Ok(end)
                } else {
                    self.next = Some(end);
                    Ok((Token::Raw, Span::from(i..j)))
                }
            }
            None => Err(self.err_unclosed(begin, Token::EndComment)),
        }
    }

    fn lex_cmp<I>(&mut self, mut iter: I, i: usize, single: Token, with_eq: Token) -> (Token, usize)
    where
        I: Iterator<Item = (usize, char)>,
    {
        match iter.next() {
            Some((j, '=')) => (with_eq, j + 1),
            _ => (single, i + 1),
        }
    }

    fn lex_exact<I>(&mut self, mut iter: I, i: usize, want: char, tk: Token) -> Result<(Token, usize)>
    where
        I: Iterator<Item = (usize, char)>,
    {
        match iter.next() {
            Some((j, c)) if c == want => Ok((tk, j + 1)),
            Some((j, _)) => Err(self.err_unexpected_character(i..j)),
            None => Err(self.err_unexpected_character(i..self.source.len())),
        }
    }

    /// Lexes a string literal. There is no escape processing; the string
    /// runs to the next double quote.
    fn lex_string<I>(&mut self, mut iter: I, i: usize) -> Result<(Token, usize)>
    where
        I: Iterator<Item = (usize, char)>,
    {
        loop {
            match iter.next() {
                None => {
                    return Err(self.err_undelimited_string(i..self.source.len()));
                }
                Some((j, '\r' | '\n')) => {
                    return Err(self.err_undelimited_string(i..j));
                }
                Some((j, '"')) => {
                    return Ok((Token::String, j + 1));
                }
                Some(_) => {}
            }
        }
    }

    fn lex_number<I>(&mut self, iter: I) -> (Token, usize)
    where
        I: Iterator<Item = (usize, char)> + Clone,
    {
        (Token::Number, self.lex_while(iter, |c| c.is_ascii_digit()))
    }

    fn lex_whitespace<I>(&mut self, iter: I) -> (Token, usize)
    where
        I: Iterator<Item = (usize, char)> + Clone,
    {
        (Token::Whitespace, self.lex_while(iter, is_whitespace))
    }

    fn lex_ident_or_keyword<I>(&mut self, iter: I, i: usize) -> (Token, usize)
    where
        I: Iterator<Item = (usize, char)> + Clone,
    {
        let j = self.lex_while(iter, is_ident);
        let tk = match Keyword::from_str(&self.source[i..j]) {
            Some(_) => Token::Keyword,
            None => Token::Ident,
        };
        (tk, j)
    }

    fn lex_while<I, P>(&mut self, mut iter: I, pred: P) -> usize
    where
        I: Iterator<Item = (usize, char)> + Clone,
        P: Fn(char) -> bool,
    {
        loop {
            match iter.clone().next() {
                Some((_, c)) if pred(c) => {
                    iter.next().unwrap();
                }
                Some((j, _)) => return j,
                None => return self.source.len(),
            }
        }
    }

    fn rest(&self, i: usize) -> &str {
        &self.source[i..]
    }

    fn err_unclosed(&self, begin: Span, end: Token) -> Error {
        let end = end.human();
        Error::parse(format!("unclosed tag, expected {end}"), self.source, begin)
    }

    fn err_unexpected_token(&self, tk: Token, span: impl Into<Span>) -> Error {
        let tk = tk.human();
        Error::parse(format!("unexpected {tk}"), self.source, span)
    }

    fn err_unexpected_character(&self, span: impl Into<Span>) -> Error {
        Error::parse("unexpected character", self.source, span)
    }

    fn err_undelimited_string(&self, span: impl Into<Span>) -> Error {
        Error::parse("undelimited string", self.source, span)
    }
}

/// Finds the earliest begin tag at or after `i`, returning the token and the
/// span `j..k` of the tag including a trim marker.
///
/// This is a single left-to-right scan so that lexing stays linear in the
/// length of the source no matter how many tags it contains.
fn find_begin_tag(source: &str, i: usize) -> Option<(Token, usize, usize)> {
    let bytes = source.as_bytes();
    let mut j = i;
    while let Some(d) = source[j..].find('{') {
        j += d;
        let tk = match bytes.get(j + 1) {
            Some(b'{') => Token::BeginExpr,
            Some(b'%') => Token::BeginStmt,
            Some(b'#') => Token::BeginComment,
            _ => {
                j += 1;
                continue;
            }
        };
        let mut k = j + 2;
        if tk != Token::BeginComment && source[k..].starts_with('-') {
            k += 1;
        }
        return Some((tk, j, k));
    }
    None
}

/// Returns the end tag starting exactly at `i`, if any, including a leading
/// trim marker.
fn end_tag_at(source: &str, i: usize) -> Option<(Token, usize)> {
    for (tag, tk) in [
        ("-}}", Token::EndExpr),
        ("}}", Token::EndExpr),
        ("-%}", Token::EndStmt),
        ("%}", Token::EndStmt),
    ] {
        if source[i..].starts_with(tag) {
            return Some((tk, i + tag.len()));
        }
    }
    None
}

impl Token {
    pub fn human(&self) -> &'static str {
        match self {
            Self::Raw => "raw template",
            Self::BeginExpr => "begin expression",
            Self::EndExpr => "end expression",
            Self::BeginStmt => "begin statement",
            Self::EndStmt => "end statement",
            Self::BeginComment => "begin comment",
            Self::EndComment => "end comment",
            Self::Dot => "member access operator",
            Self::Pipe => "pipe",
            Self::LParen => "open parenthesis",
            Self::RParen => "close parenthesis",
            Self::Plus => "plus",
            Self::Minus => "minus",
            Self::Star => "star",
            Self::Slash => "slash",
            Self::Percent => "percent",
            Self::Gt => "greater than operator",
            Self::Lt => "less than operator",
            Self::Ge => "greater than or equal operator",
            Self::Le => "less than or equal operator",
            Self::EqEq => "equality operator",
            Self::Ne => "inequality operator",
            Self::Whitespace => "whitespace",
            Self::Keyword => "keyword",
            Self::Ident => "identifier",
            Self::Number => "number",
            Self::String => "string",
        }
    }

    /// Returns the corresponding end tag for a begin tag.
    fn pair(&self) -> Self {
        match self {
            Self::BeginExpr => Self::EndExpr,
            Self::BeginStmt => Self::EndStmt,
            Self::BeginComment => Self::EndComment,
            _ => panic!("not a begin tag"),
        }
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_ident_start(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_start(c)
}

fn is_ident(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_empty() {
        let tokens = lex("").unwrap();
        assert_eq!(tokens, []);
    }

    #[test]
    fn lex_raw() {
        let tokens = lex("lorem ipsum").unwrap();
        assert_eq!(tokens, [(Token::Raw, "lorem ipsum")]);
    }

    #[test]
    fn lex_lone_braces_are_raw() {
        let tokens = lex("a { b } c {x").unwrap();
        assert_eq!(tokens, [(Token::Raw, "a { b } c {x")]);
    }

    #[test]
    fn lex_brace_adjacent_to_tag() {
        let tokens = lex("{ x {{ y }}").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::Raw, "{ x "),
                (Token::BeginExpr, "{{"),
                (Token::Ident, "y"),
                (Token::EndExpr, "}}"),
            ]
        );
    }

    #[test]
    fn lex_many_statements() {
        let source = "a{% if x %}b{% endif %}".repeat(50);
        let tokens = lex(&source).unwrap();
        assert_eq!(tokens.len(), 50 * 9);
        assert_eq!(
            &tokens[..9],
            [
                (Token::Raw, "a"),
                (Token::BeginStmt, "{%"),
                (Token::Keyword, "if"),
                (Token::Ident, "x"),
                (Token::EndStmt, "%}"),
                (Token::Raw, "b"),
                (Token::BeginStmt, "{%"),
                (Token::Keyword, "endif"),
                (Token::EndStmt, "%}"),
            ]
        );
    }

    #[test]
    fn lex_begin_expr() {
        let tokens = lex("lorem ipsum {{ x }}").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::Raw, "lorem ipsum "),
                (Token::BeginExpr, "{{"),
                (Token::Ident, "x"),
                (Token::EndExpr, "}}"),
            ]
        );
    }

    #[test]
    fn lex_begin_expr_trim() {
        let tokens = lex("lorem ipsum {{- x }}").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::Raw, "lorem ipsum "),
                (Token::BeginExpr, "{{-"),
                (Token::Ident, "x"),
                (Token::EndExpr, "}}"),
            ]
        );
    }

    #[test]
    fn lex_expr_trim_both() {
        let tokens = lex("a {{- name -}} b").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::Raw, "a "),
                (Token::BeginExpr, "{{-"),
                (Token::Ident, "name"),
                (Token::EndExpr, "-}}"),
                (Token::Raw, " b"),
            ]
        );
    }

    #[test]
    fn lex_expr_operators() {
        let tokens = lex("{{ 1 + 10 / 2 >= -3 }}").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::BeginExpr, "{{"),
                (Token::Number, "1"),
                (Token::Plus, "+"),
                (Token::Number, "10"),
                (Token::Slash, "/"),
                (Token::Number, "2"),
                (Token::Ge, ">="),
                (Token::Minus, "-"),
                (Token::Number, "3"),
                (Token::EndExpr, "}}"),
            ]
        );
    }

    #[test]
    fn lex_expr_modulo_is_not_end_tag() {
        let tokens = lex("{{ 5 % 2 }}").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::BeginExpr, "{{"),
                (Token::Number, "5"),
                (Token::Percent, "%"),
                (Token::Number, "2"),
                (Token::EndExpr, "}}"),
            ]
        );
    }

    #[test]
    fn lex_expr_filter() {
        let tokens = lex(r#"{{ name | prefix("Mr. ") }}"#).unwrap();
        assert_eq!(
            tokens,
            [
                (Token::BeginExpr, "{{"),
                (Token::Ident, "name"),
                (Token::Pipe, "|"),
                (Token::Ident, "prefix"),
                (Token::LParen, "("),
                (Token::String, "\"Mr. \""),
                (Token::RParen, ")"),
                (Token::EndExpr, "}}"),
            ]
        );
    }

    #[test]
    fn lex_stmt() {
        let tokens = lex("{%- for n in names -%}").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::BeginStmt, "{%-"),
                (Token::Keyword, "for"),
                (Token::Ident, "n"),
                (Token::Keyword, "in"),
                (Token::Ident, "names"),
                (Token::EndStmt, "-%}"),
            ]
        );
    }

    #[test]
    fn lex_path() {
        let tokens = lex("{{ user.name }}").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::BeginExpr, "{{"),
                (Token::Ident, "user"),
                (Token::Dot, "."),
                (Token::Ident, "name"),
                (Token::EndExpr, "}}"),
            ]
        );
    }

    #[test]
    fn lex_comment() {
        let tokens = lex("lorem {# anything goes - % { #} ipsum").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::Raw, "lorem "),
                (Token::BeginComment, "{#"),
                (Token::Raw, " anything goes - % { "),
                (Token::EndComment, "#}"),
                (Token::Raw, " ipsum"),
            ]
        );
    }

    #[test]
    fn lex_unclosed_comment() {
        let err = lex("lorem {# ipsum").unwrap_err();
        assert!(err.to_string().contains("unclosed tag"));
    }

    #[test]
    fn lex_unclosed_expr() {
        let err = lex("lorem {{ ipsum {{").unwrap_err();
        assert!(err.to_string().contains("unclosed tag"));
    }

    #[test]
    fn lex_undelimited_string() {
        let err = lex(r#"{{ "abc }}"#).unwrap_err();
        assert!(err.to_string().contains("undelimited string"));
    }

    fn lex(source: &str) -> Result<Vec<(Token, &str)>> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        while let Some((tk, sp)) = lexer.next()? {
            tokens.push((tk, &source[sp]));
        }
        Ok(tokens)
    }
}
