use std::cmp::max;
use std::fmt;

use unicode_width::UnicodeWidthStr;

use crate::types::span::Span;

/// A type alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur during template compilation or rendering.
#[derive(Clone)]
pub struct Error {
    kind: ErrorKind,
    msg: String,
    /// The name of the template the error occurred in, when known.
    name: Option<String>,
    /// The source text and span needed for pretty formatting.
    span: Option<(String, Span)>,
}

/// What stage of template processing an [`Error`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The template source failed to parse.
    Parse,
    /// Rendering hit a fatal condition, e.g. a non-list `for` iterable or
    /// a missing parent template.
    Render,
}

impl Error {
    pub(crate) fn parse(msg: impl Into<String>, source: &str, span: impl Into<Span>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            msg: msg.into(),
            name: None,
            span: Some((source.to_string(), span.into())),
        }
    }

    pub(crate) fn render(msg: impl Into<String>, source: &str, span: impl Into<Span>) -> Self {
        Self {
            kind: ErrorKind::Render,
            msg: msg.into(),
            name: None,
            span: Some((source.to_string(), span.into())),
        }
    }

    /// A render error with no particular location in the source, e.g. an
    /// unknown template name.
    pub(crate) fn render_plain(msg: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Render,
            msg: msg.into(),
            name: None,
            span: None,
        }
    }

    pub(crate) fn max_depth(limit: usize) -> Self {
        Self::render_plain(format!("maximum recursion depth of {limit} exceeded"))
    }

    /// Attaches a template name if the error does not already carry one.
    ///
    /// An error that crossed an `extends` boundary is already named after
    /// the template it was raised in, which must not be overwritten by the
    /// leaf template's name.
    pub(crate) fn with_template_name(mut self, name: &str) -> Self {
        if self.name.is_none() {
            self.name = Some(name.to_owned());
        }
        self
    }

    /// Returns which stage this error came from.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl serde::ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Self {
            kind: ErrorKind::Render,
            msg: msg.to_string(),
            name: None,
            span: None,
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some((source, span)) => fmt_pretty(self, source, *span, f),
            None => write!(f, "{}", self.msg),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some((source, span)) => {
                if f.alternate() {
                    fmt_pretty(self, source, *span, f)
                } else {
                    match &self.name {
                        Some(name) => write!(
                            f,
                            "{} between bytes {} and {} in template `{name}`",
                            self.msg, span.m, span.n
                        ),
                        None => {
                            write!(f, "{} between bytes {} and {}", self.msg, span.m, span.n)
                        }
                    }
                }
            }
            None => write!(f, "{}", self.msg),
        }
    }
}

fn fmt_pretty(err: &Error, source: &str, span: Span, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let lines: Vec<_> = source.split_terminator('\n').collect();
    let (line, col) = to_line_col(&lines, span.m);
    let width = max(1, source[span].width());
    let code = lines
        .get(line)
        .or_else(|| lines.last())
        .copied()
        .unwrap_or("");

    let num = (line + 1).to_string();
    let pad = num.width();
    let pipe = "|";
    let underline = "^".repeat(width);

    if let Some(name) = &err.name {
        writeln!(f, "\n --> template `{name}`")?;
    }
    write!(
        f,
        "\n \
        {0:pad$} {pipe}\n \
        {num:>} {pipe} {code}\n \
        {0:pad$} {pipe} {underline:>width$} {msg}\n",
        "",
        pad = pad,
        pipe = pipe,
        num = num,
        code = code,
        underline = underline,
        width = col + width,
        msg = err.msg
    )
}

fn to_line_col(lines: &[&str], offset: usize) -> (usize, usize) {
    let mut n = 0;
    for (i, line) in lines.iter().enumerate() {
        let len = line.width() + 1;
        if n + len > offset {
            return (i, offset - n);
        }
        n += len;
    }
    (lines.len(), lines.last().map(|l| l.width()).unwrap_or(0))
}
