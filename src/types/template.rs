//! A compiled template.

use std::collections::BTreeMap;

use crate::types::ast;

/// The result of compiling a template source: the AST together with the
/// pieces needed for inheritance resolution.
///
/// Immutable once constructed. The engine owns every `Template`; the
/// renderer only ever borrows them.
#[derive(Debug)]
pub struct Template {
    /// The name the template is registered under, if any.
    ///
    /// Attached to render errors so that an error raised while rendering a
    /// parent template is reported against the parent, not the leaf.
    pub name: Option<String>,

    /// The original template source.
    pub source: String,

    /// The parsed body.
    pub scope: ast::Scope,

    /// Every `{% block name %}` in the body, keyed by name.
    pub blocks: BTreeMap<String, ast::Block>,

    /// The parent template named by a leading `{% extends %}`, if any.
    pub parent: Option<String>,
}
