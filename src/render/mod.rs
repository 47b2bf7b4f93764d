mod core;
mod eval;
mod stack;

use crate::render::core::{RenderState, Renderer};
use crate::render::stack::Stack;
use crate::types::ast;
use crate::types::template::Template;
use crate::value::Value;
use crate::{Engine, Error, Result};

/// Renders a template to a string.
///
/// When the template extends another, the chain of parents is walked to the
/// root and the root's content is rendered, with block statements resolved
/// against the template the render was started from. The walk is capped by
/// the engine's maximum depth so that a cycle of parents terminates.
pub(crate) fn template(
    engine: &Engine,
    t: &Template,
    name: Option<&str>,
    globals: &Value,
) -> Result<String> {
    template_impl(engine, t, globals).map_err(|err| match name {
        Some(name) => err.with_template_name(name),
        None => err,
    })
}

fn template_impl(engine: &Engine, t: &Template, globals: &Value) -> Result<String> {
    let mut root = t;
    for _ in 0..engine.max_depth {
        let parent = match &root.parent {
            Some(parent) => parent,
            None => {
                let renderer = Renderer::new(engine, t);
                let mut state = RenderState {
                    out: String::with_capacity(root.source.len()),
                    trim: false,
                    depth: 0,
                    stack: Stack::new(globals),
                };
                renderer.render_scope(&mut state, root, &root.scope)?;
                return Ok(state.out);
            }
        };
        root = engine.templates.get(parent).ok_or_else(|| {
            let msg = format!("parent template `{parent}` does not exist");
            let err = match extends_span(root) {
                Some(span) => Error::render(msg, &root.source, span),
                None => Error::render_plain(msg),
            };
            match &root.name {
                Some(name) => err.with_template_name(name),
                None => err,
            }
        })?;
    }
    Err(Error::max_depth(engine.max_depth))
}

fn extends_span(t: &Template) -> Option<crate::types::span::Span> {
    match t.scope.stmts.first() {
        Some(ast::Stmt::Extends(extends)) => Some(extends.name.span),
        _ => None,
    }
}
