use crate::render::eval::eval;
use crate::render::stack::{LoopState, Stack, State};
use crate::types::ast;
use crate::types::template::Template;
use crate::value::{Value, ValueCow};
use crate::{Engine, Error, Result};

/// Renders a template by walking its AST.
pub(crate) struct Renderer<'render> {
    engine: &'render Engine,

    /// The template the render was started from, which anchors block
    /// resolution so that the most derived override wins.
    leaf: &'render Template,
}

/// Mutable state threaded through the render.
pub(crate) struct RenderState<'render> {
    /// The output buffer.
    pub out: String,

    /// Whether the next raw text should be left-trimmed. Set by a tag with
    /// a trailing trim marker and consumed by the next raw text.
    pub trim: bool,

    /// The current scope nesting depth.
    pub depth: usize,

    /// The variable scopes in effect.
    pub stack: Stack<'render>,
}

impl<'render> Renderer<'render> {
    pub fn new(engine: &'render Engine, leaf: &'render Template) -> Self {
        Self { engine, leaf }
    }

    /// Renders all statements in a scope.
    ///
    /// Errors are attached to the template owning the scope, so that an
    /// error raised in a parent template names the parent.
    pub fn render_scope(
        &self,
        state: &mut RenderState<'render>,
        t: &'render Template,
        scope: &'render ast::Scope,
    ) -> Result<()> {
        if state.depth >= self.engine.max_depth {
            return Err(Error::max_depth(self.engine.max_depth));
        }
        state.depth += 1;
        let result = self.render_stmts(state, t, scope);
        state.depth -= 1;
        result.map_err(|err| match &t.name {
            Some(name) => err.with_template_name(name),
            None => err,
        })
    }

    fn render_stmts(
        &self,
        state: &mut RenderState<'render>,
        t: &'render Template,
        scope: &'render ast::Scope,
    ) -> Result<()> {
        for stmt in &scope.stmts {
            match stmt {
                ast::Stmt::Raw(span) => {
                    let mut raw = &t.source[*span];
                    if state.trim {
                        raw = raw.trim_start();
                        state.trim = false;
                    }
                    state.out.push_str(raw);
                }

                ast::Stmt::Print(print) => {
                    if print.tag.before {
                        trim_end(&mut state.out);
                    }
                    let value = eval(self.engine, &t.source, &state.stack, &print.expr)?;
                    stringify(&mut state.out, &t.source, &print.expr, &value)?;
                    if print.tag.after {
                        state.trim = true;
                    }
                }

                ast::Stmt::IfElse(if_else) => {
                    if if_else.if_tag.before {
                        trim_end(&mut state.out);
                    }
                    let cond = eval(self.engine, &t.source, &state.stack, &if_else.cond)?;
                    if cond.is_truthy() {
                        if if_else.if_tag.after {
                            state.trim = true;
                        }
                        self.render_scope(state, t, &if_else.then_branch)?;
                        let close = match if_else.else_branch {
                            Some(_) => if_else.else_tag,
                            None => if_else.end_tag,
                        };
                        if close.before {
                            trim_end(&mut state.out);
                        }
                    } else if let Some(else_branch) = &if_else.else_branch {
                        if if_else.else_tag.after {
                            state.trim = true;
                        }
                        self.render_scope(state, t, else_branch)?;
                        if if_else.end_tag.before {
                            trim_end(&mut state.out);
                        }
                    }
                    if if_else.end_tag.after {
                        state.trim = true;
                    }
                }

                ast::Stmt::ForLoop(for_loop) => {
                    if for_loop.for_tag.before {
                        trim_end(&mut state.out);
                    }
                    let list = self.resolve_iterable(state, t, for_loop)?;
                    if !list.is_empty() {
                        if for_loop.for_tag.after {
                            state.trim = true;
                        }
                        let var = &t.source[for_loop.var.span];
                        let len = list.len();
                        for (index, item) in list.iter().enumerate() {
                            state.stack.push(State::Loop(LoopState {
                                var,
                                item,
                                index,
                                len,
                            }));
                            let result = self.render_scope(state, t, &for_loop.body);
                            state.stack.pop_loop();
                            result?;
                        }
                        if for_loop.end_tag.before {
                            trim_end(&mut state.out);
                        }
                    }
                    if for_loop.end_tag.after {
                        state.trim = true;
                    }
                }

                ast::Stmt::Block(block) => {
                    if block.begin_tag.before {
                        trim_end(&mut state.out);
                    }
                    let name = &t.source[block.name.span];
                    let (owner, resolved) = self.find_block(name).unwrap_or((t, block));
                    if resolved.begin_tag.after {
                        state.trim = true;
                    }
                    self.render_scope(state, owner, &resolved.body)?;
                    if resolved.end_tag.before {
                        trim_end(&mut state.out);
                    }
                    if block.end_tag.after {
                        state.trim = true;
                    }
                }

                // Handled before rendering starts.
                ast::Stmt::Extends(_) => {}
            }
        }
        Ok(())
    }

    /// Finds the most derived definition of a block, searching from the
    /// template the render was started from up through its ancestors.
    fn find_block(&self, name: &str) -> Option<(&'render Template, &'render ast::Block)> {
        let mut t = self.leaf;
        for _ in 0..=self.engine.max_depth {
            if let Some(block) = t.blocks.get(name) {
                return Some((t, block));
            }
            t = self.engine.templates.get(t.parent.as_deref()?)?;
        }
        None
    }

    /// Resolves the iterable of a for loop to a list.
    ///
    /// Unlike an interpolation, iterating over a value that does not exist
    /// or is not a list is an error.
    fn resolve_iterable(
        &self,
        state: &RenderState<'render>,
        t: &'render Template,
        for_loop: &ast::ForLoop,
    ) -> Result<&'render [Value]> {
        let span = for_loop.iterable.span();
        match state.stack.lookup(&t.source, &for_loop.iterable) {
            Some(ValueCow::Borrowed(Value::List(list))) => Ok(list),
            Some(value) => Err(Error::render(
                format!("expected a list, found {}", value.human()),
                &t.source,
                span,
            )),
            None => Err(Error::render(
                "cannot iterate over unresolved variable",
                &t.source,
                span,
            )),
        }
    }
}

/// Appends a value to the output buffer.
fn stringify(out: &mut String, source: &str, expr: &ast::Expr, value: &Value) -> Result<()> {
    match value {
        Value::None => {}
        Value::Integer(n) => out.push_str(&n.to_string()),
        Value::String(s) => out.push_str(s),
        value => {
            return Err(Error::render(
                format!(
                    "expected renderable value, but expression evaluated to {}",
                    value.human()
                ),
                source,
                expr.span(),
            ));
        }
    }
    Ok(())
}

/// Right-trims the output buffer.
fn trim_end(out: &mut String) {
    out.truncate(out.trim_end().len());
}
