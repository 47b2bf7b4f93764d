use crate::types::ast;
use crate::value::{Value, ValueCow};

/// A stack of the scopes in effect during a render.
///
/// The bottom frame is always the globals passed to the render call. A
/// frame is pushed for every loop iteration so that the loop variable and
/// the `loop` state shadow outer names.
pub(crate) struct Stack<'render> {
    stack: Vec<State<'render>>,
}

pub(crate) enum State<'render> {
    /// An entire scope of values.
    Scope(&'render Value),

    /// A loop iteration.
    Loop(LoopState<'render>),
}

pub(crate) struct LoopState<'render> {
    /// The name of the loop variable.
    pub var: &'render str,
    /// The current item.
    pub item: &'render Value,
    /// The zero-based iteration index.
    pub index: usize,
    /// The total number of items.
    pub len: usize,
}

impl<'render> Stack<'render> {
    pub fn new(globals: &'render Value) -> Self {
        Self {
            stack: vec![State::Scope(globals)],
        }
    }

    /// Resolves a variable path against the stack.
    ///
    /// Frames are searched innermost first. A frame that does not define the
    /// first path segment is skipped, but once the first segment matches the
    /// rest of the path must resolve within that frame, otherwise the whole
    /// lookup fails with `None`.
    pub fn lookup(&self, source: &str, var: &ast::Var) -> Option<ValueCow<'render>> {
        let first = &source[var.path[0].span];
        for state in self.stack.iter().rev() {
            match state {
                State::Scope(scope) => {
                    if let Value::Map(map) = scope {
                        if let Some(value) = map.get(first) {
                            return walk(source, value, &var.path[1..]);
                        }
                    }
                }
                State::Loop(loop_state) => {
                    if first == loop_state.var {
                        return walk(source, loop_state.item, &var.path[1..]);
                    }
                    if first == "loop" {
                        return loop_state.member(source, var);
                    }
                }
            }
        }
        None
    }

    pub fn push(&mut self, state: State<'render>) {
        self.stack.push(state);
    }

    pub fn pop_loop(&mut self) -> LoopState<'render> {
        match self.stack.pop() {
            Some(State::Loop(loop_state)) => loop_state,
            _ => panic!("expected loop state"),
        }
    }
}

impl LoopState<'_> {
    /// Resolves a `loop.*` member.
    fn member<'render>(&self, source: &str, var: &ast::Var) -> Option<ValueCow<'render>> {
        if var.path.len() != 2 {
            return None;
        }
        let value = match &source[var.path[1].span] {
            "index" => Value::Integer(self.index as i64),
            "first" => Value::Integer((self.index == 0) as i64),
            "last" => Value::Integer((self.index + 1 == self.len) as i64),
            _ => return None,
        };
        Some(ValueCow::Owned(value))
    }
}

/// Follows the rest of a path into a value, descending maps only.
fn walk<'render>(
    source: &str,
    mut value: &'render Value,
    rest: &[ast::Ident],
) -> Option<ValueCow<'render>> {
    for ident in rest {
        match value {
            Value::Map(map) => {
                value = map.get(&source[ident.span])?;
            }
            _ => return None,
        }
    }
    Some(ValueCow::Borrowed(value))
}
