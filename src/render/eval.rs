use crate::render::stack::Stack;
use crate::types::ast;
use crate::value::{Value, ValueCow};
use crate::{Engine, Error, Result};

/// Evaluates an expression against the stack.
///
/// An unresolved variable evaluates to [`Value::None`] rather than failing,
/// so that templates can test for the presence of optional values.
pub(crate) fn eval<'render>(
    engine: &Engine,
    source: &str,
    stack: &Stack<'render>,
    expr: &ast::Expr,
) -> Result<ValueCow<'render>> {
    match expr {
        ast::Expr::Var(var) => Ok(stack
            .lookup(source, var)
            .unwrap_or(ValueCow::Owned(Value::None))),

        ast::Expr::Literal(literal) => Ok(ValueCow::Owned(literal.value.clone())),

        ast::Expr::Not(not) => {
            let value = eval(engine, source, stack, &not.expr)?;
            Ok(ValueCow::Owned(Value::Integer(!value.is_truthy() as i64)))
        }

        ast::Expr::Binary(binary) => {
            let lhs = eval(engine, source, stack, &binary.lhs)?;
            let rhs = eval(engine, source, stack, &binary.rhs)?;
            let value = eval_binary(source, binary, &lhs, &rhs)?;
            Ok(ValueCow::Owned(value))
        }

        ast::Expr::Filter(filter) => {
            let receiver = eval(engine, source, stack, &filter.receiver)?;
            let arg = match &filter.arg {
                Some(arg) => Some(eval(engine, source, stack, arg)?),
                None => None,
            };
            let name = &source[filter.name.span];
            let f = engine.filters.get(name).ok_or_else(|| {
                Error::render(
                    format!("unknown filter `{name}`"),
                    source,
                    filter.name.span,
                )
            })?;
            let value = f(&receiver, arg.as_deref())
                .map_err(|msg| Error::render(msg, source, filter.name.span))?;
            Ok(ValueCow::Owned(value))
        }
    }
}

/// Applies a binary operator.
///
/// When both sides are strings then `+` concatenates and `==` and `!=`
/// compare bytes. In every other case both sides are coerced to integers
/// first. Comparisons produce the integers 1 and 0.
fn eval_binary(
    source: &str,
    binary: &ast::Binary,
    lhs: &Value,
    rhs: &Value,
) -> Result<Value> {
    use ast::BinOp::*;

    if let (Value::String(l), Value::String(r)) = (lhs, rhs) {
        return match binary.op {
            Add => Ok(Value::String(format!("{l}{r}"))),
            Eq => Ok(Value::Integer((l == r) as i64)),
            Ne => Ok(Value::Integer((l != r) as i64)),
            op => Err(Error::render(
                format!("operator `{}` is not supported between strings", op.human()),
                source,
                binary.span,
            )),
        };
    }

    let l = coerce(source, binary, lhs)?;
    let r = coerce(source, binary, rhs)?;

    let value = match binary.op {
        Add => Value::Integer(l.wrapping_add(r)),
        Sub => Value::Integer(l.wrapping_sub(r)),
        Mul => Value::Integer(l.wrapping_mul(r)),
        Div | Rem if r == 0 => {
            return Err(Error::render("division by zero", source, binary.span));
        }
        Div => Value::Integer(l.wrapping_div(r)),
        Rem => Value::Integer(l.wrapping_rem(r)),
        Gt => Value::Integer((l > r) as i64),
        Lt => Value::Integer((l < r) as i64),
        Ge => Value::Integer((l >= r) as i64),
        Le => Value::Integer((l <= r) as i64),
        Eq => Value::Integer((l == r) as i64),
        Ne => Value::Integer((l != r) as i64),
    };
    Ok(value)
}

fn coerce(source: &str, binary: &ast::Binary, value: &Value) -> Result<i64> {
    value
        .as_integer()
        .map_err(|msg| Error::render(msg, source, binary.span))
}
