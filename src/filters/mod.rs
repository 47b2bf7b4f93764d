//! Filter support and the builtin filters.

use std::collections::BTreeMap;

use crate::value::Value;

/// The signature of a registered filter.
///
/// A filter receives the value it is applied to and at most one argument,
/// and either produces a new value or fails with a message. The message is
/// attached to the filter's span in the rendered template's error.
pub type FilterFn =
    dyn Fn(&Value, Option<&Value>) -> std::result::Result<Value, String> + Sync + Send;

/// Returns the registry of builtin filters.
pub(crate) fn defaults() -> BTreeMap<String, Box<FilterFn>> {
    let mut filters: BTreeMap<String, Box<FilterFn>> = BTreeMap::new();
    filters.insert(String::from("trim"), Box::new(trim));
    filters.insert(String::from("lower"), Box::new(lower));
    filters.insert(String::from("upper"), Box::new(upper));
    filters.insert(String::from("wordcount"), Box::new(wordcount));
    filters
}

fn trim(value: &Value, arg: Option<&Value>) -> Result<Value, String> {
    let s = expect_string("trim", value, arg)?;
    Ok(Value::String(s.trim().to_owned()))
}

fn lower(value: &Value, arg: Option<&Value>) -> Result<Value, String> {
    let s = expect_string("lower", value, arg)?;
    Ok(Value::String(s.to_lowercase()))
}

fn upper(value: &Value, arg: Option<&Value>) -> Result<Value, String> {
    let s = expect_string("upper", value, arg)?;
    Ok(Value::String(s.to_uppercase()))
}

fn wordcount(value: &Value, arg: Option<&Value>) -> Result<Value, String> {
    let s = expect_string("wordcount", value, arg)?;
    Ok(Value::Integer(s.split_whitespace().count() as i64))
}

fn expect_string<'a>(
    name: &str,
    value: &'a Value,
    arg: Option<&Value>,
) -> Result<&'a str, String> {
    if arg.is_some() {
        return Err(format!("filter `{name}` does not take an argument"));
    }
    match value {
        Value::String(s) => Ok(s),
        value => Err(format!(
            "filter `{name}` expected a string, found {}",
            value.human()
        )),
    }
}
