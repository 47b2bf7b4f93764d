use quill::{value, Engine, Value};

fn render(source: &str, ctx: Value) -> String {
    Engine::new()
        .compile(source)
        .unwrap()
        .render_from(&ctx)
        .unwrap()
}

#[test]
fn filters_lower() {
    let ctx = value! { { name: "John SMITH" } };
    assert_eq!(render("{{ name | lower }}", ctx), "john smith");
}

#[test]
fn filters_upper() {
    let ctx = value! { { name: "John Smith" } };
    assert_eq!(render("{{ name | upper }}", ctx), "JOHN SMITH");
}

#[test]
fn filters_trim() {
    let ctx = value! { { name: "  John \n" } };
    assert_eq!(render("[{{ name | trim }}]", ctx), "[John]");
}

#[test]
fn filters_wordcount() {
    let ctx = value! { { text: "Hello World. How are we?" } };
    assert_eq!(render("{{ text | wordcount }}", ctx), "5");
}

#[test]
fn filters_chained() {
    let ctx = value! { { name: "  John SMITH " } };
    assert_eq!(render("{{ name | trim | lower }}", ctx), "john smith");
}

#[test]
fn filters_bind_tighter_than_comparison() {
    let source = "{% if text | wordcount > 4 %}long{% else %}short{% endif %}";
    let long = value! { { text: "Hello World. How are we?" } };
    let short = value! { { text: "Hello World." } };
    assert_eq!(render(source, long), "long");
    assert_eq!(render(source, short), "short");
}

#[test]
fn filters_apply_to_whole_additive_expression() {
    let ctx = value! { { greeting: "Hello ", name: "John" } };
    assert_eq!(render("{{ greeting + name | upper }}", ctx), "HELLO JOHN");
}

#[test]
fn filters_unknown() {
    let err = Engine::new()
        .compile("{{ name | frobnicate }}")
        .unwrap()
        .render_from(&value! { { name: "x" } })
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "unknown filter `frobnicate` between bytes 10 and 20"
    );
}

#[test]
fn filters_message_attached_to_name() {
    let err = Engine::new()
        .compile("{{ count | lower }}")
        .unwrap()
        .render_from(&value! { { count: 3 } })
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "filter `lower` expected a string, found integer between bytes 11 and 16"
    );
}

#[test]
fn filters_custom_with_argument() {
    let mut engine = Engine::new();
    engine.add_filter("append", |value, arg| match (value, arg) {
        (Value::String(s), Some(Value::String(a))) => Ok(Value::String(format!("{s}{a}"))),
        _ => Err(String::from("expected strings")),
    });
    engine
        .add_template("greet", r#"{{ name | append("!") }}"#)
        .unwrap();
    let result = engine.render("greet", value! { { name: "John" } }).unwrap();
    assert_eq!(result, "John!");
}

#[test]
fn filters_custom_replaces_builtin() {
    let mut engine = Engine::new();
    engine.add_filter("trim", |_, _| Ok(Value::String(String::from("gone"))));
    engine.add_template("t", "{{ name | trim }}").unwrap();
    let result = engine.render("t", value! { { name: "  x  " } }).unwrap();
    assert_eq!(result, "gone");
}
