use quill::{Engine, ErrorKind};

fn compile_err(source: &str) -> quill::Error {
    Engine::new().compile(source).unwrap_err()
}

#[test]
fn compile_error_kind() {
    let err = compile_err("{{ ");
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn compile_unclosed_tag_display() {
    let err = compile_err("Hello {{ name");
    assert_eq!(
        err.to_string(),
        "unclosed tag, expected end expression between bytes 6 and 8"
    );
}

#[test]
fn compile_unclosed_tag_pretty() {
    let err = compile_err("Hello {{ name");
    assert_eq!(
        format!("{err:#}"),
        "\n   |\n 1 | Hello {{ name\n   |       ^^ unclosed tag, expected end expression\n"
    );
}

#[test]
fn compile_pretty_with_template_name() {
    let mut engine = Engine::new();
    let err = engine.add_template("greet", "Hello {{ name").unwrap_err();
    assert_eq!(
        format!("{err:#}"),
        "\n --> template `greet`\n\n   |\n 1 | Hello {{ name\n   |       ^^ unclosed tag, expected end expression\n"
    );
}

#[test]
fn compile_pretty_second_line() {
    let err = compile_err("first\nsecond {{ + }}");
    assert_eq!(
        format!("{err:#}"),
        "\n   |\n 2 | second {{ + }}\n   |           ^ unexpected plus\n"
    );
}

#[test]
fn compile_unexpected_character() {
    let err = compile_err("{{ a ~ b }}");
    assert_eq!(err.to_string(), "unexpected character between bytes 5 and 6");
}

#[test]
fn compile_undelimited_string() {
    let err = compile_err(r#"{{ "abc }}"#);
    assert!(err.to_string().starts_with("undelimited string"));
}

#[test]
fn compile_lone_equals() {
    let err = compile_err("{{ a = b }}");
    assert!(err.to_string().starts_with("unexpected character"));
}

#[test]
fn compile_missing_end_tag() {
    let err = compile_err("{{ a b }}");
    assert_eq!(
        err.to_string(),
        "expected end expression, found identifier between bytes 5 and 6"
    );
}

#[test]
fn compile_statement_requires_keyword() {
    let err = compile_err("{% name %}");
    assert_eq!(
        err.to_string(),
        "expected keyword, found identifier between bytes 3 and 7"
    );
}

#[test]
fn compile_unexpected_end_statement() {
    let err = compile_err("{% if cond }}");
    assert_eq!(err.to_string(), "unexpected end expression between bytes 11 and 13");
}

#[test]
fn compile_template_source_is_kept() {
    let engine = Engine::new();
    let template = engine.compile("Hello {{ name }}!").unwrap();
    assert_eq!(template.source(), "Hello {{ name }}!");
}
