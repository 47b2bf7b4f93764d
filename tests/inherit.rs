use quill::{value, Engine, Value};

#[test]
fn inherit_override_block() {
    let mut engine = Engine::new();
    engine
        .add_templates([
            (
                "base",
                "Header\n\n{% block content %}default{% endblock %}\n\nFooter",
            ),
            (
                "page",
                r#"{% extends "base" %}{% block content %}Child content{% endblock %}"#,
            ),
        ])
        .unwrap();
    assert_eq!(
        engine.render("page", Value::None).unwrap(),
        "Header\n\nChild content\n\nFooter"
    );
}

#[test]
fn inherit_unoverridden_block_keeps_default() {
    let mut engine = Engine::new();
    engine
        .add_templates([
            (
                "base",
                "{% block title %}Untitled{% endblock %}: {% block content %}{% endblock %}",
            ),
            (
                "page",
                r#"{% extends "base" %}{% block content %}Hello{% endblock %}"#,
            ),
        ])
        .unwrap();
    assert_eq!(engine.render("page", Value::None).unwrap(), "Untitled: Hello");
}

#[test]
fn inherit_base_renders_defaults() {
    let mut engine = Engine::new();
    engine
        .add_template("base", "[{% block content %}default{% endblock %}]")
        .unwrap();
    assert_eq!(engine.render("base", Value::None).unwrap(), "[default]");
}

#[test]
fn inherit_chain_most_derived_wins() {
    let mut engine = Engine::new();
    engine
        .add_templates([
            ("a", "{% block x %}a{% endblock %}"),
            ("b", r#"{% extends "a" %}{% block x %}b{% endblock %}"#),
            ("c", r#"{% extends "b" %}{% block x %}c{% endblock %}"#),
        ])
        .unwrap();
    assert_eq!(engine.render("c", Value::None).unwrap(), "c");
}

#[test]
fn inherit_chain_falls_back_to_middle() {
    let mut engine = Engine::new();
    engine
        .add_templates([
            ("a", "{% block x %}a{% endblock %}"),
            ("b", r#"{% extends "a" %}{% block x %}b{% endblock %}"#),
            ("c", r#"{% extends "b" %}"#),
        ])
        .unwrap();
    assert_eq!(engine.render("c", Value::None).unwrap(), "b");
}

#[test]
fn inherit_block_body_uses_current_scope() {
    let mut engine = Engine::new();
    engine
        .add_templates([
            ("base", "{% block greet %}{% endblock %}"),
            (
                "page",
                r#"{% extends "base" %}{% block greet %}Hello {{ user.name }}!{% endblock %}"#,
            ),
        ])
        .unwrap();
    let ctx = value! { { user: { name: "John" } } };
    assert_eq!(
        engine.render("page", ctx).unwrap(),
        "Hello John!"
    );
}

#[test]
fn inherit_block_inside_statement() {
    let mut engine = Engine::new();
    engine
        .add_templates([
            (
                "base",
                "{% for i in items %}{% block row %}-{% endblock %}{% endfor %}",
            ),
            (
                "page",
                r#"{% extends "base" %}{% block row %}{{ i }},{% endblock %}"#,
            ),
        ])
        .unwrap();
    let ctx = value! { { items: [1, 2, 3] } };
    assert_eq!(engine.render("page", ctx).unwrap(), "1,2,3,");
}

#[test]
fn inherit_from_standalone_template() {
    // a template compiled outside the registry can still extend a
    // registered parent
    let mut engine = Engine::new();
    engine
        .add_template("base", "<{% block x %}{% endblock %}>")
        .unwrap();
    let template = engine
        .compile(r#"{% extends "base" %}{% block x %}y{% endblock %}"#)
        .unwrap();
    assert_eq!(template.render(Value::None).unwrap(), "<y>");
}

#[test]
fn inherit_missing_parent_fails() {
    let mut engine = Engine::new();
    engine
        .add_template("page", r#"{% extends "ghost" %}content"#)
        .unwrap();
    let err = engine.render("page", Value::None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "parent template `ghost` does not exist between bytes 11 and 18 in template `page`"
    );
}

#[test]
fn inherit_cycle_fails() {
    let mut engine = Engine::new();
    engine
        .add_templates([
            ("a", r#"{% extends "b" %}"#),
            ("b", r#"{% extends "a" %}"#),
        ])
        .unwrap();
    let err = engine.render("a", Value::None).unwrap_err();
    assert_eq!(err.to_string(), "maximum recursion depth of 64 exceeded");
}

#[test]
fn inherit_extends_must_be_first() {
    let mut engine = Engine::new();
    let err = engine
        .add_template("page", r#"content {% extends "base" %}"#)
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("`extends` must be the first statement"));
}

#[test]
fn inherit_via_template_ref() {
    let mut engine = Engine::new();
    engine
        .add_templates([
            ("base", "({% block x %}{% endblock %})"),
            ("page", r#"{% extends "base" %}{% block x %}y{% endblock %}"#),
        ])
        .unwrap();
    let template = engine.get_template("page").unwrap();
    assert_eq!(template.name(), "page");
    assert_eq!(template.render(Value::None).unwrap(), "(y)");
}

#[test]
fn inherit_error_in_parent_names_parent() {
    let mut engine = Engine::new();
    engine
        .add_templates([
            ("base", "{% block x %}{% endblock %}{{ 1 / 0 }}"),
            ("page", r#"{% extends "base" %}"#),
        ])
        .unwrap();
    let err = engine.render("page", Value::None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "division by zero between bytes 30 and 35 in template `base`"
    );
}

#[test]
fn inherit_error_in_override_names_child() {
    let mut engine = Engine::new();
    engine
        .add_templates([
            ("base", "A{% block content %}{% endblock %}"),
            (
                "page",
                r#"{% extends "base" %}{% block content %}{{ 1 / 0 }}{% endblock %}"#,
            ),
        ])
        .unwrap();
    let err = engine.render("page", Value::None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "division by zero between bytes 42 and 47 in template `page`"
    );
}
