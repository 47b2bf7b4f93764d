//! A lightweight template engine with template inheritance.
//!
//! # Overview
//!
//! Templates interpolate expressions using `{{ .. }}`, nest statements
//! using `{% .. %}`, and hide comments using `{# .. #}`.
//!
//! - **Expressions** combine variables, integer and string literals, and
//!   the arithmetic and comparison operators, and can pipe the result
//!   through filters, e.g. `{{ user.name | lower }}`.
//!
//! - **Statements** are conditionals `{% if cond %} .. {% else %} ..
//!   {% endif %}`, loops `{% for item in items %} .. {% endfor %}`, and
//!   the inheritance statements `{% extends "base" %}` and
//!   `{% block name %} .. {% endblock %}`.
//!
//! A `-` against either tag delimiter trims the whitespace adjacent to the
//! tag, e.g. `{{- user.name -}}`.
//!
//! # Getting started
//!
//! An [`Engine`] stores named templates and registered filters. Data is
//! passed to a render call as any [`serde::Serialize`] type, typically a
//! map or struct.
//!
//! ```
//! let mut engine = quill::Engine::new();
//! engine.add_template("hello", "Hello {{ user.name }}!")?;
//!
//! let result = engine.render("hello", quill::value!{
//!     { user: { name: "World" } }
//! })?;
//! assert_eq!(result, "Hello World!");
//! # Ok::<(), quill::Error>(())
//! ```
//!
//! Templates can also be compiled without being stored in the engine.
//!
//! ```
//! let engine = quill::Engine::new();
//! let template = engine.compile("Hello {{ name }}!")?;
//! let result = template.render(quill::value!{ { name: "World" } })?;
//! assert_eq!(result, "Hello World!");
//! # Ok::<(), quill::Error>(())
//! ```
//!
//! # Inheritance
//!
//! A template that begins with `{% extends "parent" %}` is rendered by
//! rendering the named parent template with the child's `block` contents
//! substituted for the parent's.
//!
//! ```
//! let mut engine = quill::Engine::new();
//! engine.add_template("base", "Header\n{% block content %}default{% endblock %}\nFooter")?;
//! engine.add_template("page", r#"{% extends "base" %}{% block content %}Hello!{% endblock %}"#)?;
//!
//! let result = engine.render("page", quill::Value::None)?;
//! assert_eq!(result, "Header\nHello!\nFooter");
//! # Ok::<(), quill::Error>(())
//! ```

mod compile;
mod error;
mod filters;
mod macros;
mod render;
mod types;
pub mod value;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::filters::FilterFn;
pub use crate::value::{to_value, Value};

use crate::types::template;

const DEFAULT_MAX_DEPTH: usize = 64;

/// The compilation and rendering engine.
///
/// Stores the registered filters and all templates added with
/// [`add_template`][Engine::add_template], which is how templates find
/// their parents when rendering.
pub struct Engine {
    filters: BTreeMap<String, Box<FilterFn>>,
    templates: BTreeMap<String, template::Template>,
    max_depth: usize,
}

/// A compiled template that is not stored in the engine.
#[derive(Debug)]
pub struct Template<'engine> {
    engine: &'engine Engine,
    template: template::Template,
}

/// A reference to a template stored in the engine.
#[derive(Debug, Clone, Copy)]
pub struct TemplateRef<'engine> {
    engine: &'engine Engine,
    name: &'engine str,
    template: &'engine template::Template,
}

impl Engine {
    /// Constructs a new engine with the builtin filters registered.
    pub fn new() -> Self {
        Self {
            filters: filters::defaults(),
            templates: BTreeMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the maximum scope and inheritance nesting depth allowed during
    /// a render.
    pub fn set_max_depth(&mut self, depth: usize) {
        self.max_depth = depth;
    }

    /// Registers a filter.
    ///
    /// The filter receives the value it is applied to and the optional
    /// argument, and fails by returning a message.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill::Value;
    ///
    /// let mut engine = quill::Engine::new();
    /// engine.add_filter("repeat", |value, _arg| match value {
    ///     Value::String(s) => Ok(Value::String(s.repeat(2))),
    ///     _ => Err(String::from("expected a string")),
    /// });
    /// ```
    pub fn add_filter<N, F>(&mut self, name: N, f: F)
    where
        N: Into<String>,
        F: Fn(&Value, Option<&Value>) -> std::result::Result<Value, String>
            + Send
            + Sync
            + 'static,
    {
        self.filters.insert(name.into(), Box::new(f));
    }

    /// Compiles a template and stores it under the given name.
    pub fn add_template<N, S>(&mut self, name: N, source: S) -> Result<()>
    where
        N: Into<String>,
        S: Into<String>,
    {
        let name = name.into();
        let mut template =
            compile::template(source.into()).map_err(|err| err.with_template_name(&name))?;
        template.name = Some(name.clone());
        self.templates.insert(name, template);
        Ok(())
    }

    /// Compiles and stores many templates at once.
    pub fn add_templates<I, N, S>(&mut self, templates: I) -> Result<()>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        for (name, source) in templates {
            self.add_template(name, source)?;
        }
        Ok(())
    }

    /// Returns a reference to a stored template, if it exists.
    pub fn get_template(&self, name: &str) -> Option<TemplateRef<'_>> {
        self.templates
            .get_key_value(name)
            .map(|(name, template)| TemplateRef {
                engine: self,
                name,
                template,
            })
    }

    /// Renders a stored template to a string using the given data.
    pub fn render<S>(&self, name: &str, ctx: S) -> Result<String>
    where
        S: Serialize,
    {
        let template = self.templates.get(name).ok_or_else(|| {
            Error::render_plain(format!("template `{name}` does not exist"))
        })?;
        let globals = to_value(ctx)?;
        render::template(self, template, Some(name), &globals)
    }

    /// Compiles a template without storing it.
    ///
    /// The returned template borrows the engine so that it can use the
    /// registered filters and find parent templates.
    pub fn compile(&self, source: &str) -> Result<Template<'_>> {
        let template = compile::template(source.to_owned())?;
        Ok(Template {
            engine: self,
            template,
        })
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("templates", &self.templates)
            .field("filters", &self.filters.keys())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl Template<'_> {
    /// Renders the template to a string using the given data.
    pub fn render<S>(&self, ctx: S) -> Result<String>
    where
        S: Serialize,
    {
        let globals = to_value(ctx)?;
        render::template(self.engine, &self.template, None, &globals)
    }

    /// Renders the template to a string using an already constructed
    /// [`Value`].
    pub fn render_from(&self, globals: &Value) -> Result<String> {
        render::template(self.engine, &self.template, None, globals)
    }

    /// Returns the original template source.
    pub fn source(&self) -> &str {
        &self.template.source
    }
}

impl TemplateRef<'_> {
    /// Renders the template to a string using the given data.
    pub fn render<S>(&self, ctx: S) -> Result<String>
    where
        S: Serialize,
    {
        let globals = to_value(ctx)?;
        render::template(self.engine, self.template, Some(self.name), &globals)
    }

    /// Renders the template to a string using an already constructed
    /// [`Value`].
    pub fn render_from(&self, globals: &Value) -> Result<String> {
        render::template(self.engine, self.template, Some(self.name), globals)
    }

    /// Returns the name the template is stored under.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Returns the original template source.
    pub fn source(&self) -> &str {
        &self.template.source
    }
}
