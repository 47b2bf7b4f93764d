mod lex;
mod parse;

use std::collections::BTreeMap;

use crate::compile::parse::Parser;
use crate::types::ast;
use crate::types::template::Template;
use crate::{Error, Result};

/// Compiles a template source into a [`Template`].
///
/// In addition to parsing, this records the parent template named by any
/// `extends` statement and indexes all `block` statements by name so that
/// the renderer can resolve overrides without walking the AST again.
pub fn template(source: String) -> Result<Template> {
    let scope = Parser::new(&source).parse_template()?;

    let mut parent = None;
    for (i, stmt) in scope.stmts.iter().enumerate() {
        if let ast::Stmt::Extends(extends) = stmt {
            if i != 0 || parent.is_some() {
                return Err(Error::parse(
                    "`extends` must be the first statement in the template",
                    &source,
                    extends.name.span,
                ));
            }
            parent = Some(extends.name.name.clone());
        }
    }

    let mut blocks = BTreeMap::new();
    index_blocks(&source, &scope, &mut blocks, false)?;

    Ok(Template {
        name: None,
        source,
        scope,
        blocks,
        parent,
    })
}

/// Recursively indexes the blocks in a scope by name. A block defined twice
/// replaces the earlier definition.
fn index_blocks(
    source: &str,
    scope: &ast::Scope,
    blocks: &mut BTreeMap<String, ast::Block>,
    nested: bool,
) -> Result<()> {
    for stmt in &scope.stmts {
        match stmt {
            ast::Stmt::Raw(_) | ast::Stmt::Print(_) => {}
            ast::Stmt::Extends(extends) => {
                // The top-level occurrence was already validated by the
                // caller.
                if nested {
                    return Err(Error::parse(
                        "`extends` must be the first statement in the template",
                        source,
                        extends.name.span,
                    ));
                }
            }
            ast::Stmt::IfElse(if_else) => {
                index_blocks(source, &if_else.then_branch, blocks, true)?;
                if let Some(else_branch) = &if_else.else_branch {
                    index_blocks(source, else_branch, blocks, true)?;
                }
            }
            ast::Stmt::ForLoop(for_loop) => {
                index_blocks(source, &for_loop.body, blocks, true)?;
            }
            ast::Stmt::Block(block) => {
                index_blocks(source, &block.body, blocks, true)?;
                let name = source[block.name.span].to_owned();
                blocks.insert(name, block.clone());
            }
        }
    }
    Ok(())
}
