//! Parser for Quill templates.
//!
//! Produces the raw [`Template`] AST. Only syntax is checked here; scope,
//! structure and escape rules are the annotator's job (`quill_check`).
//!
//! # Syntax
//!
//! ```text
//! Hello ${user.name!"guest"}!
//! [#-- comment --]
//! [#list items as item]${item_index}: ${item}[#else]none[/#list]
//! [#macro card title body=""]<h1>${title}</h1>[#nested][/#macro]
//! [@card title="News"; x]...[/@card]
//! ```

mod error;
mod grammar;
mod lexer;

use std::sync::Arc;

use quill_diagnostic::{Diagnostic, ErrorCode};
use quill_ir::{Block, Span, StringInterner, Template};

pub use error::ParseResult;
pub use grammar::expr::parse_expression;

use grammar::content::ContentParser;

/// Parse `source` into a raw template named `name`.
#[tracing::instrument(level = "debug", skip_all, fields(template = name))]
pub fn parse_template(source: &str, name: &str, interner: &StringInterner) -> ParseResult<Template> {
    if u32::try_from(source.len()).is_err() {
        return Err(Diagnostic::error(ErrorCode::E9001)
            .with_message("template source is larger than 4 GiB")
            .with_label(Span::DUMMY, "template starts here"));
    }
    let mut parser = ContentParser::new(source, interner);
    let nodes = parser.parse_root()?;
    tracing::trace!(
        nodes = nodes.len(),
        macros = parser.macros.len(),
        "parsed template"
    );
    Ok(Template {
        name: Arc::from(name),
        source: Arc::from(source),
        root: Block::new(nodes),
        macros: parser.macros,
    })
}

#[cfg(test)]
mod tests;
