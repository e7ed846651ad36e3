//! Static scope and escape annotator.
//!
//! Runs once per template, right after parsing, and turns a raw [`Template`]
//! into a [`ValidatedTemplate`]:
//!
//! 1. **Structural validation**: `return`, `nested`, `fallback`, `break` and
//!    `local` are only legal in certain enclosing constructs; functions must
//!    return a value on every path; switches have at most one default.
//! 2. **Declared sets**: every frame-owning block (template root, macro body,
//!    loop body, call body) gets the set of names it binds locally.
//! 3. **Escape threading**: `[#escape]` regions rewrite the interpolations
//!    inside them; `[#noescape]` suspends the innermost region.
//! 4. **Simplification**: adjacent text is merged, single-case switches become
//!    conditionals, blank directive lines are optionally dropped.
//! 5. **Literal checks**: statically literal operands in the wrong context are
//!    reported (warnings unless configured fatal).
//!
//! Every problem found is collected; the pass never stops at the first one.

mod annotator;
mod escape;
mod literal;
mod returns;
mod simplify;

use std::ops::Deref;

use quill_diagnostic::{Diagnostic, Problems};
use quill_ir::{StringInterner, Template};

use annotator::Annotator;

/// Annotator switches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckOptions {
    /// Drop whitespace-only text that sits on a line between two directives.
    pub strip_whitespace: bool,
    /// Report literal-context mismatches as errors instead of warnings.
    pub literal_type_check_fatal: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        CheckOptions {
            strip_whitespace: true,
            literal_type_check_fatal: false,
        }
    }
}

/// A template that passed validation.
///
/// Only [`validate`] builds one, so holding a `ValidatedTemplate` means the
/// AST is annotated and frozen. Renders share it behind an `Arc`.
#[derive(Debug)]
pub struct ValidatedTemplate {
    template: Template,
    warnings: Vec<Diagnostic>,
}

impl ValidatedTemplate {
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Non-fatal problems found during validation.
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }
}

impl Deref for ValidatedTemplate {
    type Target = Template;

    fn deref(&self) -> &Template {
        &self.template
    }
}

/// Annotate `template`, returning it frozen or every problem found.
///
/// The returned [`Problems`] always contains at least one error; warnings
/// found alongside the errors are included.
#[tracing::instrument(level = "debug", skip_all, fields(template = %template.name))]
pub fn validate(
    mut template: Template,
    options: &CheckOptions,
    interner: &StringInterner,
) -> Result<ValidatedTemplate, Problems> {
    let mut annotator = Annotator::new(interner, options);
    annotator.template(&mut template);
    let problems = annotator.finish();
    if problems.has_errors() {
        tracing::debug!(
            errors = problems.error_count(),
            warnings = problems.warning_count(),
            "template failed validation"
        );
        let mut problems = problems;
        problems.sort_by_position();
        return Err(problems);
    }
    Ok(ValidatedTemplate {
        template,
        warnings: problems.into_vec(),
    })
}

#[cfg(test)]
mod tests;
