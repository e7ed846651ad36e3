//! Access to other templates for `[#include]` and `[#import]`.

use std::sync::Arc;

use quill_check::ValidatedTemplate;
use quill_ir::Locale;
use quill_value::EvalError;

/// Supplies validated templates by name.
///
/// Implemented by the engine on top of its template cache; failures are
/// reported as template-load errors, which `[#attempt]` can recover from.
pub trait TemplateProvider: Send + Sync {
    fn get_template(&self, name: &str, locale: &Locale)
        -> Result<Arc<ValidatedTemplate>, EvalError>;
}

/// Resolve `requested` relative to the template named `current`.
///
/// A leading `/` makes the name absolute; `.` and `..` segments are
/// collapsed, and `..` never climbs above the root.
pub fn resolve_template_name(current: &str, requested: &str) -> String {
    let base = if let Some(absolute) = requested.strip_prefix('/') {
        absolute.to_owned()
    } else {
        match current.rfind('/') {
            Some(slash) => format!("{}/{requested}", &current[..slash]),
            None => requested.to_owned(),
        }
    };
    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::resolve_template_name;

    #[test]
    fn names_resolve_next_to_the_current_template() {
        assert_eq!(resolve_template_name("mail/welcome.ftl", "footer.ftl"), "mail/footer.ftl");
        assert_eq!(resolve_template_name("index.ftl", "lib/util.ftl"), "lib/util.ftl");
    }

    #[test]
    fn absolute_and_parent_segments() {
        assert_eq!(resolve_template_name("mail/welcome.ftl", "/lib.ftl"), "lib.ftl");
        assert_eq!(resolve_template_name("a/b/c.ftl", "../d.ftl"), "a/d.ftl");
        assert_eq!(resolve_template_name("a.ftl", "../../x.ftl"), "x.ftl");
        assert_eq!(resolve_template_name("a/b.ftl", "./c.ftl"), "a/c.ftl");
    }
}
