#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

mod annotation;

use quill_diagnostic::{ErrorCode, Problems};
use quill_ir::StringInterner;
use quill_parse::parse_template;

use crate::{validate, CheckOptions, ValidatedTemplate};

fn check_with(
    source: &str,
    options: &CheckOptions,
) -> (Result<ValidatedTemplate, Problems>, StringInterner) {
    let interner = StringInterner::new();
    let template = parse_template(source, "test.ftl", &interner).unwrap();
    let result = validate(template, options, &interner);
    (result, interner)
}

fn check(source: &str) -> (ValidatedTemplate, StringInterner) {
    let (result, interner) = check_with(source, &CheckOptions::default());
    match result {
        Ok(validated) => (validated, interner),
        Err(problems) => panic!(
            "unexpected problems in:\n{source}\n{:#?}",
            problems.into_vec()
        ),
    }
}

fn problem_codes(source: &str) -> Vec<ErrorCode> {
    let (result, _) = check_with(source, &CheckOptions::default());
    match result {
        Ok(_) => Vec::new(),
        Err(problems) => problems.errors().map(|d| d.code).collect(),
    }
}
