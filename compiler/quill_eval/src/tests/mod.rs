#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

//! End-to-end evaluator tests: source text in, rendered text out.

mod control;
mod macros;
mod scoping;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rustc_hash::FxHashMap;

use quill_check::{validate, CheckOptions, ValidatedTemplate};
use quill_ir::{Locale, StringInterner};
use quill_parse::parse_template;
use quill_value::{template_load, Capabilities, EvalError, HashValue, Value};

use crate::{Environment, TemplateProvider};

/// Compiled templates served by name.
#[derive(Default)]
struct Library {
    templates: FxHashMap<String, Arc<ValidatedTemplate>>,
}

impl TemplateProvider for Library {
    fn get_template(
        &self,
        name: &str,
        _locale: &Locale,
    ) -> Result<Arc<ValidatedTemplate>, EvalError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| template_load(name, "not found"))
    }
}

/// Templates plus render settings for one test.
pub(super) struct Harness {
    interner: StringInterner,
    library: Library,
    data: HashValue,
    capabilities: Capabilities,
    max_call_depth: usize,
}

impl Harness {
    pub(super) fn new() -> Self {
        Harness {
            interner: StringInterner::new(),
            library: Library::default(),
            data: HashValue::new(),
            capabilities: Capabilities::all(),
            max_call_depth: crate::DEFAULT_MAX_CALL_DEPTH,
        }
    }

    pub(super) fn template(mut self, name: &str, source: &str) -> Self {
        let template = match parse_template(source, name, &self.interner) {
            Ok(template) => template,
            Err(diag) => panic!("failed to parse {name}:\n{source}\n{diag}"),
        };
        let validated = match validate(template, &CheckOptions::default(), &self.interner) {
            Ok(validated) => validated,
            Err(problems) => panic!("{name} failed validation: {:#?}", problems.into_vec()),
        };
        self.library
            .templates
            .insert(name.to_owned(), Arc::new(validated));
        self
    }

    pub(super) fn data(mut self, json: serde_json::Value) -> Self {
        let Value::Hash(hash) = Value::from_json(json) else {
            panic!("data model must be a JSON object");
        };
        self.data = (*hash).clone();
        self
    }

    pub(super) fn set(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key, value);
        self
    }

    pub(super) fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub(super) fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Render `name`, returning what reached the sink alongside the result.
    pub(super) fn run(&self, name: &str) -> (String, Result<(), EvalError>) {
        let env = Environment::builder(&self.interner)
            .provider(&self.library)
            .capabilities(self.capabilities)
            .max_call_depth(self.max_call_depth)
            .locale(Locale::new("en", "US", ""))
            .now(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap())
            .build();
        let template = self.library.get_template(name, &Locale::ROOT).unwrap();
        let mut out = String::new();
        let result = env.render(&template, &self.data, &mut out);
        (out, result)
    }

    pub(super) fn render(&self, name: &str) -> String {
        match self.run(name) {
            (out, Ok(())) => out,
            (out, Err(err)) => panic!("render of {name} failed after {out:?}: {err}"),
        }
    }

    pub(super) fn render_err(&self, name: &str) -> EvalError {
        match self.run(name) {
            (out, Ok(())) => panic!("render of {name} succeeded with {out:?}"),
            (_, Err(err)) => err,
        }
    }
}

/// Render a single template with an empty data model.
pub(super) fn render(source: &str) -> String {
    Harness::new().template("main.ftl", source).render("main.ftl")
}

/// Render a single template against `data`.
pub(super) fn render_with(source: &str, data: serde_json::Value) -> String {
    Harness::new()
        .template("main.ftl", source)
        .data(data)
        .render("main.ftl")
}

pub(super) fn render_err(source: &str) -> EvalError {
    Harness::new().template("main.ftl", source).render_err("main.ftl")
}
