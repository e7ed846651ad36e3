//! Special variables (`.name`).

use quill_ir::Name;
use quill_value::{undeclared_variable, DateKind, DateValue, EvalError, EvalResult, Value};

use super::Evaluator;

impl Evaluator<'_, '_> {
    pub(crate) fn special(&self, name: Name) -> EvalResult {
        let names = self.names();
        let value = match name {
            n if n == names.now => Value::Date(DateValue::new(self.now, DateKind::DateTime)),
            n if n == names.locale => Value::string(self.locale.to_string()),
            n if n == names.lang => Value::string(self.locale.language()),
            n if n == names.time_zone => Value::string(self.time_zone.name()),
            n if n == names.template_name => Value::Str(self.origin.name.clone()),
            n if n == names.namespace => Value::Scope(self.namespace),
            n if n == names.main => Value::Scope(self.main),
            n if n == names.globals => Value::Scope(self.global),
            n if n == names.data_model => Value::Scope(self.data_model),
            n if n == names.caller_scope => match self.current_context() {
                Some(context) => Value::Scope(context.invoking_scope),
                None => return Err(self.unavailable(name)),
            },
            n if n == names.error => match self.errors.last() {
                Some(message) => message.clone(),
                None => return Err(self.unavailable(name)),
            },
            n if n == names.node => match &self.visit_node {
                Some(node) => Value::Node(node.clone()),
                None => return Err(self.unavailable(name)),
            },
            _ => return Err(self.unavailable(name)),
        };
        Ok(value)
    }

    #[cold]
    fn unavailable(&self, name: Name) -> EvalError {
        undeclared_variable(&format!(".{}", self.name_str(name)))
    }
}
