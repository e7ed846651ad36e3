//! Builtin dispatch (`value?name(args)`).
//!
//! The annotator binds each builtin name to a [`BuiltinKind`]; here the
//! handler for that kind receives the evaluated operand and arguments and
//! dispatches on the operand's runtime variant. Anything outside the
//! builtin's [`OperandCategory`] fails with a type mismatch naming the
//! category.
//!
//! Builtins that need the environment (`?interpret`, `?is_declared` and the
//! missing-tolerant `?has_content`) are intercepted by the evaluator before
//! reaching [`apply`].
//!
//! [`OperandCategory`]: quill_ir::OperandCategory

mod nodes;
mod scalars;
mod sequences;
mod strings;

use chrono_tz::Tz;
use quill_ir::{BuiltinKind, MacroKind, OperandCategory};
use quill_value::{
    invalid_builtin_value, missing_argument, too_many_arguments, type_mismatch, EvalError,
    EvalResult, FunctionValue, Value,
};

/// Render settings builtins depend on.
#[derive(Copy, Clone, Debug)]
pub(crate) struct BuiltinContext {
    pub(crate) time_zone: Tz,
}

/// Positional arguments of one builtin call.
pub(crate) struct Args<'a> {
    kind: BuiltinKind,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub(crate) fn new(kind: BuiltinKind, values: &'a [Value]) -> Self {
        Args { kind, values }
    }

    fn callee(&self) -> String {
        self.kind.to_string()
    }

    /// Require between `min` and `max` arguments.
    pub(crate) fn arity(&self, min: usize, max: usize) -> Result<(), EvalError> {
        if self.values.len() > max {
            return Err(too_many_arguments(&self.callee(), max, self.values.len()));
        }
        if self.values.len() < min {
            return Err(missing_argument(
                &self.callee(),
                &format!("argument {}", self.values.len() + 1),
            ));
        }
        Ok(())
    }

    pub(crate) fn get(&self, index: usize) -> Option<&'a Value> {
        self.values.get(index)
    }

    pub(crate) fn value(&self, index: usize) -> Result<&'a Value, EvalError> {
        self.values
            .get(index)
            .ok_or_else(|| missing_argument(&self.callee(), &format!("argument {}", index + 1)))
    }

    pub(crate) fn str(&self, index: usize) -> Result<&'a str, EvalError> {
        match self.value(index)? {
            Value::Str(s) => Ok(s),
            other => Err(type_mismatch("string", other)),
        }
    }

    pub(crate) fn int(&self, index: usize) -> Result<i64, EvalError> {
        match self.value(index)? {
            Value::Int(n) => Ok(*n),
            other => Err(type_mismatch("integer", other)),
        }
    }
}

/// Apply a builtin to an evaluated operand.
pub(crate) fn apply(
    kind: BuiltinKind,
    target: &Value,
    args: &[Value],
    ctx: BuiltinContext,
) -> EvalResult {
    let args = Args::new(kind, args);
    match kind.operand() {
        OperandCategory::String => {
            if let Value::Str(s) = target {
                strings::apply(kind, s, &args)
            } else {
                Err(type_mismatch(kind.operand(), target))
            }
        }
        OperandCategory::RegexMatch => match target {
            Value::Match(m) => {
                args.arity(0, 0)?;
                Ok(Value::seq(m.groups()))
            }
            _ => Err(type_mismatch(kind.operand(), target)),
        },
        OperandCategory::Sequence | OperandCategory::Hash | OperandCategory::SequenceOrHash => {
            sequences::apply(kind, target, &args, ctx)
        }
        OperandCategory::Scalar
        | OperandCategory::Number
        | OperandCategory::Boolean
        | OperandCategory::Date => scalars::apply(kind, target, &args, ctx),
        OperandCategory::Node => match target {
            Value::Node(node) => {
                args.arity(0, 0)?;
                Ok(nodes::apply(kind, node))
            }
            _ => Err(type_mismatch(kind.operand(), target)),
        },
        OperandCategory::Macro => match target {
            Value::Macro(m) => {
                args.arity(0, 0)?;
                Ok(Value::Scope(m.namespace))
            }
            _ => Err(type_mismatch(kind.operand(), target)),
        },
        OperandCategory::Scope => match target {
            Value::Scope(id) => {
                args.arity(0, 0)?;
                Ok(Value::Function(FunctionValue::Lookup(*id)))
            }
            _ => Err(type_mismatch(kind.operand(), target)),
        },
        OperandCategory::Any => {
            args.arity(0, 0)?;
            reflect(kind, target)
        }
    }
}

/// Existence and reflection builtins, defined for every variant.
fn reflect(kind: BuiltinKind, target: &Value) -> EvalResult {
    let is = |b: bool| Ok(Value::Bool(b));
    match kind {
        BuiltinKind::HasContent => is(target.has_content()),
        // Reaching here means the operand evaluated, so it is declared.
        BuiltinKind::IsDeclared => is(true),
        BuiltinKind::TypeName => Ok(Value::from(target.type_name())),
        BuiltinKind::IsString => is(matches!(target, Value::Str(_))),
        BuiltinKind::IsNumber => is(target.is_number()),
        BuiltinKind::IsBoolean => is(matches!(target, Value::Bool(_))),
        BuiltinKind::IsDate => is(matches!(target, Value::Date(_))),
        BuiltinKind::IsSequence => is(matches!(target, Value::Seq(_))),
        BuiltinKind::IsHash => is(matches!(target, Value::Hash(_))),
        BuiltinKind::IsNode => is(matches!(target, Value::Node(_))),
        BuiltinKind::IsMacro => {
            is(matches!(target, Value::Macro(m) if m.def.kind != MacroKind::Function))
        }
        BuiltinKind::IsFunction => is(match target {
            Value::Macro(m) => m.def.kind == MacroKind::Function,
            Value::Function(_) => true,
            _ => false,
        }),
        BuiltinKind::IsScope => is(matches!(target, Value::Scope(_))),
        BuiltinKind::IsNothing => is(target.is_nothing()),
        _ => Err(invalid_builtin_value(
            kind.name(),
            "not applicable to this operand",
        )),
    }
}

/// Text of a scalar for joining and `?string`; `None` for non-scalars.
pub(crate) fn scalar_text(value: &Value, tz: Tz) -> Option<String> {
    match value {
        Value::Str(s) => Some(s.to_string()),
        Value::Int(_) | Value::Float(_) => value.format_number(),
        Value::Bool(b) => Some(b.to_string()),
        Value::Date(d) => Some(d.render(tz)),
        Value::Node(node) => Some(node.text()),
        _ => None,
    }
}
