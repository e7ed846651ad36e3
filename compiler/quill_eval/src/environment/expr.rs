//! Expression evaluation.

use std::sync::Arc;

use quill_ir::{BinaryOp, BuiltinKind, Expr, ExprKind, OperandCategory, Span};
use quill_stack::ensure_sufficient_stack;
use quill_value::{
    host_adapter, index_out_of_bounds, invalid_builtin_value, missing_member, not_callable,
    too_many_arguments, type_mismatch, unbound_variable, undeclared_variable, Capabilities,
    EvalError, EvalErrorKind, EvalResult, FunctionValue, HashValue, ScopeId, Value,
};

use super::exec::range_iter;
use super::Evaluator;
use crate::builtins::{self, scalar_text};
use crate::operators::{evaluate_binary, evaluate_unary};
use crate::scope::Lookup;

/// Most elements a range may expand to outside `[#list]`.
const MAX_RANGE_ELEMENTS: usize = 1_000_000;

/// Errors that mean "no value here" to `!` and `??`.
pub(crate) fn is_missing(err: &EvalError) -> bool {
    matches!(
        err.kind,
        EvalErrorKind::UndeclaredVariable { .. }
            | EvalErrorKind::UnboundVariable { .. }
            | EvalErrorKind::MissingMember { .. }
            | EvalErrorKind::IndexOutOfBounds { .. }
    )
}

impl Evaluator<'_, '_> {
    pub(crate) fn eval(&mut self, expr: &Expr) -> EvalResult {
        ensure_sufficient_stack(|| self.eval_inner(expr)).map_err(|e| e.with_span(expr.span))
    }

    fn eval_inner(&mut self, expr: &Expr) -> EvalResult {
        match &expr.kind {
            ExprKind::Str(s) => Ok(Value::Str(Arc::clone(s))),
            ExprKind::Int(n) => Ok(Value::Int(*n)),
            ExprKind::Float(f) => Ok(Value::Float(*f)),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Ident(name) => {
                let text = self.name_str(*name);
                match self.scopes.lookup(self.scope, Some(*name), text)? {
                    Lookup::Found(value) => Ok(value),
                    Lookup::Unbound => Err(unbound_variable(text)),
                    Lookup::Undeclared => Err(undeclared_variable(text)),
                }
            }
            ExprKind::Special(name) => self.special(*name),
            ExprKind::Sequence(items) => {
                let items = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::seq(items))
            }
            ExprKind::Hash(entries) => {
                let mut hash = HashValue::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = match self.eval(key)? {
                        Value::Str(s) => s,
                        other => return Err(type_mismatch("string", &other).with_span(key.span)),
                    };
                    let value = self.eval(value)?;
                    hash.insert(key, value);
                }
                Ok(Value::hash(hash))
            }
            ExprKind::Range {
                start,
                end,
                inclusive,
            } => {
                let start = self.eval_int(start)?;
                let Some(end) = end else {
                    return Err(invalid_builtin_value(
                        "range",
                        "an open range can only be listed",
                    ));
                };
                let end = self.eval_int(end)?;
                let items: Vec<Value> = range_iter(start, Some(end), *inclusive)
                    .take(MAX_RANGE_ELEMENTS + 1)
                    .map(Value::Int)
                    .collect();
                if items.len() > MAX_RANGE_ELEMENTS {
                    return Err(invalid_builtin_value(
                        "range",
                        format!(
                            "ranges outside `#list` are limited to {MAX_RANGE_ELEMENTS} elements"
                        ),
                    ));
                }
                Ok(Value::seq(items))
            }
            ExprKind::Member { target, name } => {
                let target = self.eval(target)?;
                self.member(&target, self.name_str(*name))
            }
            ExprKind::Index { target, key } => {
                let target = self.eval(target)?;
                let key = self.eval(key)?;
                self.index(&target, &key)
            }
            ExprKind::Call { callee, args } => {
                let callee_value = self.eval(callee)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call_value(&callee_value, args, expr.span)
            }
            ExprKind::Builtin {
                target,
                name,
                builtin,
                args,
            } => {
                let Some(kind) = *builtin else {
                    return Err(invalid_builtin_value(
                        "?",
                        format!("unknown builtin `?{}`", self.name_str(*name)),
                    ));
                };
                self.eval_builtin(kind, target, args.as_deref())
            }
            ExprKind::Exists(inner) => match self.eval(inner) {
                Ok(value) => Ok(Value::Bool(!value.is_nothing())),
                Err(err) if is_missing(&err) => Ok(Value::Bool(false)),
                Err(err) => Err(err),
            },
            ExprKind::Default { value, fallback } => {
                match self.eval(value) {
                    Ok(value) if !value.is_nothing() => return Ok(value),
                    Ok(_) => {}
                    Err(err) if is_missing(&err) => {}
                    Err(err) => return Err(err),
                }
                match fallback {
                    Some(fallback) => self.eval(fallback),
                    None => Ok(Value::from("")),
                }
            }
            ExprKind::Binary { op, left, right } => self.eval_binary(*op, left, right),
            ExprKind::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                let operand = self.resolve_host(operand)?;
                evaluate_unary(*op, &operand)
            }
            ExprKind::EscapeHole => Err(invalid_builtin_value(
                "escape",
                "placeholder used outside an escape transform",
            )),
        }
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> EvalResult {
        if op.is_logical() {
            let lhs = self.eval(left)?;
            let lhs = self.truthy(&lhs)?;
            if (op == BinaryOp::And && !lhs) || (op == BinaryOp::Or && lhs) {
                return Ok(Value::Bool(lhs));
            }
            let rhs = self.eval(right)?;
            return self.truthy(&rhs).map(Value::Bool);
        }
        let lhs = self.eval(left)?;
        let lhs = self.resolve_host(lhs)?;
        let rhs = self.eval(right)?;
        let rhs = self.resolve_host(rhs)?;
        evaluate_binary(&lhs, &rhs, op, self.time_zone)
    }

    pub(crate) fn eval_int(&mut self, expr: &Expr) -> Result<i64, EvalError> {
        match self.eval(expr)? {
            Value::Int(n) => Ok(n),
            other => Err(type_mismatch("integer", &other).with_span(expr.span)),
        }
    }

    fn eval_builtin(
        &mut self,
        kind: BuiltinKind,
        target: &Expr,
        args: Option<&[Expr]>,
    ) -> EvalResult {
        let operand = match self.eval(target) {
            Ok(value) => value,
            Err(err) if kind.tolerates_missing() && is_missing(&err) => {
                let declared = kind == BuiltinKind::IsDeclared
                    && matches!(err.kind, EvalErrorKind::UnboundVariable { .. });
                return Ok(Value::Bool(declared));
            }
            Err(err) => return Err(err),
        };
        let args = args
            .unwrap_or_default()
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;
        let category = kind.operand();
        let operand = if category == OperandCategory::Any {
            operand
        } else {
            self.resolve_host(operand)?
        };
        if kind == BuiltinKind::Interpret {
            if !args.is_empty() {
                return Err(too_many_arguments(&kind.to_string(), 0, args.len()));
            }
            return match operand {
                Value::Str(source) => self.interpret(&source),
                other => Err(type_mismatch(category, &other)),
            };
        }
        let operand = match operand {
            Value::Scope(id)
                if matches!(
                    category,
                    OperandCategory::Hash | OperandCategory::SequenceOrHash
                ) =>
            {
                Value::hash(self.scope_snapshot(id)?)
            }
            other => other,
        };
        builtins::apply(kind, &operand, &args, self.builtin_context())
    }

    /// `target.key`.
    pub(crate) fn member(&self, target: &Value, key: &str) -> EvalResult {
        match target {
            Value::Hash(hash) => hash
                .get(key)
                .cloned()
                .ok_or_else(|| missing_member(key, target)),
            Value::Scope(id) => {
                let frame = self.scopes.get(*id)?;
                frame
                    .get_text(self.env.interner.get(key), key)
                    .cloned()
                    .ok_or_else(|| missing_member(key, target))
            }
            Value::Node(node) => {
                if let Some(attribute) = key.strip_prefix('@') {
                    return node
                        .attribute(attribute)
                        .map(|value| Value::Str(Arc::clone(value)))
                        .ok_or_else(|| missing_member(key, target));
                }
                let mut children = node.children_named(key);
                match children.len() {
                    0 => Err(missing_member(key, target)),
                    1 => Ok(Value::node(children.remove(0))),
                    _ => Ok(Value::seq(children.into_iter().map(Value::node).collect())),
                }
            }
            Value::Host(host) => {
                self.require(Capabilities::HOST_CALLS)?;
                host.get(key)
                    .map_err(|e| host_adapter(e.message()))?
                    .ok_or_else(|| missing_member(key, target))
            }
            other => Err(type_mismatch("hash, scope or node", other)),
        }
    }

    /// `target[key]`: a position in a sequence or a key of a hash-like value.
    fn index(&self, target: &Value, key: &Value) -> EvalResult {
        match (target, key) {
            (Value::Seq(items), Value::Int(i)) => usize::try_from(*i)
                .ok()
                .and_then(|position| items.get(position))
                .cloned()
                .ok_or_else(|| index_out_of_bounds(*i, items.len())),
            (Value::Hash(_) | Value::Scope(_) | Value::Node(_) | Value::Host(_), Value::Str(k)) => {
                self.member(target, k)
            }
            (Value::Seq(_), other) => Err(type_mismatch("integer", other)),
            (_, Value::Str(_)) => Err(type_mismatch("hash, scope or node", target)),
            (other, _) => Err(type_mismatch("sequence", other)),
        }
    }

    /// Replace a host object by its adapter's plain-value view, if any.
    pub(crate) fn resolve_host(&self, value: Value) -> EvalResult {
        let Value::Host(host) = &value else {
            return Ok(value);
        };
        self.require(Capabilities::HOST_CALLS)?;
        match host.resolve().map_err(|e| host_adapter(e.message()))? {
            Some(resolved) => Ok(resolved),
            None => Ok(value),
        }
    }

    /// Own bindings of a frame as a hash, ordered by name.
    pub(crate) fn scope_snapshot(&self, id: ScopeId) -> Result<HashValue, EvalError> {
        let frame = self.scopes.get(id)?;
        let mut entries: Vec<(&str, Value)> = frame
            .names()
            .filter_map(|name| {
                frame
                    .get(name)
                    .map(|value| (self.name_str(name), value.clone()))
            })
            .chain(
                frame
                    .external()
                    .iter()
                    .map(|(key, value)| (&**key, value.clone())),
            )
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        Ok(entries.into_iter().collect())
    }

    /// Text written by `${...}`.
    pub(crate) fn interpolate(&self, value: &Value) -> Result<String, EvalError> {
        let resolved;
        let value = if let Value::Host(_) = value {
            resolved = self.resolve_host(value.clone())?;
            &resolved
        } else {
            value
        };
        scalar_text(value, self.time_zone)
            .ok_or_else(|| type_mismatch("string, number, boolean or date", value))
    }

    /// `callee(args)` in an expression.
    fn call_value(&mut self, callee: &Value, args: Vec<Value>, span: Span) -> EvalResult {
        match callee {
            Value::Macro(value) if value.def.is_function() => {
                let value = value.clone();
                self.call_function(&value, args, span)
            }
            Value::Function(FunctionValue::Host(function)) => {
                self.require(Capabilities::HOST_CALLS)?;
                function
                    .call(&args)
                    .map_err(|e| host_adapter(format!("{}: {}", function.name(), e.message())))
            }
            Value::Function(FunctionValue::Lookup(scope)) => match args.as_slice() {
                [Value::Str(name)] => self.lookup_in(*scope, name),
                [other] => Err(type_mismatch("string", other)),
                _ => Err(too_many_arguments("?lookup", 1, args.len())),
            },
            other => Err(not_callable(other)),
        }
    }

    /// Resolve `name` through the chain starting at `scope`.
    fn lookup_in(&self, scope: ScopeId, name: &str) -> EvalResult {
        match self.scopes.lookup(scope, self.env.interner.get(name), name)? {
            Lookup::Found(value) => Ok(value),
            Lookup::Unbound => Err(unbound_variable(name)),
            Lookup::Undeclared => Err(undeclared_variable(name)),
        }
    }
}
