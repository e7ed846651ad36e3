//! Sequence and hash builtins.

use std::cmp::Ordering;
use std::sync::Arc;

use quill_ir::{BinaryOp, BuiltinKind};
use quill_value::{
    index_out_of_bounds, invalid_builtin_value, missing_member, type_mismatch, EvalError,
    EvalResult, Value,
};

use super::{scalar_text, Args, BuiltinContext};
use crate::operators::compare;

pub(super) fn apply(
    kind: BuiltinKind,
    target: &Value,
    args: &Args<'_>,
    ctx: BuiltinContext,
) -> EvalResult {
    match (kind, target) {
        (BuiltinKind::Size, Value::Seq(items)) => {
            args.arity(0, 0)?;
            Ok(Value::Int(len_to_int(items.len())))
        }
        (BuiltinKind::Size, Value::Hash(hash)) => {
            args.arity(0, 0)?;
            Ok(Value::Int(len_to_int(hash.len())))
        }
        (BuiltinKind::Keys, Value::Hash(hash)) => {
            args.arity(0, 0)?;
            Ok(Value::seq(
                hash.keys().map(|k| Value::Str(Arc::clone(k))).collect(),
            ))
        }
        (BuiltinKind::Values, Value::Hash(hash)) => {
            args.arity(0, 0)?;
            Ok(Value::seq(hash.values().cloned().collect()))
        }
        (_, Value::Seq(items)) if kind.operand() != quill_ir::OperandCategory::Hash => {
            sequence(kind, items, args, ctx)
        }
        _ => Err(type_mismatch(kind.operand(), target)),
    }
}

fn len_to_int(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

fn sequence(
    kind: BuiltinKind,
    items: &[Value],
    args: &Args<'_>,
    ctx: BuiltinContext,
) -> EvalResult {
    match kind {
        BuiltinKind::First | BuiltinKind::Last => {
            args.arity(0, 0)?;
            let item = if kind == BuiltinKind::First {
                items.first()
            } else {
                items.last()
            };
            item.cloned().ok_or_else(|| index_out_of_bounds(0, 0))
        }
        BuiltinKind::Reverse => {
            args.arity(0, 0)?;
            Ok(Value::seq(items.iter().rev().cloned().collect()))
        }
        BuiltinKind::Sort => {
            args.arity(0, 0)?;
            let keyed: Vec<(Value, Value)> =
                items.iter().map(|v| (v.clone(), v.clone())).collect();
            sort_keyed(keyed)
        }
        BuiltinKind::SortBy => {
            args.arity(1, 1)?;
            let path = sort_path(args.value(0)?)?;
            let keyed = items
                .iter()
                .map(|item| Ok((sort_key(item, &path)?, item.clone())))
                .collect::<Result<Vec<_>, EvalError>>()?;
            sort_keyed(keyed)
        }
        BuiltinKind::Join => {
            args.arity(1, 2)?;
            let separator = args.str(0)?;
            if items.is_empty() {
                if let Some(empty) = args.get(1) {
                    return Ok(empty.clone());
                }
            }
            let mut out = String::new();
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(separator);
                }
                let text = scalar_text(item, ctx.time_zone)
                    .ok_or_else(|| type_mismatch("string, number, boolean or date", item))?;
                out.push_str(&text);
            }
            Ok(Value::string(out))
        }
        BuiltinKind::SeqContains => {
            args.arity(1, 1)?;
            let needle = args.value(0)?;
            Ok(Value::Bool(items.iter().any(|item| item == needle)))
        }
        BuiltinKind::SeqIndexOf => {
            args.arity(1, 1)?;
            let needle = args.value(0)?;
            Ok(Value::Int(
                items
                    .iter()
                    .position(|item| item == needle)
                    .map_or(-1, len_to_int),
            ))
        }
        BuiltinKind::Chunk => {
            args.arity(1, 2)?;
            let size = args.int(0)?;
            let size = usize::try_from(size)
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| {
                    invalid_builtin_value("chunk", format!("chunk size must be positive, got {size}"))
                })?;
            let fill = args.get(1);
            let chunks = items
                .chunks(size)
                .map(|chunk| {
                    let mut row = chunk.to_vec();
                    if let Some(fill) = fill {
                        row.resize(size, fill.clone());
                    }
                    Value::seq(row)
                })
                .collect();
            Ok(Value::seq(chunks))
        }
        _ => Err(invalid_builtin_value(kind.name(), "not a sequence builtin")),
    }
}

/// `?sort_by` key: one name or a sequence of names for nested hashes.
fn sort_path(arg: &Value) -> Result<Vec<Arc<str>>, EvalError> {
    match arg {
        Value::Str(name) => Ok(vec![Arc::clone(name)]),
        Value::Seq(names) if !names.is_empty() => names
            .iter()
            .map(|name| match name {
                Value::Str(s) => Ok(Arc::clone(s)),
                other => Err(type_mismatch("string", other)),
            })
            .collect(),
        other => Err(type_mismatch("string or sequence of strings", other)),
    }
}

fn sort_key(item: &Value, path: &[Arc<str>]) -> Result<Value, EvalError> {
    let mut current = item.clone();
    for key in path {
        let next = match &current {
            Value::Hash(hash) => hash.get(key).cloned(),
            other => return Err(type_mismatch("hash", other)),
        };
        current = next.ok_or_else(|| missing_member(key, &current))?;
    }
    Ok(current)
}

/// Stable sort on keys that must all be strings, all numbers or all dates.
fn sort_keyed(mut keyed: Vec<(Value, Value)>) -> EvalResult {
    if let Some((first, _)) = keyed.first() {
        if !matches!(
            first,
            Value::Str(_) | Value::Int(_) | Value::Float(_) | Value::Date(_)
        ) {
            return Err(type_mismatch("string, number or date", first));
        }
        for (key, _) in &keyed[1..] {
            compare(first, key, BinaryOp::Lt)?;
        }
    }
    keyed.sort_by(|(a, _), (b, _)| compare(a, b, BinaryOp::Lt).unwrap_or(Ordering::Equal));
    Ok(Value::seq(keyed.into_iter().map(|(_, v)| v).collect()))
}
