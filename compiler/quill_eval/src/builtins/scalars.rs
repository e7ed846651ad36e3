//! Number, boolean and date builtins, and `?string` / `?c` formatting.

use quill_ir::BuiltinKind;
use quill_value::{
    integer_overflow, invalid_builtin_value, type_mismatch, DateKind, EvalError, EvalResult, Value,
};

use super::{Args, BuiltinContext};

pub(super) fn apply(
    kind: BuiltinKind,
    target: &Value,
    args: &Args<'_>,
    ctx: BuiltinContext,
) -> EvalResult {
    match kind {
        BuiltinKind::String => to_string(target, args, ctx),
        BuiltinKind::C => {
            args.arity(0, 0)?;
            computer_format(target, ctx)
        }
        BuiltinKind::Then => {
            args.arity(2, 2)?;
            match target {
                Value::Bool(true) => args.value(0).cloned(),
                Value::Bool(false) => args.value(1).cloned(),
                other => Err(type_mismatch(kind.operand(), other)),
            }
        }
        BuiltinKind::Iso
        | BuiltinKind::Date
        | BuiltinKind::Time
        | BuiltinKind::Datetime
        | BuiltinKind::Long => {
            args.arity(0, 0)?;
            let Value::Date(date) = target else {
                return Err(type_mismatch(kind.operand(), target));
            };
            Ok(match kind {
                BuiltinKind::Iso => Value::string(date.iso(ctx.time_zone)),
                BuiltinKind::Long => Value::string(date.long(ctx.time_zone)),
                BuiltinKind::Date => Value::Date(date.with_kind(DateKind::Date)),
                BuiltinKind::Time => Value::Date(date.with_kind(DateKind::Time)),
                _ => Value::Date(date.with_kind(DateKind::DateTime)),
            })
        }
        _ => {
            args.arity(0, 0)?;
            number(kind, target)
        }
    }
}

fn number(kind: BuiltinKind, target: &Value) -> EvalResult {
    match (kind, target) {
        (BuiltinKind::IsNan, Value::Int(_)) | (BuiltinKind::IsInfinite, Value::Int(_)) => {
            Ok(Value::Bool(false))
        }
        (BuiltinKind::IsNan, Value::Float(f)) => Ok(Value::Bool(f.is_nan())),
        (BuiltinKind::IsInfinite, Value::Float(f)) => Ok(Value::Bool(f.is_infinite())),
        (BuiltinKind::Abs, Value::Int(n)) => n
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| integer_overflow("absolute value")),
        (BuiltinKind::Abs, Value::Float(f)) => Ok(Value::Float(f.abs())),
        (
            BuiltinKind::Round | BuiltinKind::Floor | BuiltinKind::Ceiling | BuiltinKind::Int,
            Value::Int(n),
        ) => Ok(Value::Int(*n)),
        (BuiltinKind::Round, Value::Float(f)) => float_to_int((f + 0.5).floor()),
        (BuiltinKind::Floor, Value::Float(f)) => float_to_int(f.floor()),
        (BuiltinKind::Ceiling, Value::Float(f)) => float_to_int(f.ceil()),
        (BuiltinKind::Int, Value::Float(f)) => float_to_int(f.trunc()),
        (_, other) => Err(type_mismatch(kind.operand(), other)),
    }
}

/// Convert an integral float, failing when it has no `i64` counterpart.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "range is checked before the conversion"
)]
fn float_to_int(f: f64) -> EvalResult {
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Ok(Value::Int(f as i64))
    } else {
        Err(integer_overflow("conversion to integer"))
    }
}

fn to_string(target: &Value, args: &Args<'_>, ctx: BuiltinContext) -> EvalResult {
    match target {
        Value::Str(_) => {
            args.arity(0, 0)?;
            Ok(target.clone())
        }
        Value::Int(_) | Value::Float(_) => {
            args.arity(0, 1)?;
            match args.get(0) {
                None => computer_format(target, ctx),
                Some(_) => {
                    let pattern = args.str(0)?;
                    if pattern == "computer" || pattern == "c" {
                        return computer_format(target, ctx);
                    }
                    let f = target.as_f64().unwrap_or_default();
                    Ok(Value::string(format_decimal(f, pattern)?))
                }
            }
        }
        Value::Bool(b) => {
            args.arity(0, 2)?;
            if args.get(0).is_none() {
                return Ok(Value::from(if *b { "true" } else { "false" }));
            }
            args.arity(2, 2)?;
            let chosen = if *b { args.str(0)? } else { args.str(1)? };
            Ok(Value::from(chosen))
        }
        Value::Date(date) => {
            args.arity(0, 1)?;
            match args.get(0) {
                None => Ok(Value::string(date.render(ctx.time_zone))),
                Some(_) => {
                    let pattern = args.str(0)?;
                    date.format_with(pattern, ctx.time_zone)
                        .map(Value::string)
                        .ok_or_else(|| {
                            invalid_builtin_value(
                                "string",
                                format!("invalid date pattern `{pattern}`"),
                            )
                        })
                }
            }
        }
        other => Err(type_mismatch("string, number, boolean or date", other)),
    }
}

/// Locale-independent text: what `?c` and bare number interpolation print.
fn computer_format(target: &Value, ctx: BuiltinContext) -> EvalResult {
    match target {
        Value::Str(_) => Ok(target.clone()),
        Value::Int(_) | Value::Float(_) => Ok(Value::string(
            target.format_number().unwrap_or_default(),
        )),
        Value::Bool(b) => Ok(Value::from(if *b { "true" } else { "false" })),
        Value::Date(date) => Ok(Value::string(date.iso(ctx.time_zone))),
        other => Err(type_mismatch("string, number, boolean or date", other)),
    }
}

/// Decimal patterns such as `0.00` or `0.##`: `0` after the point is a
/// required digit, `#` an optional one.
fn format_decimal(f: f64, pattern: &str) -> Result<String, EvalError> {
    let fraction = pattern.split_once('.').map_or("", |(_, fraction)| fraction);
    if !pattern
        .chars()
        .all(|c| matches!(c, '0' | '#' | '.' | ','))
    {
        return Err(invalid_builtin_value(
            "string",
            format!("unsupported number pattern `{pattern}`"),
        ));
    }
    let required = fraction.chars().filter(|&c| c == '0').count();
    let precision = fraction.len();
    let mut text = format!("{f:.precision$}");
    if precision > required {
        let keep = text.len() - (precision - required);
        while text.len() > keep && text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
    }
    Ok(text)
}
