//! Binary and unary operators over [`Value`].
//!
//! The operand set is closed, so dispatch is a direct match on the pair of
//! variants. `&&` and `||` short-circuit and live in the evaluator.
//!
//! No implicit conversions except the documented one: `+` with a string on
//! either side formats the other operand (number or date) and concatenates.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono_tz::Tz;
use quill_ir::{BinaryOp, UnaryOp};
use quill_value::{
    division_by_zero, integer_overflow, invalid_operands, EvalError, EvalResult, HashValue, Value,
};

#[inline]
fn checked_arith(result: Option<i64>, op_name: &'static str) -> EvalResult {
    result.map(Value::Int).ok_or_else(|| integer_overflow(op_name))
}

/// Evaluate a non-logical binary operator.
pub(crate) fn evaluate_binary(left: &Value, right: &Value, op: BinaryOp, tz: Tz) -> EvalResult {
    match op {
        BinaryOp::Eq => values_equal(left, right, op).map(Value::Bool),
        BinaryOp::NotEq => values_equal(left, right, op).map(|eq| Value::Bool(!eq)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = compare(left, right, op)?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::LtEq => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::Add => add(left, right, tz),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(left, right, op)
        }
        BinaryOp::And | BinaryOp::Or => Err(invalid_operands(op.as_symbol(), left, right)),
    }
}

fn add(left: &Value, right: &Value, tz: Tz) -> EvalResult {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::string(format!("{a}{b}"))),
        (Value::Str(a), other) => match concat_operand(other, tz) {
            Some(b) => Ok(Value::string(format!("{a}{b}"))),
            None => Err(invalid_operands("+", left, right)),
        },
        (other, Value::Str(b)) => match concat_operand(other, tz) {
            Some(a) => Ok(Value::string(format!("{a}{b}"))),
            None => Err(invalid_operands("+", left, right)),
        },
        (Value::Seq(a), Value::Seq(b)) => {
            let mut items = Vec::with_capacity(a.len() + b.len());
            items.extend(a.iter().cloned());
            items.extend(b.iter().cloned());
            Ok(Value::seq(items))
        }
        (Value::Hash(a), Value::Hash(b)) => {
            let mut merged: HashValue = a.iter().map(|(k, v)| (Arc::clone(k), v.clone())).collect();
            for (k, v) in b.iter() {
                merged.insert(Arc::clone(k), v.clone());
            }
            Ok(Value::hash(merged))
        }
        _ => arithmetic(left, right, BinaryOp::Add),
    }
}

fn concat_operand(value: &Value, tz: Tz) -> Option<String> {
    match value {
        Value::Int(_) | Value::Float(_) => value.format_number(),
        Value::Date(date) => Some(date.render(tz)),
        _ => None,
    }
}

fn arithmetic(left: &Value, right: &Value, op: BinaryOp) -> EvalResult {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_arithmetic(*a, *b, op),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => float_arithmetic(a, b, op),
            _ => Err(invalid_operands(op.as_symbol(), left, right)),
        },
    }
}

fn int_arithmetic(a: i64, b: i64, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Add => checked_arith(a.checked_add(b), "addition"),
        BinaryOp::Sub => checked_arith(a.checked_sub(b), "subtraction"),
        BinaryOp::Mul => checked_arith(a.checked_mul(b), "multiplication"),
        BinaryOp::Div => {
            if b == 0 {
                return Err(division_by_zero());
            }
            // Division is exact: a remainder makes the result a float.
            match a.checked_rem(b) {
                Some(0) => checked_arith(a.checked_div(b), "division"),
                Some(_) => {
                    #[expect(
                        clippy::cast_precision_loss,
                        reason = "inexact division yields a float by definition"
                    )]
                    let quotient = a as f64 / b as f64;
                    Ok(Value::Float(quotient))
                }
                None => Err(integer_overflow("division")),
            }
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(division_by_zero());
            }
            checked_arith(a.checked_rem(b), "remainder")
        }
        _ => Err(invalid_operands(
            op.as_symbol(),
            &Value::Int(a),
            &Value::Int(b),
        )),
    }
}

fn float_arithmetic(a: f64, b: f64, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Add => Ok(Value::Float(a + b)),
        BinaryOp::Sub => Ok(Value::Float(a - b)),
        BinaryOp::Mul => Ok(Value::Float(a * b)),
        BinaryOp::Div if b == 0.0 => Err(division_by_zero()),
        BinaryOp::Div => Ok(Value::Float(a / b)),
        BinaryOp::Mod if b == 0.0 => Err(division_by_zero()),
        BinaryOp::Mod => Ok(Value::Float(a % b)),
        _ => Err(invalid_operands(
            op.as_symbol(),
            &Value::Float(a),
            &Value::Float(b),
        )),
    }
}

/// `==` between two values of the same category; comparing across
/// categories is an error, not `false`.
pub(crate) fn values_equal(left: &Value, right: &Value, op: BinaryOp) -> Result<bool, EvalError> {
    if left.is_number() && right.is_number() {
        return Ok(left == right);
    }
    if left.type_name() != right.type_name() {
        return Err(invalid_operands(op.as_symbol(), left, right));
    }
    Ok(left == right)
}

/// Ordering for `<`, `<=`, `>`, `>=` and sorting: numbers, strings and dates.
pub(crate) fn compare(left: &Value, right: &Value, op: BinaryOp) -> Result<Ordering, EvalError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Ok(a.instant().cmp(&b.instant())),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal)),
            _ => Err(invalid_operands(op.as_symbol(), left, right)),
        },
    }
}

pub(crate) fn evaluate_unary(op: UnaryOp, operand: &Value) -> EvalResult {
    match (op, operand) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, Value::Int(n)) => checked_arith(n.checked_neg(), "negation"),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Plus, Value::Int(_) | Value::Float(_)) => Ok(operand.clone()),
        _ => Err(quill_value::type_mismatch(
            if op == UnaryOp::Not { "boolean" } else { "number" },
            operand,
        )),
    }
}
