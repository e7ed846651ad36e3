//! String builtins: case, search, splitting, parsing, escaping and regular
//! expressions.

use std::fmt::Write as _;
use std::sync::Arc;

use quill_ir::BuiltinKind;
use quill_value::{invalid_builtin_value, invalid_regex, EvalResult, MatchValue, Value};
use regex::{Regex, RegexBuilder};

use super::Args;

/// Compiled-size ceiling for template-supplied patterns.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

pub(super) fn apply(kind: BuiltinKind, s: &str, args: &Args<'_>) -> EvalResult {
    match kind {
        BuiltinKind::Contains
        | BuiltinKind::StartsWith
        | BuiltinKind::EndsWith
        | BuiltinKind::Split
        | BuiltinKind::IndexOf
        | BuiltinKind::Matches => args.arity(1, 1)?,
        BuiltinKind::Replace => args.arity(2, 2)?,
        _ => args.arity(0, 0)?,
    }
    let text = |s: String| Ok(Value::string(s));
    match kind {
        BuiltinKind::UpperCase => text(s.to_uppercase()),
        BuiltinKind::LowerCase => text(s.to_lowercase()),
        BuiltinKind::CapFirst => text(map_first_letter(s, true)),
        BuiltinKind::UncapFirst => text(map_first_letter(s, false)),
        BuiltinKind::Capitalize => text(capitalize(s)),
        BuiltinKind::Trim => text(s.trim().to_owned()),
        BuiltinKind::Length => Ok(Value::Int(char_count(s))),
        BuiltinKind::Contains => Ok(Value::Bool(s.contains(args.str(0)?))),
        BuiltinKind::StartsWith => Ok(Value::Bool(s.starts_with(args.str(0)?))),
        BuiltinKind::EndsWith => Ok(Value::Bool(s.ends_with(args.str(0)?))),
        BuiltinKind::Replace => text(s.replace(args.str(0)?, args.str(1)?)),
        BuiltinKind::Split => {
            let separator = args.str(0)?;
            let parts: Vec<Value> = if separator.is_empty() {
                s.chars().map(|c| Value::string(c.to_string())).collect()
            } else {
                s.split(separator).map(Value::from).collect()
            };
            Ok(Value::seq(parts))
        }
        BuiltinKind::IndexOf => Ok(Value::Int(
            s.find(args.str(0)?).map_or(-1, |byte| char_count(&s[..byte])),
        )),
        BuiltinKind::Number => parse_number(s),
        BuiltinKind::Boolean => match s {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid_builtin_value(
                "boolean",
                format!("`{s}` is neither `true` nor `false`"),
            )),
        },
        BuiltinKind::Html => text(escape_markup(s, "&#39;")),
        BuiltinKind::Xml => text(escape_markup(s, "&apos;")),
        BuiltinKind::Url => text(escape_url(s)),
        BuiltinKind::JsString => text(escape_js(s)),
        BuiltinKind::JsonString => text(escape_json(s)),
        BuiltinKind::Matches => regex_match(s, args.str(0)?),
        _ => Err(invalid_builtin_value(kind.name(), "not a string builtin")),
    }
}

fn char_count(s: &str) -> i64 {
    i64::try_from(s.chars().count()).unwrap_or(i64::MAX)
}

fn map_first_letter(s: &str, upper: bool) -> String {
    let start = s.len() - s.trim_start().len();
    let mut rest = s[start..].chars();
    let Some(first) = rest.next() else {
        return s.to_owned();
    };
    let mut out = String::with_capacity(s.len());
    out.push_str(&s[..start]);
    if upper {
        out.extend(first.to_uppercase());
    } else {
        out.extend(first.to_lowercase());
    }
    out.push_str(rest.as_str());
    out
}

/// Upper-case the first letter of every whitespace-separated word.
fn capitalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            at_word_start = false;
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_number(s: &str) -> EvalResult {
    let trimmed = s.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(Value::Int(n));
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(Value::Float(f)),
        _ => Err(invalid_builtin_value(
            "number",
            format!("`{s}` is not a number"),
        )),
    }
}

fn escape_markup(s: &str, apostrophe: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str(apostrophe),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-encode everything but RFC 3986 unreserved characters.
fn escape_url(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

fn escape_js(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '<' => out.push_str("\\x3C"),
            '>' => out.push_str("\\x3E"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", u32::from(c));
            }
            _ => out.push(c),
        }
    }
    out
}

fn escape_json(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut previous = '\0';
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            // `</` would end an enclosing script element.
            '/' if previous == '<' => out.push_str("\\/"),
            c if u32::from(c) < 0x20 => {
                let _ = write!(out, "\\u{:04X}", u32::from(c));
            }
            _ => out.push(c),
        }
        previous = c;
    }
    out
}

fn compile(pattern: &str) -> Result<Regex, quill_value::EvalError> {
    RegexBuilder::new(pattern)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|e| invalid_regex(pattern, e.to_string()))
}

/// `?matches(pattern)`: every match with its groups, plus whether the
/// pattern matches the whole string.
fn regex_match(s: &str, pattern: &str) -> EvalResult {
    let regex = compile(pattern)?;
    let anchored = compile(&format!("^(?:{pattern})$"))?;
    let matches = regex
        .captures_iter(s)
        .map(|caps| {
            caps.iter()
                .map(|group| group.map(|m| Arc::from(m.as_str())))
                .collect()
        })
        .collect();
    Ok(Value::Match(Arc::new(MatchValue {
        entire: anchored.is_match(s),
        matches,
    })))
}
