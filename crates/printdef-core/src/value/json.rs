//! Bridge to `serde_json` (the sanctioned external JSON tokenizer) plus a
//! writer that reproduces the reference implementation's rendering rules:
//! key-sorted objects, `%.15g`-equivalent floats, unquoted (bareword)
//! variables, and `name(args,...)` function application syntax.

use std::fmt::Write as _;
use std::io;

use serde_json::Value as JsonValue;

use crate::error::CoreError;

use super::{OrderedMap, Value};

/// Parses a JSON document into our value tree. `path` is used only to
/// annotate a parse failure.
pub fn parse(path: &str, text: &str) -> Result<Value, CoreError> {
    let parsed: JsonValue = serde_json::from_str(text)
        .map_err(|err| CoreError::JsonParse { path: path.to_owned(), message: err.to_string() })?;
    Ok(from_serde(parsed))
}

pub fn from_serde(json: JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Boolean(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64().unwrap_or(0.0)),
        },
        JsonValue::String(s) => Value::String(s),
        JsonValue::Array(items) => Value::List(items.into_iter().map(from_serde).collect()),
        JsonValue::Object(entries) => {
            let mut map = OrderedMap::new();
            for (key, value) in entries {
                map.insert(key, from_serde(value));
            }
            Value::Object(map)
        }
    }
}

/// Renders `value` as JSON text. Variables render as barewords and
/// functions as `name(args,...)` — neither is valid JSON on its own, but
/// both appear only inside `#eval` trees that callers don't normally
/// serialize; resolved output never contains them.
pub fn to_string(value: &Value, pretty: bool) -> String {
    let mut out = String::new();
    write_value(&mut out, value, if pretty { Some(0) } else { None });
    out
}

pub fn write_to(writer: &mut dyn io::Write, value: &Value, pretty: bool) -> io::Result<()> {
    writer.write_all(to_string(value, pretty).as_bytes())
}

fn write_value(out: &mut String, value: &Value, indent: Option<usize>) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Integer(i) => {
            let _ = write!(out, "{i}");
        }
        Value::Float(f) => out.push_str(&format_g15(*f)),
        Value::String(s) => write_quoted(out, s),
        Value::Variable(s) => write_bareword(out, s),
        Value::List(items) => write_list(out, items, indent),
        Value::Function(items) => write_function(out, items, indent),
        Value::Object(map) => write_object(out, map, indent),
    }
}

fn write_list(out: &mut String, items: &[Value], indent: Option<usize>) {
    if items.is_empty() {
        out.push_str("[]");
        return;
    }
    out.push('[');
    let inner = indent.map(|lvl| lvl + 1);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        newline_indent(out, inner);
        write_value(out, item, inner);
    }
    newline_indent(out, indent);
    out.push(']');
}

fn write_function(out: &mut String, items: &[Value], indent: Option<usize>) {
    match items.first().and_then(Value::get_string) {
        Some(name) => write_bareword(out, name),
        None => {
            if let Some(first) = items.first() {
                write_value(out, first, indent);
            }
        }
    }
    out.push('(');
    for (i, arg) in items.iter().skip(1).enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_value(out, arg, indent);
    }
    out.push(')');
}

fn write_object(out: &mut String, map: &OrderedMap<Value>, indent: Option<usize>) {
    if map.is_empty() {
        out.push_str("{}");
        return;
    }
    out.push('{');
    let inner = indent.map(|lvl| lvl + 1);
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        newline_indent(out, inner);
        write_quoted(out, key);
        out.push(':');
        if inner.is_some() {
            out.push(' ');
        }
        write_value(out, value, inner);
    }
    newline_indent(out, indent);
    out.push('}');
}

fn newline_indent(out: &mut String, indent: Option<usize>) {
    if let Some(level) = indent {
        out.push('\n');
        for _ in 0..level * 2 {
            out.push(' ');
        }
    }
}

fn write_escaped_body(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
}

fn write_quoted(out: &mut String, s: &str) {
    out.push('"');
    write_escaped_body(out, s);
    out.push('"');
}

fn write_bareword(out: &mut String, s: &str) {
    write_escaped_body(out, s);
}

/// Formats `value` the way the reference writer's `%.15g` does: 15
/// significant digits, fixed notation when the exponent is in `[-4, 15)`,
/// scientific notation (with an explicit sign and zero-padded exponent)
/// otherwise, trailing fractional zeros trimmed.
pub fn format_g15(value: f64) -> String {
    const PRECISION: i32 = 15;

    if value == 0.0 {
        return if value.is_sign_negative() { "-0".to_owned() } else { "0".to_owned() };
    }
    if value.is_nan() {
        return "NaN".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity".to_owned() } else { "-Infinity".to_owned() };
    }

    let sci = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let (mantissa, exp_str) = sci.split_once('e').expect("scientific notation always has an exponent");
    let exp: i32 = exp_str.parse().expect("exponent is always a valid integer");

    if (-4..PRECISION).contains(&exp) {
        let decimals = (PRECISION - 1 - exp).max(0) as usize;
        trim_trailing_zeros(&format!("{value:.decimals$}"))
    } else {
        let mantissa = trim_trailing_zeros(mantissa);
        format!("{mantissa}e{}{:02}", if exp < 0 { "-" } else { "+" }, exp.abs())
    }
}

fn trim_trailing_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_owned();
    }
    s.trim_end_matches('0').trim_end_matches('.').to_owned()
}
