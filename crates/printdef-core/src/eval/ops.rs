//! Polymorphic semantics for every operator and non-macro catalogue function
//! (spec.md §4.6), grounded on `ps_math.c`.
//!
//! Macros (`if`, `extruderValue`, `extruderValues`, `resolveOrValue`) live in
//! [`super::macros`] instead — they see un-evaluated argument subtrees and
//! the evaluation context, while everything here operates on already-reduced
//! [`Value`]s.

use crate::error::{CoreError, RunResult};
use crate::value::{json, Kind, Value};

use super::context::EvalContext;

fn type_mismatch(message: impl Into<String>) -> CoreError {
    CoreError::TypeMismatch { message: message.into() }
}

/// `boolean < integer < float < string`, the rank table spec.md §4.6 names.
fn rank(kind: Kind) -> Option<u8> {
    match kind {
        Kind::Boolean => Some(0),
        Kind::Integer => Some(1),
        Kind::Float => Some(2),
        Kind::String => Some(3),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumKind {
    Boolean,
    Integer,
    Float,
}

/// Promotes `args` to a common numeric kind for arithmetic (`-`, `*`, `/`,
/// `**`): rejects `null` and any `string` outright (string is handled by the
/// caller, via `+`'s concat special-case, before this ever runs).
fn promote_numeric(args: &[Value]) -> RunResult<NumKind> {
    let mut best = NumKind::Boolean;
    for a in args {
        match a.type_of() {
            Kind::Boolean => {}
            Kind::Integer if best == NumKind::Boolean => best = NumKind::Integer,
            Kind::Integer => {}
            Kind::Float => best = NumKind::Float,
            _ => return Err(type_mismatch("arithmetic requires boolean, integer, or float operands")),
        }
    }
    Ok(best)
}

/// Promotes `args` for comparison (`<`, `>`, `<=`, `>=`): either every
/// argument is a string (byte compare), or every argument is
/// boolean/integer/float (promoted numeric compare) — never a mix, since the
/// reference's `strcmp` has no cross-type fallback.
fn promote_comparable(args: &[Value]) -> RunResult<Kind> {
    if args.iter().all(|a| a.type_of() == Kind::String) {
        return Ok(Kind::String);
    }
    let numeric = promote_numeric(args)?;
    Ok(match numeric {
        NumKind::Boolean => Kind::Boolean,
        NumKind::Integer => Kind::Integer,
        NumKind::Float => Kind::Float,
    })
}

const SQRT_INT64_MAX: i64 = 3_037_000_448;

/// Exact port of `IntExpt`'s exponentiation-by-squaring with its overflow
/// guard, falling back to `f64::powf` on overflow or a negative exponent.
pub fn int_pow(base: i64, exp: i64) -> Value {
    if exp < 0 {
        return Value::Float((base as f64).powf(exp as f64));
    }
    if base == 0 {
        return Value::Integer(if exp == 0 { 1 } else { 0 });
    }

    let bits = 64 - exp.leading_zeros();
    let mut val: i64 = 1;
    for bit in (0..bits).rev() {
        if val.abs() > SQRT_INT64_MAX {
            return Value::Float((base as f64).powf(exp as f64));
        }
        val *= val;

        if (exp >> bit) & 1 == 1 {
            if val.abs() > i64::MAX / base.abs() {
                return Value::Float((base as f64).powf(exp as f64));
            }
            val *= base;
        }
    }
    Value::Integer(val)
}

fn int_mul(a: i64, b: i64) -> Value {
    match a.checked_mul(b) {
        Some(v) => Value::Integer(v),
        None => Value::Float(a as f64 * b as f64),
    }
}

fn int_add(a: i64, b: i64) -> Value {
    match a.checked_add(b) {
        Some(v) => Value::Integer(v),
        None => Value::Float(a as f64 + b as f64),
    }
}

fn int_sub(a: i64, b: i64) -> Value {
    match a.checked_sub(b) {
        Some(v) => Value::Integer(v),
        None => Value::Float(a as f64 - b as f64),
    }
}

/// True division (the source's `IntDiv` is documented as buggy — spec.md
/// §9 — and this fixes it): exact quotients stay integers, inexact ones fall
/// back to float, and division by zero is a `TypeMismatch` rather than
/// letting the host's `/` misbehave.
fn int_div(a: i64, b: i64) -> RunResult<Value> {
    if b == 0 {
        return Err(type_mismatch("division by zero"));
    }
    if a % b == 0 {
        Ok(Value::Integer(a / b))
    } else {
        Ok(Value::Float(a as f64 / b as f64))
    }
}

fn render_for_concat(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => json::to_string(other, false),
    }
}

fn concat(a: &Value, b: &Value) -> Value {
    let mut out = render_for_concat(a);
    out.push_str(&render_for_concat(b));
    Value::String(out)
}

/// `+`: 1 or 2 args. The binary form concatenates as soon as either operand
/// is a string (spec.md §4.6); otherwise it's ordinary promoted addition. The
/// unary form never concatenates — a lone string is a `TypeMismatch`.
pub fn add(args: &[Value]) -> RunResult<Value> {
    if args.len() == 2 && (args[0].type_of() == Kind::String || args[1].type_of() == Kind::String) {
        return Ok(concat(&args[0], &args[1]));
    }

    match (args.len(), promote_numeric(args)?) {
        (1, NumKind::Float) => Ok(Value::Float(args[0].as_float())),
        (1, _) => Ok(Value::Integer(args[0].as_integer())),
        (2, NumKind::Float) => Ok(Value::Float(args[0].as_float() + args[1].as_float())),
        (2, _) => Ok(int_add(args[0].as_integer(), args[1].as_integer())),
        _ => Err(CoreError::ArityMismatch { name: "+".to_owned(), expected: "1 or 2".to_owned(), got: args.len() }),
    }
}

/// `-`: 1 or 2 args, unary negation or binary subtraction. No concat case —
/// the reference's `PS_Sub` has none.
pub fn sub(args: &[Value]) -> RunResult<Value> {
    match (args.len(), promote_numeric(args)?) {
        (1, NumKind::Float) => Ok(Value::Float(-args[0].as_float())),
        (1, _) => Ok(Value::Integer(-args[0].as_integer())),
        (2, NumKind::Float) => Ok(Value::Float(args[0].as_float() - args[1].as_float())),
        (2, _) => Ok(int_sub(args[0].as_integer(), args[1].as_integer())),
        _ => Err(CoreError::ArityMismatch { name: "-".to_owned(), expected: "1 or 2".to_owned(), got: args.len() }),
    }
}

pub fn mul(args: &[Value; 2]) -> RunResult<Value> {
    match promote_numeric(args)? {
        NumKind::Float => Ok(Value::Float(args[0].as_float() * args[1].as_float())),
        _ => Ok(int_mul(args[0].as_integer(), args[1].as_integer())),
    }
}

pub fn div(args: &[Value; 2]) -> RunResult<Value> {
    match promote_numeric(args)? {
        NumKind::Float => Ok(Value::Float(args[0].as_float() / args[1].as_float())),
        _ => int_div(args[0].as_integer(), args[1].as_integer()),
    }
}

pub fn expt(args: &[Value; 2]) -> RunResult<Value> {
    match promote_numeric(args)? {
        NumKind::Float => Ok(Value::Float(args[0].as_float().powf(args[1].as_float()))),
        _ => Ok(int_pow(args[0].as_integer(), args[1].as_integer())),
    }
}

#[derive(Debug, Clone, Copy)]
enum CmpOp {
    Lt,
    Gt,
    Le,
    Ge,
}

fn compare(op: CmpOp, args: &[Value; 2]) -> RunResult<Value> {
    let kind = promote_comparable(args)?;
    let ordering = if kind == Kind::String {
        args[0].get_string().unwrap_or_default().cmp(args[1].get_string().unwrap_or_default())
    } else {
        args[0]
            .as_float()
            .partial_cmp(&args[1].as_float())
            .ok_or_else(|| type_mismatch("comparison produced no ordering (NaN?)"))?
    };
    let result = match op {
        CmpOp::Lt => ordering.is_lt(),
        CmpOp::Gt => ordering.is_gt(),
        CmpOp::Le => ordering.is_le(),
        CmpOp::Ge => ordering.is_ge(),
    };
    Ok(Value::Boolean(result))
}

/// Promotion-based equality used by `==`/`!=` — distinct from `Value`'s
/// derived structural `PartialEq` (used for round-trip/idempotence
/// assertions). `null` only equals `null`; `Variable`s compare by name;
/// `List`/`Function`/`Object` recurse pairwise; everything else promotes
/// through the numeric/string rank table before comparing.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Variable(x), Value::Variable(y)) => x == y,
        (Value::Variable(_), _) | (_, Value::Variable(_)) => false,
        (Value::List(x), Value::List(y)) | (Value::Function(x), Value::Function(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(xi, yi)| values_equal(xi, yi))
        }
        (Value::List(_), _) | (Value::Function(_), _) => false,
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|((xk, xv), (yk, yv))| xk == yk && values_equal(xv, yv))
        }
        (Value::Object(_), _) => false,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::String(_), _) | (_, Value::String(_)) => false,
        _ => a.as_float() == b.as_float(),
    }
}

pub fn eq(args: &[Value; 2]) -> Value {
    Value::Boolean(values_equal(&args[0], &args[1]))
}

pub fn neq(args: &[Value; 2]) -> Value {
    Value::Boolean(!values_equal(&args[0], &args[1]))
}

fn require_boolean(v: &Value, who: &str) -> RunResult<bool> {
    match v {
        Value::Boolean(b) => Ok(*b),
        _ => Err(type_mismatch(format!("{who} requires boolean operands"))),
    }
}

pub fn not(args: &[Value; 1]) -> RunResult<Value> {
    Ok(Value::Boolean(!require_boolean(&args[0], "not")?))
}

/// Does not short-circuit — both operands are already-evaluated values by
/// the time this runs (spec.md §4.6; `if…else` is the macro that does).
pub fn or(args: &[Value; 2]) -> RunResult<Value> {
    Ok(Value::Boolean(require_boolean(&args[0], "or")? || require_boolean(&args[1], "or")?))
}

pub fn and(args: &[Value; 2]) -> RunResult<Value> {
    Ok(Value::Boolean(require_boolean(&args[0], "and")? && require_boolean(&args[1], "and")?))
}

/// Always produces a float, matching `PS_Round`'s unconditional
/// `PS_NewFloat` — even `round(3)` comes back as `Float(3.0)`.
pub fn round(args: &[Value]) -> RunResult<Value> {
    let x = args[0].as_float();
    if args.len() == 1 {
        return Ok(Value::Float(x.round()));
    }
    let digits = args[1].as_float();
    let scale = 10f64.powf(digits);
    Ok(Value::Float((x * scale).round() / scale))
}

fn reduce_pairwise(items: &[Value], op: impl Fn(&Value, &Value) -> RunResult<Value>) -> RunResult<Value> {
    let mut iter = items.iter();
    let mut acc = match iter.next() {
        Some(first) => first.clone(),
        None => return Err(type_mismatch("reduce over an empty list")),
    };
    for item in iter {
        acc = op(&acc, item)?;
    }
    Ok(acc)
}

fn two_arg_extreme(args: &[Value; 2], keep_first_when: CmpOp) -> RunResult<Value> {
    let take_first = matches!(compare(keep_first_when, args)?, Value::Boolean(true));
    Ok(if take_first { args[0].clone() } else { args[1].clone() })
}

/// `max(x, y)` / `max(list)`: the 2-arg form keeps whichever operand is
/// `>=` the other; the 1-arg list form reduces pairwise the same way.
pub fn max(args: &[Value]) -> RunResult<Value> {
    match args {
        [a, b] => two_arg_extreme(&[a.clone(), b.clone()], CmpOp::Ge),
        [Value::List(items)] | [Value::Function(items)] => {
            reduce_pairwise(items, |a, b| two_arg_extreme(&[a.clone(), b.clone()], CmpOp::Ge))
        }
        [_] => Err(type_mismatch("max over a single argument requires a list")),
        _ => Err(CoreError::ArityMismatch { name: "max".to_owned(), expected: "1 or 2".to_owned(), got: args.len() }),
    }
}

pub fn min(args: &[Value]) -> RunResult<Value> {
    match args {
        [a, b] => two_arg_extreme(&[a.clone(), b.clone()], CmpOp::Le),
        [Value::List(items)] | [Value::Function(items)] => {
            reduce_pairwise(items, |a, b| two_arg_extreme(&[a.clone(), b.clone()], CmpOp::Le))
        }
        [_] => Err(type_mismatch("min over a single argument requires a list")),
        _ => Err(CoreError::ArityMismatch { name: "min".to_owned(), expected: "1 or 2".to_owned(), got: args.len() }),
    }
}

pub fn sum(args: &[Value; 1]) -> RunResult<Value> {
    match &args[0] {
        Value::List(items) | Value::Function(items) => reduce_pairwise(items, |a, b| add(&[a.clone(), b.clone()])),
        _ => Err(type_mismatch("sum requires a list")),
    }
}

pub fn int_fn(args: &[Value; 1]) -> Value {
    Value::Integer(args[0].as_float() as i64)
}

pub fn math_ceil(args: &[Value; 1]) -> Value {
    Value::Float(args[0].as_float().ceil())
}

pub fn math_floor(args: &[Value; 1]) -> Value {
    Value::Float(args[0].as_float().floor())
}

pub fn math_log(args: &[Value; 1]) -> Value {
    Value::Float(args[0].as_float().ln())
}

pub fn math_radians(args: &[Value; 1]) -> Value {
    Value::Float(args[0].as_float() * std::f64::consts::PI / 180.0)
}

pub fn math_sqrt(args: &[Value; 1]) -> Value {
    Value::Float(args[0].as_float().sqrt())
}

pub fn math_tan(args: &[Value; 1]) -> Value {
    Value::Float(args[0].as_float().tan())
}

/// Dispatches a non-macro catalogue entry over already-evaluated `args`.
/// `ctx` is only consulted by `defaultExtruderPosition`; every other entry
/// is a pure function of its arguments.
pub fn call(name: &str, args: &[Value], ctx: &EvalContext) -> RunResult<Value> {
    match (name, args) {
        ("+", _) => add(args),
        ("-", _) => sub(args),
        ("*", [a, b]) => mul(&[a.clone(), b.clone()]),
        ("/", [a, b]) => div(&[a.clone(), b.clone()]),
        ("**", [a, b]) => expt(&[a.clone(), b.clone()]),
        ("<", [a, b]) => compare(CmpOp::Lt, &[a.clone(), b.clone()]),
        (">", [a, b]) => compare(CmpOp::Gt, &[a.clone(), b.clone()]),
        ("<=", [a, b]) => compare(CmpOp::Le, &[a.clone(), b.clone()]),
        (">=", [a, b]) => compare(CmpOp::Ge, &[a.clone(), b.clone()]),
        ("==", [a, b]) => Ok(eq(&[a.clone(), b.clone()])),
        ("!=", [a, b]) => Ok(neq(&[a.clone(), b.clone()])),
        ("not", [a]) => not(&[a.clone()]),
        ("or", [a, b]) => or(&[a.clone(), b.clone()]),
        ("and", [a, b]) => and(&[a.clone(), b.clone()]),
        ("defaultExtruderPosition", []) => Ok(Value::Integer(ctx.default_extruder_position())),
        ("int", [a]) => Ok(int_fn(&[a.clone()])),
        ("math.ceil", [a]) => Ok(math_ceil(&[a.clone()])),
        ("math.floor", [a]) => Ok(math_floor(&[a.clone()])),
        ("math.log", [a]) => Ok(math_log(&[a.clone()])),
        ("math.radians", [a]) => Ok(math_radians(&[a.clone()])),
        ("math.sqrt", [a]) => Ok(math_sqrt(&[a.clone()])),
        ("math.tan", [a]) => Ok(math_tan(&[a.clone()])),
        ("max", _) => max(args),
        ("min", _) => min(args),
        ("round", _) => round(args),
        ("sum", [a]) => sum(&[a.clone()]),
        _ => Err(CoreError::ArityMismatch { name: name.to_owned(), expected: "(catalogue)".to_owned(), got: args.len() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_concatenates_when_either_operand_is_a_string() {
        let result = add(&[Value::string("v"), Value::Integer(3)]).unwrap();
        assert_eq!(result, Value::String("v3".to_owned()));
    }

    #[test]
    fn unary_minus_on_a_string_is_a_type_mismatch() {
        assert!(sub(&[Value::string("x")]).is_err());
    }

    #[test]
    fn int_pow_overflows_to_float() {
        assert_eq!(int_pow(2, 70), Value::Float(2f64.powi(70)));
        assert_eq!(int_pow(2, 10), Value::Integer(1024));
    }

    #[test]
    fn int_div_fixes_the_reference_bug() {
        assert_eq!(div(&[Value::Integer(7), Value::Integer(2)]).unwrap(), Value::Float(3.5));
        assert_eq!(div(&[Value::Integer(6), Value::Integer(2)]).unwrap(), Value::Integer(3));
        assert!(div(&[Value::Integer(1), Value::Integer(0)]).is_err());
    }

    #[test]
    fn equality_promotes_scalars_but_not_null() {
        assert!(values_equal(&Value::Boolean(true), &Value::Integer(1)));
        assert!(!values_equal(&Value::Null, &Value::Integer(0)));
        assert!(values_equal(&Value::Null, &Value::Null));
    }

    #[test]
    fn comparison_rejects_mixed_string_and_number() {
        assert!(compare(CmpOp::Lt, &[Value::string("a"), Value::Integer(1)]).is_err());
    }

    #[test]
    fn max_and_min_reduce_a_list_pairwise() {
        let list = Value::List(vec![Value::Integer(3), Value::Integer(7), Value::Integer(1)]);
        assert_eq!(max(&[list.clone()]).unwrap(), Value::Integer(7));
        assert_eq!(min(&[list]).unwrap(), Value::Integer(1));
    }

    #[test]
    fn round_always_returns_float() {
        assert_eq!(round(&[Value::Integer(3)]).unwrap(), Value::Float(3.0));
        assert_eq!(round(&[Value::Float(3.14159), Value::Integer(2)]).unwrap(), Value::Float(3.14));
    }
}
