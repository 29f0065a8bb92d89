//! The four catalogue entries that see un-evaluated argument subtrees plus
//! the evaluation context (spec.md §4.4, §4.6), grounded on `ps_math.c`'s
//! `PS_ThenIfElse`/`PS_ResolveOrValue`/`PS_ExtruderValue`/`PS_ExtruderValues`.

use crate::error::{CoreError, RunResult};
use crate::value::Value;

use super::context::EvalContext;
use super::eval_expr;

fn type_mismatch(message: impl Into<String>) -> CoreError {
    CoreError::TypeMismatch { message: message.into() }
}

pub fn eval_macro(name: &str, items: &[Value], ctx: &mut EvalContext) -> RunResult<Value> {
    match name {
        "if" => then_if_else(items, ctx),
        "resolveOrValue" => resolve_or_value(items, ctx),
        "extruderValue" => extruder_value(items, ctx),
        "extruderValues" => extruder_values(items, ctx),
        _ => Err(CoreError::UnknownName { name: name.to_owned() }),
    }
}

/// `if(then, cond, else)` — the ternary's desugared form. Short-circuits:
/// only the taken branch is ever evaluated.
fn then_if_else(items: &[Value], ctx: &mut EvalContext) -> RunResult<Value> {
    let cond = eval_expr(&items[2], ctx)?;
    let branch = if cond.as_boolean() { &items[1] } else { &items[3] };
    eval_expr(branch, ctx)
}

/// `resolveOrValue(setting)` — the reparsed argument already carries its
/// own (current-scope-narrowed) dependency set; evaluating it is just a
/// normal sub-evaluation in the current scope.
fn resolve_or_value(items: &[Value], ctx: &mut EvalContext) -> RunResult<Value> {
    eval_expr(&items[1], ctx)
}

/// `extruderValue(ext, setting)` — evaluates `ext` in the current scope,
/// pushes it as the active scope, evaluates `setting` there, then pops.
fn extruder_value(items: &[Value], ctx: &mut EvalContext) -> RunResult<Value> {
    let ext = eval_expr(&items[1], ctx)?;
    let ext_name = ext
        .get_string()
        .ok_or_else(|| type_mismatch("extruderValue's extruder name must evaluate to a string"))?
        .to_owned();

    ctx.push_scope(ext_name);
    let result = eval_expr(&items[2], ctx);
    ctx.pop_scope();
    result
}

/// `extruderValues(setting)` — reads `setting` directly (not through
/// `eval_expr`; the reference's `PS_CtxLookupAll` is a raw lookup, not a
/// recursive evaluation) in every extruder scope, in sorted order.
fn extruder_values(items: &[Value], ctx: &mut EvalContext) -> RunResult<Value> {
    let name = match &items[1] {
        Value::Variable(name) => name.clone(),
        _ => return Err(type_mismatch("extruderValues requires a setting name")),
    };

    let scopes: Vec<String> = ctx.extruder_scopes().into_iter().map(str::to_owned).collect();
    let mut out = Vec::with_capacity(scopes.len());
    for scope in scopes {
        let v = ctx.raw_lookup(&scope, &name).ok_or_else(|| CoreError::UnknownName { name: name.clone() })?;
        out.push(v);
    }
    Ok(Value::List(out))
}
