//! The dependency-ordered evaluation engine (spec.md §4.5) and the
//! polymorphic operator/macro semantics (§4.4, §4.6) it dispatches to.

pub mod context;
pub mod engine;
pub mod macros;
pub mod ops;

pub use context::EvalContext;
pub use engine::evaluate_all;

use crate::error::{CoreError, RunResult};
use crate::expr::catalogue::{self, Category};
use crate::value::Value;

/// Evaluates one `#eval` tree in `ctx`. Only `Variable` and `Function`
/// nodes recurse — every other shape is a literal and is copied verbatim,
/// mirroring the reference's `PS_Eval` switch.
pub fn eval_expr(expr: &Value, ctx: &mut EvalContext) -> RunResult<Value> {
    match expr {
        Value::Variable(name) => ctx.resolve(name),
        Value::Function(items) => {
            let name = items
                .first()
                .and_then(Value::get_string)
                .ok_or_else(|| CoreError::TypeMismatch { message: "function node missing a callee name".to_owned() })?
                .to_owned();

            match catalogue::category(&name) {
                Some(Category::Macro) => macros::eval_macro(&name, items, ctx),
                Some(_) => {
                    let mut args = Vec::with_capacity(items.len() - 1);
                    for arg in &items[1..] {
                        args.push(eval_expr(arg, ctx)?);
                    }
                    ops::call(&name, &args, ctx)
                }
                None => Err(CoreError::UnknownName { name }),
            }
        }
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::OrderedMap;

    fn obj(entries: Vec<(&str, Value)>) -> Value {
        let mut map = OrderedMap::new();
        for (k, v) in entries {
            map.insert(k, v);
        }
        Value::Object(map)
    }

    #[test]
    fn literal_composites_pass_through_without_recursing() {
        let hard = obj(vec![]);
        let dflt = obj(vec![("#global", obj(vec![]))]);
        let mut ctx = EvalContext::new(&hard, obj(vec![]), &dflt);
        let list = Value::List(vec![Value::variable("unresolved"), Value::Integer(1)]);
        assert_eq!(eval_expr(&list, &mut ctx).unwrap(), list);
    }

    #[test]
    fn precedence_scenario_evaluates_to_the_documented_results() {
        let hard = obj(vec![]);
        let dflt = obj(vec![("#global", obj(vec![("test", Value::Integer(2))]))]);
        let mut ctx = EvalContext::new(&hard, obj(vec![]), &dflt);
        let (expr, _deps) = crate::expr::parse_setting_expr(
            &Value::string("5 + 3*4**test+2*3"),
            "#global",
            &[],
        )
        .unwrap();
        assert_eq!(eval_expr(&expr, &mut ctx).unwrap(), Value::Integer(59));
    }
}
