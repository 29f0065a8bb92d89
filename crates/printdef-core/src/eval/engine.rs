//! The work-queue driven topological evaluator (spec.md §4.5), grounded on
//! `printer_settings.c`'s `PS_EvalAll`/`EvalCtx`.

use std::collections::{HashSet, VecDeque};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{CoreError, RunResult};
use crate::value::{Kind, OrderedMap, Value};

use super::context::EvalContext;
use super::eval_expr;
use super::ops::values_equal;

/// A hard bound on total evaluations; exceeding it means some chain of
/// `#trigger`s is cyclic and would otherwise never drain the queue.
const MAX_EVALUATIONS: usize = 100_000;

/// The per-scope `setting → default_value` snapshot evaluation starts from,
/// mirroring `PS_GetDefaults`. Settings with no `default_value` are absent.
pub fn defaults_snapshot(printer: &Value) -> Value {
    let mut scopes = OrderedMap::new();
    if let Some(printer_obj) = printer.as_object() {
        for (scope, scope_value) in printer_obj.iter() {
            let mut defaults = OrderedMap::new();
            if let Some(set) = scope_value.get_member("#set").and_then(Value::as_object) {
                for (name, props) in set.iter() {
                    if let Some(default_value) = props.get_member("default_value") {
                        defaults.insert(name, default_value.clone());
                    }
                }
            }
            scopes.insert(scope, Value::Object(defaults));
        }
    }
    Value::Object(scopes)
}

fn setting_props<'v>(printer: &'v Value, scope: &str, name: &str) -> Option<&'v Value> {
    printer.get_member(scope)?.get_member("#set")?.get_member(name)
}

/// spec.md §4.7's declared-`type` → accepted-kind table. An unrecognized or
/// absent declared type passes through unchecked.
fn passes_type_check(declared: Option<&str>, result: &Value) -> bool {
    let Some(declared) = declared else { return true };
    match declared {
        "str" | "enum" | "extruder" | "optional_extruder" => result.type_of() == Kind::String,
        "bool" => result.type_of() == Kind::Boolean,
        "int" | "float" => matches!(result.type_of(), Kind::Integer | Kind::Float),
        s if s.starts_with('[') || s == "polygons" => result.type_of() == Kind::List,
        _ => true,
    }
}

fn diagnostic_for_eval_error(scope: &str, setting: &str, err: CoreError) -> Diagnostic {
    match err {
        CoreError::UnknownName { name } => {
            Diagnostic::UnknownName { scope: scope.to_owned(), setting: setting.to_owned(), name }
        }
        other => Diagnostic::EvalError { scope: scope.to_owned(), setting: setting.to_owned(), message: other.to_string() },
    }
}

fn enqueue(queue: &mut VecDeque<(String, String)>, pending: &mut HashSet<(String, String)>, scope: &str, name: &str) {
    let key = (scope.to_owned(), name.to_owned());
    if pending.insert(key.clone()) {
        queue.push_back(key);
    }
}

/// Runs the dependency-ordered fixed-point evaluation described by spec.md
/// §4.5 and returns the fully-threaded `over` (the resolved bundle).
///
/// `hard` marks which `(scope, setting)` pairs are user-pinned and must
/// never be queued or overwritten; `over` is `hard`'s starting value and is
/// the thing this function mutates and ultimately returns.
pub fn evaluate_all(printer: &Value, hard: &Value, over: Value, diagnostics: &mut Diagnostics) -> RunResult<Value> {
    let dflt = defaults_snapshot(printer);
    let mut ctx = EvalContext::new(hard, over, &dflt);

    let mut queue = VecDeque::new();
    let mut pending = HashSet::new();

    if let Some(printer_obj) = printer.as_object() {
        for (scope, scope_value) in printer_obj.iter() {
            let Some(set) = scope_value.get_member("#set").and_then(Value::as_object) else {
                continue;
            };
            for (name, props) in set.iter() {
                if props.get_member("#eval").is_none() {
                    continue;
                }
                if ctx.is_hard(scope, name) {
                    continue;
                }
                enqueue(&mut queue, &mut pending, scope, name);
            }
        }
    }

    let mut evaluations = 0usize;
    while let Some((scope, name)) = queue.pop_front() {
        pending.remove(&(scope.clone(), name.clone()));

        evaluations += 1;
        if evaluations > MAX_EVALUATIONS {
            return Err(CoreError::CycleSuspected { evaluations });
        }

        let Some(props) = setting_props(printer, &scope, &name) else { continue };
        let Some(eval_tree) = props.get_member("#eval").cloned() else { continue };

        ctx.push_scope(scope.clone());
        let outcome = eval_expr(&eval_tree, &mut ctx);
        ctx.pop_scope();

        let result = match outcome {
            Ok(v) => v,
            Err(err) => {
                diagnostics.push(diagnostic_for_eval_error(&scope, &name, err));
                continue;
            }
        };

        let default_value = props.get_member("default_value");
        let is_default = default_value.is_some_and(|d| values_equal(&result, d));

        if is_default {
            ctx.clear_over(&scope, &name);
        } else {
            let declared = props.get_member("type").and_then(Value::get_string);
            if passes_type_check(declared, &result) {
                ctx.set_over(&scope, &name, result);
            } else {
                ctx.clear_over(&scope, &name);
                if let Some(declared_type) = declared {
                    diagnostics.push(Diagnostic::TypeMismatch {
                        scope: scope.clone(),
                        setting: name.clone(),
                        declared_type: declared_type.to_owned(),
                    });
                }
            }
        }

        let Some(triggers) = props.get_member("#trigger").and_then(Value::as_object) else {
            continue;
        };
        for (trig_scope, names) in triggers.iter() {
            let Some(names_obj) = names.as_object() else { continue };
            for (trig_name, _) in names_obj.iter() {
                enqueue(&mut queue, &mut pending, trig_scope, trig_name);
            }
        }
    }

    Ok(ctx.into_over())
}
