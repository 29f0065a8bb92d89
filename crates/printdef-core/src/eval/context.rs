//! Per-evaluation mutable state: pinned overrides, resolved values, defaults,
//! constants, and the extruder scope stack (spec.md §3 "Evaluation context").

use crate::error::{CoreError, RunResult};
use crate::value::{OrderedMap, Value};

pub const GLOBAL_SCOPE: &str = "#global";

/// Owns the three scope-shaped objects plus the extruder stack that a single
/// `evalAll` call threads through expression evaluation.
///
/// `hard` and `dflt` are read-only snapshots taken at the start of
/// evaluation; `over` is the one thing evaluation mutates.
pub struct EvalContext<'a> {
    hard: &'a Value,
    over: Value,
    dflt: &'a Value,
    constants: OrderedMap<Value>,
    ext_stack: Vec<String>,
}

fn scope_member<'v>(scope_shaped: &'v Value, scope: &str) -> Option<&'v Value> {
    scope_shaped.get_member(scope)
}

impl<'a> EvalContext<'a> {
    pub fn new(hard: &'a Value, over: Value, dflt: &'a Value) -> Self {
        let mut constants = OrderedMap::new();
        constants.insert("math.pi", Value::Float(std::f64::consts::PI));

        let first_scope = dflt
            .as_object()
            .and_then(|map| map.keys().next())
            .unwrap_or(GLOBAL_SCOPE)
            .to_owned();

        Self { hard, over, dflt, constants, ext_stack: vec![first_scope] }
    }

    pub fn current_scope(&self) -> &str {
        self.ext_stack.last().map(String::as_str).unwrap_or(GLOBAL_SCOPE)
    }

    pub fn push_scope(&mut self, scope: impl Into<String>) {
        self.ext_stack.push(scope.into());
    }

    pub fn pop_scope(&mut self) {
        self.ext_stack.pop();
    }

    pub fn is_hard(&self, scope: &str, name: &str) -> bool {
        scope_member(self.hard, scope).and_then(|s| s.get_member(name)).is_some()
    }

    pub fn over(&self) -> &Value {
        &self.over
    }

    pub fn into_over(self) -> Value {
        self.over
    }

    /// Every `dflt` scope key except `#global`, in sorted order — the order
    /// `extruderValues` and `defaultExtruderPosition` iterate.
    pub fn extruder_scopes(&self) -> Vec<&str> {
        self.dflt
            .as_object()
            .map(|map| map.keys().filter(|k| *k != GLOBAL_SCOPE).collect())
            .unwrap_or_default()
    }

    /// Zero-based position of the current scope among `extruder_scopes()`,
    /// or `-1` when the current scope is `#global` (no active extruder).
    ///
    /// The reference implementation declares `PS_DEP` in its function
    /// catalogue but never defines it anywhere in its source tree (checked:
    /// every file of the upstream project is present, none defines it) — this
    /// is a literal reading of the function's name, not a ported behavior.
    pub fn default_extruder_position(&self) -> i64 {
        let scope = self.current_scope();
        self.extruder_scopes().iter().position(|s| *s == scope).map(|i| i as i64).unwrap_or(-1)
    }

    pub fn set_over(&mut self, scope: &str, name: &str, value: Value) {
        let map = self.over.as_object_mut().expect("evaluation context's `over` is always an object");
        if !map.contains_key(scope) {
            map.insert(scope.to_owned(), Value::Object(OrderedMap::new()));
        }
        let scope_obj = map
            .get_mut(scope)
            .and_then(Value::as_object_mut)
            .expect("scope entry was just ensured to be an object");
        scope_obj.insert(name.to_owned(), value);
    }

    pub fn clear_over(&mut self, scope: &str, name: &str) {
        if let Some(scope_obj) = self.over.as_object_mut().and_then(|m| m.get_mut(scope)).and_then(Value::as_object_mut)
        {
            scope_obj.remove(name);
        }
    }

    /// `resolve(name)` against the current scope (spec.md §4.5): `over` then
    /// `dflt` in the current scope, then a quiet one-level `#global` probe,
    /// then the constants map. Fails with `UnknownName` only once every step
    /// has been tried.
    pub fn resolve(&self, name: &str) -> RunResult<Value> {
        let scope = self.current_scope();
        if let Some(v) = self.raw_lookup(scope, name) {
            return Ok(v);
        }

        if scope != GLOBAL_SCOPE {
            if let Some(v) = self.raw_lookup(GLOBAL_SCOPE, name) {
                return Ok(v);
            }
        }

        if let Some(v) = self.constants.get(name) {
            return Ok(v.clone());
        }

        Err(CoreError::UnknownName { name: name.to_owned() })
    }

    /// Looks up `over[scope][name]` then `dflt[scope][name]`, without the
    /// `#global` fallback or constants probe.
    pub fn raw_lookup(&self, scope: &str, name: &str) -> Option<Value> {
        scope_member(&self.over, scope)
            .and_then(|s| s.get_member(name))
            .cloned()
            .or_else(|| scope_member(self.dflt, scope).and_then(|s| s.get_member(name)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(entries: Vec<(&str, Value)>) -> Value {
        let mut map = OrderedMap::new();
        for (k, v) in entries {
            map.insert(k, v);
        }
        Value::Object(map)
    }

    #[test]
    fn resolve_falls_back_from_over_to_dflt_to_global_to_constants() {
        let hard = obj(vec![]);
        let dflt = obj(vec![
            ("#global", obj(vec![("layer_height", Value::Float(0.2))])),
            ("0", obj(vec![("nozzle_size", Value::Float(0.4))])),
        ]);
        let over = obj(vec![("0", obj(vec![("nozzle_size", Value::Float(0.6))]))]);
        let mut ctx = EvalContext::new(&hard, over, &dflt);
        ctx.push_scope("0");

        assert_eq!(ctx.resolve("nozzle_size").unwrap(), Value::Float(0.6));
        assert_eq!(ctx.resolve("layer_height").unwrap(), Value::Float(0.2));
        assert_eq!(ctx.resolve("math.pi").unwrap(), Value::Float(std::f64::consts::PI));
        assert!(ctx.resolve("nope").is_err());
    }

    #[test]
    fn default_extruder_position_indexes_sorted_extruder_scopes() {
        let hard = obj(vec![]);
        let dflt = obj(vec![("#global", obj(vec![])), ("0", obj(vec![])), ("1", obj(vec![]))]);
        let over = obj(vec![]);
        let mut ctx = EvalContext::new(&hard, over, &dflt);
        assert_eq!(ctx.default_extruder_position(), -1);
        ctx.push_scope("1");
        assert_eq!(ctx.default_extruder_position(), 1);
    }
}
