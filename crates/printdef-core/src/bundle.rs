//! Settings-bundle helpers (spec.md §6), grounded on `printer_settings.c`'s
//! `PS_ListExtruders`/`PS_BlankSettings`/`PS_GetSettingProperties`/
//! `PS_AddSetting`/`PS_MergeSettings`, plus `PS_GetDefaults` via
//! [`crate::eval::engine::defaults_snapshot`].

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{CoreError, RunResult};
use crate::eval::context::GLOBAL_SCOPE;
use crate::eval::engine;
use crate::value::{OrderedMap, Value};

/// Extruder positions in loader-defined order, excluding `#global`.
///
/// The reference's own scope containers are sorted-key AVL trees too (same
/// as ours), so "loader-defined order" and "sorted key order" coincide —
/// there is no separate insertion-order bookkeeping to carry.
pub fn list_scopes(printer: &Value) -> Vec<String> {
    printer.as_object().map(|m| m.keys().filter(|k| *k != GLOBAL_SCOPE).map(str::to_owned).collect()).unwrap_or_default()
}

/// The per-scope `setting → default_value` snapshot.
pub fn defaults(printer: &Value) -> Value {
    engine::defaults_snapshot(printer)
}

/// A settings bundle with every printer scope present as an empty object.
pub fn blank(printer: &Value) -> Value {
    let mut scopes = OrderedMap::new();
    if let Some(printer_obj) = printer.as_object() {
        for scope in printer_obj.keys() {
            scopes.insert(scope, Value::Object(OrderedMap::new()));
        }
    }
    Value::Object(scopes)
}

pub fn setting_properties<'v>(printer: &'v Value, scope: &str, name: &str) -> Option<&'v Value> {
    printer.get_member(scope)?.get_member("#set")?.get_member(name)
}

/// The resolved printer name `load` was called with, round-tripped off
/// `#global`'s synthetic `#filename` member (`PS_GetPrinter`).
pub fn printer_name(printer: &Value) -> Option<&str> {
    printer.get_member(GLOBAL_SCOPE)?.get_member("#filename")?.get_string()
}

/// The search directories `load` was called with, round-tripped off
/// `#global`'s synthetic `#search` member (`PS_GetSearch`).
pub fn search_path(printer: &Value) -> Vec<String> {
    printer
        .get_member(GLOBAL_SCOPE)
        .and_then(|g| g.get_member("#search"))
        .and_then(Value::as_list)
        .map(|list| list.iter().filter_map(Value::get_string).map(str::to_owned).collect())
        .unwrap_or_default()
}

/// Adds `name = value` to `bundle[scope]` (scope omitted ⇒ `#global`),
/// warning (but not failing) if `printer` has no matching `#set` entry —
/// usually a typo in the caller's setting name.
pub fn add_setting(
    bundle: &mut Value,
    printer: &Value,
    scope: Option<&str>,
    name: &str,
    value: Value,
    diagnostics: &mut Diagnostics,
) -> RunResult<()> {
    let scope = scope.unwrap_or(GLOBAL_SCOPE);

    if setting_properties(printer, scope, name).is_none() {
        diagnostics.push(Diagnostic::UnknownSettingTypo { scope: scope.to_owned(), setting: name.to_owned() });
    }

    let scope_obj = bundle
        .as_object_mut()
        .and_then(|m| m.get_mut(scope))
        .and_then(Value::as_object_mut)
        .ok_or_else(|| CoreError::TypeMismatch { message: format!("bundle has no scope `{scope}`") })?;
    scope_obj.insert(name.to_owned(), value);
    Ok(())
}

/// Copies every `(scope, setting, value)` in `src` into `dest`, overwriting
/// on conflict. Both bundles must already carry the same scope set.
pub fn merge_settings(dest: &mut Value, src: &Value) -> RunResult<()> {
    let Some(src_obj) = src.as_object() else {
        return Err(CoreError::TypeMismatch { message: "merge source must be a settings bundle".to_owned() });
    };

    for (scope, settings) in src_obj.iter() {
        let Some(settings_obj) = settings.as_object() else { continue };
        let dest_scope = dest
            .as_object_mut()
            .and_then(|m| m.get_mut(scope))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| CoreError::TypeMismatch { message: format!("destination bundle has no scope `{scope}`") })?;
        for (name, value) in settings_obj.iter() {
            dest_scope.insert(name, value.copy());
        }
    }
    Ok(())
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

    fn sample_printer() -> Value {
        obj(vec![
            ("#global", obj(vec![("#set", obj(vec![("layer_height", obj(vec![("default_value", Value::Float(0.2))]))]))])),
            ("0", obj(vec![("#set", obj(vec![]))])),
            ("1", obj(vec![("#set", obj(vec![]))])),
        ])
    }

    #[test]
    fn list_scopes_excludes_global_and_sorts_by_key() {
        assert_eq!(list_scopes(&sample_printer()), vec!["0".to_owned(), "1".to_owned()]);
    }

    #[test]
    fn blank_mirrors_every_printer_scope_with_empty_objects() {
        let blank_bundle = blank(&sample_printer());
        assert!(blank_bundle.get_member("#global").unwrap().item_count() == 0);
        assert!(blank_bundle.get_member("0").is_some());
        assert!(blank_bundle.get_member("1").is_some());
    }

    #[test]
    fn add_setting_defaults_to_global_scope_and_warns_on_an_unknown_name() {
        let printer = sample_printer();
        let mut bundle = blank(&printer);
        let mut diagnostics = Diagnostics::new();

        add_setting(&mut bundle, &printer, None, "layer_height", Value::Float(0.3), &mut diagnostics).unwrap();
        assert_eq!(bundle.get_member("#global").unwrap().get_member("layer_height").unwrap(), &Value::Float(0.3));
        assert!(diagnostics.is_empty());

        add_setting(&mut bundle, &printer, None, "totally_made_up", Value::Integer(1), &mut diagnostics).unwrap();
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn merge_settings_overwrites_destination_entries() {
        let printer = sample_printer();
        let mut dest = blank(&printer);
        dest.as_object_mut().unwrap().get_mut("0").unwrap().as_object_mut().unwrap().insert("a", Value::Integer(1));

        let mut src = blank(&printer);
        src.as_object_mut().unwrap().get_mut("0").unwrap().as_object_mut().unwrap().insert("a", Value::Integer(9));
        src.as_object_mut().unwrap().get_mut("0").unwrap().as_object_mut().unwrap().insert("b", Value::Integer(2));

        merge_settings(&mut dest, &src).unwrap();
        let scope0 = dest.get_member("0").unwrap();
        assert_eq!(scope0.get_member("a").unwrap(), &Value::Integer(9));
        assert_eq!(scope0.get_member("b").unwrap(), &Value::Integer(2));
    }
}
