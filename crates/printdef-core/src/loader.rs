//! The definition loader (spec.md §4.2), grounded on `printer_settings.c`'s
//! `PS_New`/`LoadFileChain`/`IndexSettings`/`BuildDeps`.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{CoreError, RunResult};
use crate::eval::context::GLOBAL_SCOPE;
use crate::expr::{self, Deps};
use crate::search;
use crate::value::{json, OrderedMap, Value};

const DEFAULT_EXTENSION: &str = ".def.json";

/// Deep-merges `source`'s members into `target` (both must be objects):
/// a key absent from `target` is copied in; a key present as an object on
/// both sides is merged recursively; any other conflict leaves `target`'s
/// value untouched. `forbid` names a key that is never merged.
fn merge_into(target: &mut Value, source: &Value, forbid: Option<&str>) {
    let Some(source_obj) = source.as_object() else { return };
    let pairs: Vec<(String, Value)> = source_obj.iter().map(|(k, v)| (k.to_owned(), v.clone())).collect();
    let target_obj = target.as_object_mut().expect("merge target is always an object");

    for (key, v) in pairs {
        if forbid == Some(key.as_str()) {
            continue;
        }
        let existing_is_object = target_obj.get(&key).is_some_and(|e| e.as_object().is_some());
        if existing_is_object && v.as_object().is_some() {
            let mut merged = target_obj.get(&key).unwrap().copy();
            merge_into(&mut merged, &v, forbid);
            target_obj.insert(key, merged);
        } else if !target_obj.contains_key(&key) {
            target_obj.insert(key, v.copy());
        }
    }
}

/// Flattens the `settings` tree into a single `#set` map keyed by each
/// node's own name, at every nesting depth (a section and its children all
/// get their own entry) — matching the reference's `BuildIndex`. `overrides`
/// members are merged into the matching `#set` entry as they're built.
fn build_index(set: &mut OrderedMap<Value>, overrides: Option<&Value>, tree: &Value) {
    let Some(tree_obj) = tree.as_object() else { return };
    let entries: Vec<(String, Value)> = tree_obj.iter().map(|(k, v)| (k.to_owned(), v.clone())).collect();

    for (key, data) in entries {
        let mut entry = match overrides.and_then(|o| o.get_member(&key)) {
            Some(ov) => ov.copy(),
            None => Value::Object(OrderedMap::new()),
        };
        merge_into(&mut entry, &data, Some("children"));
        set.insert(key.clone(), entry);

        if let Some(children) = data.get_member("children") {
            build_index(set, overrides, children);
        }
    }
}

fn index_settings(pdef: &mut Value, chain_name: &str) -> RunResult<()> {
    let overrides = pdef.get_member("overrides").cloned();
    let Some(settings) = pdef.get_member("settings").cloned() else {
        return Err(CoreError::MissingSettings { printer: chain_name.to_owned() });
    };

    let mut set = OrderedMap::new();
    build_index(&mut set, overrides.as_ref(), &settings);

    let pdef_obj = pdef.as_object_mut().expect("definition root is always an object");
    pdef_obj.insert("#set", Value::Object(set));
    Ok(())
}

/// Resolves, parses, and merges one `inherits` chain into a single
/// `#set`-indexed definition object.
fn load_file_chain(name: &str, search: &[String]) -> RunResult<Value> {
    let mut pdef = Value::Object(OrderedMap::new());
    let mut current = Some(name.to_owned());

    while let Some(file) = current {
        let (text, path) = search::open_search(&file, DEFAULT_EXTENSION, search)?;
        let parsed = json::parse(&path, &text)?;
        merge_into(&mut pdef, &parsed, None);
        current = parsed.get_member("inherits").and_then(Value::get_string).map(str::to_owned);
    }

    index_settings(&mut pdef, name)?;
    Ok(pdef)
}

fn add_trigger(printer: &mut Value, dep_scope: &str, dep_name: &str, owner_scope: &str, owner_name: &str) {
    let Some(target) = printer
        .as_object_mut()
        .and_then(|m| m.get_mut(dep_scope))
        .and_then(Value::as_object_mut)
        .and_then(|m| m.get_mut("#set"))
        .and_then(Value::as_object_mut)
        .and_then(|m| m.get_mut(dep_name))
    else {
        return;
    };

    let target_map = target.as_object_mut().expect("#set entries are always objects");
    if !target_map.contains_key("#trigger") {
        target_map.insert("#trigger", Value::Object(OrderedMap::new()));
    }
    let trigger = target_map.get_mut("#trigger").and_then(Value::as_object_mut).expect("#trigger is always an object");
    if !trigger.contains_key(owner_scope) {
        trigger.insert(owner_scope, Value::Object(OrderedMap::new()));
    }
    let trigger_scope =
        trigger.get_mut(owner_scope).and_then(Value::as_object_mut).expect("trigger scope entry is always an object");
    trigger_scope.insert(owner_name, Value::Boolean(true));
}

/// Parses every setting's `value` string into `#eval`/`#dep` and inverts
/// `#dep` into each dependency's `#trigger` — spec.md §4.3/§4.4's expression
/// pass, plus §4.2's final dependency-graph step.
///
/// Unlike the reference (which treats a malformed expression as fatal to
/// the whole load), a parse failure here is recorded as a diagnostic and
/// the offending setting is simply omitted from the eval graph, per the
/// propagation policy in spec.md §7.
fn build_deps(printer: &mut Value, diagnostics: &mut Diagnostics) {
    let scopes: Vec<String> = printer.as_object().map(|m| m.keys().map(str::to_owned).collect()).unwrap_or_default();
    let extruder_scopes: Vec<String> = scopes.iter().filter(|s| s.as_str() != GLOBAL_SCOPE).cloned().collect();

    let mut parsed: Vec<(String, String, Value, Deps)> = Vec::new();

    for scope in &scopes {
        let Some(set) = printer.get_member(scope).and_then(|s| s.get_member("#set")).and_then(Value::as_object) else {
            continue;
        };
        let names: Vec<String> = set.keys().map(str::to_owned).collect();

        for name in names {
            let raw = printer
                .get_member(scope)
                .and_then(|s| s.get_member("#set"))
                .and_then(|s| s.get_member(&name))
                .and_then(|props| props.get_member("value"))
                .cloned();
            let Some(raw) = raw else { continue };

            match expr::parse_setting_expr(&raw, scope, &extruder_scopes) {
                Ok((eval, deps)) => parsed.push((scope.clone(), name, eval, deps)),
                Err(err) => {
                    diagnostics.push(Diagnostic::ExprParseError { scope: scope.clone(), setting: name, message: err.to_string() })
                }
            }
        }
    }

    for (scope, name, eval, deps) in &parsed {
        if let Some(props) = printer
            .as_object_mut()
            .and_then(|m| m.get_mut(scope))
            .and_then(Value::as_object_mut)
            .and_then(|m| m.get_mut("#set"))
            .and_then(Value::as_object_mut)
            .and_then(|m| m.get_mut(name))
        {
            let props_obj = props.as_object_mut().expect("#set entries are always objects");
            props_obj.insert("#eval", eval.clone());
            props_obj.insert("#dep", expr::deps_to_value(deps));
        }

        for (dep_scope, names) in deps {
            for dep_name in names {
                add_trigger(printer, dep_scope, dep_name, scope, name);
            }
        }
    }
}

/// Loads `printer_name` and its extruder trains into a single scope-shaped
/// printer object, per spec.md §4.2.
pub fn load(printer_name: &str, search: &[String], diagnostics: &mut Diagnostics) -> RunResult<Value> {
    let global = load_file_chain(printer_name, search)?;

    let trains = global
        .get_member("metadata")
        .and_then(|m| m.get_member("machine_extruder_trains"))
        .ok_or_else(|| CoreError::BadMetadata { printer: printer_name.to_owned() })?;
    let trains_obj = trains.as_object().ok_or_else(|| CoreError::BadMetadata { printer: printer_name.to_owned() })?;
    if trains_obj.is_empty() {
        return Err(CoreError::NoExtruders { printer: printer_name.to_owned() });
    }
    let trains_entries: Vec<(String, String)> = trains_obj
        .iter()
        .filter_map(|(position, file)| file.get_string().map(|f| (position.to_owned(), f.to_owned())))
        .collect();

    let mut printer = Value::Object(OrderedMap::new());
    printer.as_object_mut().unwrap().insert(GLOBAL_SCOPE, global);

    for (position, file) in trains_entries {
        let ext_def = load_file_chain(&file, search)?;
        printer.as_object_mut().unwrap().insert(position, ext_def);
    }

    build_deps(&mut printer, diagnostics);

    let global_mut = printer.as_object_mut().unwrap().get_mut(GLOBAL_SCOPE).unwrap();
    let global_obj = global_mut.as_object_mut().expect("#global is always an object");
    global_obj.insert("#filename", Value::string(printer_name));
    global_obj.insert("#search", Value::List(search.iter().map(|s| Value::string(s.clone())).collect()));

    Ok(printer)
}
