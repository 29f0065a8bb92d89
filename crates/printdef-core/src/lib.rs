//! Compiles inheriting, JSON-encoded printer-setting definitions into a
//! single indexed settings database, then resolves every setting's value
//! through a dependency-ordered, fixed-point expression evaluator.
//!
//! The public surface is the eight operations in spec.md §6: [`load`],
//! [`list_scopes`], [`defaults`], [`blank`], [`setting_properties`],
//! [`add_setting`], [`merge_settings`], [`eval_all`] — plus the
//! [`printer_name`]/[`search_path`] round-trip accessors.

pub mod bundle;
pub mod diagnostics;
pub mod error;
pub mod eval;
pub mod expr;
pub mod loader;
pub mod search;
pub mod value;

pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{CoreError, RunResult};
pub use value::{Kind, OrderedMap, Value};

/// Loads `printer_name` (resolved against `search`) and its extruder
/// trains into a single scope-shaped printer object.
pub fn load(printer_name: &str, search: &[String], diagnostics: &mut Diagnostics) -> RunResult<Value> {
    loader::load(printer_name, search, diagnostics)
}

/// Extruder positions in loader-defined order, excluding `#global`.
pub fn list_scopes(printer: &Value) -> Vec<String> {
    bundle::list_scopes(printer)
}

/// The per-scope `setting → default_value` snapshot.
pub fn defaults(printer: &Value) -> Value {
    bundle::defaults(printer)
}

/// A settings bundle with every printer scope present as an empty object.
pub fn blank(printer: &Value) -> Value {
    bundle::blank(printer)
}

/// The `(scope, setting)`'s flattened setting-properties object, if any.
pub fn setting_properties<'v>(printer: &'v Value, scope: &str, name: &str) -> Option<&'v Value> {
    bundle::setting_properties(printer, scope, name)
}

/// The resolved printer name `load` was called with.
pub fn printer_name(printer: &Value) -> Option<&str> {
    bundle::printer_name(printer)
}

/// The search directories `load` was called with.
pub fn search_path(printer: &Value) -> Vec<String> {
    bundle::search_path(printer)
}

/// Adds `name = value` to `bundle[scope]` (scope omitted ⇒ `#global`).
pub fn add_setting(
    bundle: &mut Value,
    printer: &Value,
    scope: Option<&str>,
    name: &str,
    value: Value,
    diagnostics: &mut Diagnostics,
) -> RunResult<()> {
    bundle::add_setting(bundle, printer, scope, name, value, diagnostics)
}

/// Copies every `(scope, setting, value)` in `src` into `dest`.
pub fn merge_settings(dest: &mut Value, src: &Value) -> RunResult<()> {
    bundle::merge_settings(dest, src)
}

/// Resolves every setting's value against `printer`, honoring `overrides`
/// as hard pins — spec.md §4.5's work-queue driven fixed-point evaluation.
pub fn eval_all(printer: &Value, overrides: &Value, diagnostics: &mut Diagnostics) -> RunResult<Value> {
    eval::evaluate_all(printer, overrides, overrides.copy(), diagnostics)
}
