//! End-to-end scenarios and cross-cutting invariants, grounded on the
//! concrete examples and invariants spec.md §8 lists.

use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};

use printdef_core::eval::context::EvalContext;
use printdef_core::eval::eval_expr;
use printdef_core::expr::parse_setting_expr;
use printdef_core::value::json;
use printdef_core::{Diagnostics, OrderedMap, Value};

fn obj(entries: Vec<(&str, Value)>) -> Value {
    let mut map = OrderedMap::new();
    for (k, v) in entries {
        map.insert(k, v);
    }
    Value::Object(map)
}

fn eval(expr_text: &str, scope: &str, dflt: &Value) -> Value {
    let hard = obj(vec![]);
    let mut ctx = EvalContext::new(&hard, obj(vec![]), dflt);
    ctx.push_scope(scope.to_owned());
    let (tree, _deps) = parse_setting_expr(&Value::string(expr_text), scope, &[]).unwrap();
    eval_expr(&tree, &mut ctx).unwrap()
}

#[test]
fn scenario_constant_math() {
    let dflt = obj(vec![("#global", obj(vec![("test", Value::Integer(3))]))]);
    assert_eq!(eval("test + math.pi", "#global", &dflt), Value::Float(3.0 + std::f64::consts::PI));
}

#[test]
fn scenario_operator_precedence() {
    let dflt_pos = obj(vec![("#global", obj(vec![("test", Value::Integer(2))]))]);
    assert_eq!(eval("5 + 3*4**test+2*3", "#global", &dflt_pos), Value::Integer(59));

    let dflt_neg = obj(vec![("#global", obj(vec![("test", Value::Integer(-1))]))]);
    assert_eq!(eval("5 + 3*4**test+2*3", "#global", &dflt_neg), Value::Float(11.75));
}

#[test]
fn scenario_integer_overflow_falls_back_to_float() {
    let dflt = obj(vec![("#global", obj(vec![]))]);
    assert_eq!(eval("2 ** 70", "#global", &dflt), Value::Float(1.1805916207174113e21));
}

#[test]
fn scenario_string_concat_with_int() {
    let dflt = obj(vec![("#global", obj(vec![]))]);
    assert_eq!(eval("'v' + 3", "#global", &dflt), Value::string("v3"));
}

#[test]
fn scenario_ternary_short_circuits_the_untaken_branch() {
    let dflt = obj(vec![("#global", obj(vec![]))]);
    assert_eq!(eval("1/0 if false else 42", "#global", &dflt), Value::Integer(42));
}

static TMPDIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A scratch directory under the system temp dir, unique per test, torn
/// down on drop.
struct Scratch {
    path: std::path::PathBuf,
}

impl Scratch {
    fn new() -> Self {
        let n = TMPDIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!("printdef-core-scenarios-{}-{n}", std::process::id()));
        fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    fn write(&self, name: &str, contents: &str) -> String {
        let file_path = self.path.join(name);
        fs::write(&file_path, contents).unwrap();
        file_path.to_string_lossy().into_owned()
    }

    fn dir(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// A two-extruder printer with one evaluated setting (`layer_height`,
/// default `0.2`, `value = "1 + test"`, `test` default `0` overridable per
/// scope) plus `test` itself — enough to exercise load, defaults-elision,
/// hard pins, and extruder scoping together.
fn write_sample_printer(scratch: &Scratch) -> String {
    scratch.write(
        "printer.def.json",
        r#"{
            "metadata": { "machine_extruder_trains": { "0": "extruder0", "1": "extruder1" } },
            "settings": {
                "layer_height": { "type": "float", "default_value": 0.2, "value": "1 + test" },
                "test": { "type": "float", "default_value": 0.0 }
            }
        }"#,
    );
    scratch.write("extruder0.def.json", r#"{ "settings": { "test": { "type": "float", "default_value": 3.14 } } }"#);
    scratch.write("extruder1.def.json", r#"{ "settings": { "test": { "type": "float", "default_value": -1.0 } } }"#);
    "printer".to_owned()
}

#[test]
fn loader_determinism_and_extruder_listing() {
    let scratch = Scratch::new();
    let name = write_sample_printer(&scratch);
    let search = vec![scratch.dir()];

    let mut d1 = Diagnostics::new();
    let printer1 = printdef_core::load(&name, &search, &mut d1).unwrap();
    let mut d2 = Diagnostics::new();
    let printer2 = printdef_core::load(&name, &search, &mut d2).unwrap();

    assert!(d1.is_empty());
    assert_eq!(printer1, printer2);
    assert_eq!(printdef_core::list_scopes(&printer1), vec!["0".to_owned(), "1".to_owned()]);
    assert_eq!(printdef_core::printer_name(&printer1), Some("printer"));
    assert_eq!(printdef_core::search_path(&printer1), search);
}

#[test]
fn dependency_soundness_and_trigger_inversion() {
    let scratch = Scratch::new();
    let name = write_sample_printer(&scratch);
    let search = vec![scratch.dir()];
    let mut diagnostics = Diagnostics::new();
    let printer = printdef_core::load(&name, &search, &mut diagnostics).unwrap();

    let layer_height = printdef_core::setting_properties(&printer, "#global", "layer_height").unwrap();
    let dep = layer_height.get_member("#dep").unwrap();
    assert!(dep.get_member("#global").unwrap().get_member("test").is_some());

    let test_setting = printdef_core::setting_properties(&printer, "#global", "test").unwrap();
    let trigger = test_setting.get_member("#trigger").unwrap();
    assert!(trigger.get_member("#global").unwrap().get_member("layer_height").is_some());
}

#[test]
fn scenario_default_elision_and_hard_pin() {
    let scratch = Scratch::new();
    let name = write_sample_printer(&scratch);
    let search = vec![scratch.dir()];
    let mut diagnostics = Diagnostics::new();
    let printer = printdef_core::load(&name, &search, &mut diagnostics).unwrap();

    // test defaults to 0.0 in #global, so layer_height evaluates to 1.0,
    // which differs from its own default (0.2) and must be kept.
    let blank = printdef_core::blank(&printer);
    let mut eval_diagnostics = Diagnostics::new();
    let resolved = printdef_core::eval_all(&printer, &blank, &mut eval_diagnostics).unwrap();
    assert_eq!(resolved.get_member("#global").unwrap().get_member("layer_height").unwrap(), &Value::Float(1.0));

    // Hard-pinning layer_height must survive verbatim, regardless of its
    // expression.
    let mut pinned = blank.clone();
    printdef_core::add_setting(&mut pinned, &printer, None, "layer_height", Value::Float(0.2), &mut eval_diagnostics).unwrap();
    let mut eval_diagnostics2 = Diagnostics::new();
    let resolved_pinned = printdef_core::eval_all(&printer, &pinned, &mut eval_diagnostics2).unwrap();
    assert_eq!(resolved_pinned.get_member("#global").unwrap().get_member("layer_height").unwrap(), &Value::Float(0.2));
}

#[test]
fn scenario_extruder_scoping_with_extruder_values() {
    let scratch = Scratch::new();
    scratch.write(
        "printer.def.json",
        r#"{
            "metadata": { "machine_extruder_trains": { "0": "extruder0", "1": "extruder1" } },
            "settings": {
                "test": { "type": "float", "default_value": 0.0 },
                "derived": { "type": "[float,str]", "default_value": [], "value": "extruderValues('test')" }
            }
        }"#,
    );
    scratch.write("extruder0.def.json", r#"{ "settings": { "test": { "type": "float", "default_value": 3.14 } } }"#);
    scratch.write(
        "extruder1.def.json",
        r#"{ "settings": { "test": { "type": "str", "default_value": "hi", "value": "'hi'" } } }"#,
    );

    let search = vec![scratch.dir()];
    let mut diagnostics = Diagnostics::new();
    let printer = printdef_core::load("printer", &search, &mut diagnostics).unwrap();

    let blank = printdef_core::blank(&printer);
    let mut eval_diagnostics = Diagnostics::new();
    let resolved = printdef_core::eval_all(&printer, &blank, &mut eval_diagnostics).unwrap();

    let derived = resolved.get_member("#global").unwrap().get_member("derived").unwrap();
    assert_eq!(derived.as_list().unwrap(), &[Value::Float(3.14), Value::string("hi")]);
}

#[test]
fn evaluation_is_idempotent_modulo_defaults_elision() {
    let scratch = Scratch::new();
    let name = write_sample_printer(&scratch);
    let search = vec![scratch.dir()];
    let mut diagnostics = Diagnostics::new();
    let printer = printdef_core::load(&name, &search, &mut diagnostics).unwrap();

    let blank = printdef_core::blank(&printer);
    let mut d1 = Diagnostics::new();
    let once = printdef_core::eval_all(&printer, &blank, &mut d1).unwrap();
    let mut d2 = Diagnostics::new();
    let twice = printdef_core::eval_all(&printer, &once, &mut d2).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn unresolvable_printer_name_reports_every_path_tried() {
    let scratch = Scratch::new();
    let search = vec![scratch.dir()];
    let mut diagnostics = Diagnostics::new();
    let err = printdef_core::load("does_not_exist", &search, &mut diagnostics).unwrap_err();
    assert!(matches!(err, printdef_core::CoreError::FileNotFound { .. }));
}

#[test]
fn json_round_trip_through_the_writer_matches_the_loaded_value() {
    let original = obj(vec![
        ("b", Value::Integer(2)),
        ("a", Value::List(vec![Value::Float(0.1), Value::Boolean(true), Value::Null])),
    ]);
    let rendered = json::to_string(&original, false);
    let parsed = json::parse("<test>", &rendered).unwrap();
    assert_eq!(parsed, original);
}
