//! Expression tokenizer, parser, and the operator/function/macro catalogue.

pub mod catalogue;
pub mod lexer;
pub mod parser;

use std::collections::{BTreeMap, BTreeSet};

use crate::error::CoreError;
use crate::value::{OrderedMap, Value};

/// `scopeName -> { settingName -> true }`, built while parsing.
pub type Deps = BTreeMap<String, BTreeSet<String>>;

pub fn deps_to_value(deps: &Deps) -> Value {
    let mut scopes = OrderedMap::new();
    for (scope, names) in deps {
        let mut inner = OrderedMap::new();
        for name in names {
            inner.insert(name.clone(), Value::Boolean(true));
        }
        scopes.insert(scope.clone(), Value::Object(inner));
    }
    Value::Object(scopes)
}

/// Parses a setting's raw `value` field into its `#eval` tree plus the
/// `#dep` set it accumulates.
///
/// When `raw` isn't a string, the expression is the literal itself and no
/// dependencies are recorded — this matches the reference entry point
/// being reused both for whole-setting values and for a macro's reparsed
/// last argument.
pub fn parse_setting_expr(raw: &Value, owning_scope: &str, extruder_scopes: &[String]) -> Result<(Value, Deps), CoreError> {
    match raw {
        Value::String(text) => {
            let tokens = lexer::lex(text)?;
            let mut p = parser::Parser::new(tokens, owning_scope, extruder_scopes, parser::DepMode::AllExtruders);
            let expr = p.parse_program()?;
            Ok((expr, p.into_deps()))
        }
        other => Ok((other.clone(), Deps::new())),
    }
}
