use std::fmt;

/// Result alias used throughout `printdef-core`.
pub type RunResult<T> = Result<T, CoreError>;

/// Every way loading a printer or evaluating its settings can fail fatally.
///
/// Per-setting evaluation failures (unknown names, type mismatches) are
/// *not* represented here — those are soft and recorded as
/// [`crate::diagnostics::Diagnostic`]s instead, per the propagation policy:
/// only structural and load-time failures abort the whole call.
#[derive(Debug, Clone)]
pub enum CoreError {
    /// The loader could not resolve a printer/extruder name to a readable file.
    FileNotFound { name: String, tried: Vec<String> },
    /// Malformed JSON in a definition or override file.
    JsonParse { path: String, message: String },
    /// Malformed expression syntax in a setting's `value` string.
    ExprParse { message: String },
    /// No `settings` key survived the inheritance/merge chain.
    MissingSettings { printer: String },
    /// `metadata.machine_extruder_trains` missing or not an object.
    BadMetadata { printer: String },
    /// `machine_extruder_trains` resolved to an empty map.
    NoExtruders { printer: String },
    /// A variable, function, operator, or macro name isn't in the catalogue.
    UnknownName { name: String },
    /// Wrong argument count to a macro/function/operator.
    ArityMismatch { name: String, expected: String, got: usize },
    /// Operand kinds disallowed for this operation.
    TypeMismatch { message: String },
    /// A list index was negative-past-start or past the end.
    OutOfRange { index: i64, len: usize },
    /// The evaluation work queue exceeded its iteration bound.
    CycleSuspected { evaluations: usize },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileNotFound { name, tried } => {
                write!(f, "could not find {name:?} (tried: {})", tried.join(", "))
            }
            Self::JsonParse { path, message } => write!(f, "malformed JSON in {path}: {message}"),
            Self::ExprParse { message } => write!(f, "malformed expression: {message}"),
            Self::MissingSettings { printer } => {
                write!(f, "{printer}: no `settings` key after merging its inheritance chain")
            }
            Self::BadMetadata { printer } => {
                write!(f, "{printer}: metadata.machine_extruder_trains is missing or not an object")
            }
            Self::NoExtruders { printer } => write!(f, "{printer}: machine_extruder_trains is empty"),
            Self::UnknownName { name } => write!(f, "unknown name: {name}"),
            Self::ArityMismatch { name, expected, got } => {
                write!(f, "{name}: expected {expected} argument(s), got {got}")
            }
            Self::TypeMismatch { message } => write!(f, "type mismatch: {message}"),
            Self::OutOfRange { index, len } => write!(f, "index {index} out of range for length {len}"),
            Self::CycleSuspected { evaluations } => {
                write!(f, "evaluation exceeded {evaluations} iterations, cycle suspected")
            }
        }
    }
}

impl std::error::Error for CoreError {}
