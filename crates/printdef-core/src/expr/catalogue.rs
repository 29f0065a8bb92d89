//! The closed set of operator, function, and macro names the parser and
//! evaluator recognize. Any other bareword-call is *UnknownName*.

use crate::error::CoreError;

/// How many arguments a catalogue entry accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    OneOrTwo,
}

impl Arity {
    fn accepts(self, got: usize) -> bool {
        match self {
            Arity::Exact(n) => got == n,
            Arity::OneOrTwo => got == 1 || got == 2,
        }
    }

    fn describe(self) -> String {
        match self {
            Arity::Exact(n) => n.to_string(),
            Arity::OneOrTwo => "1 or 2".to_owned(),
        }
    }
}

/// What kind of catalogue entry a name names — macros receive the context
/// and their own un-evaluated argument subtree; operators and functions are
/// evaluated over already-reduced argument values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Operator,
    Function,
    Macro,
}

struct Entry {
    name: &'static str,
    category: Category,
    arity: Arity,
}

const ENTRIES: &[Entry] = &[
    Entry { name: "+", category: Category::Operator, arity: Arity::OneOrTwo },
    Entry { name: "-", category: Category::Operator, arity: Arity::OneOrTwo },
    Entry { name: "*", category: Category::Operator, arity: Arity::Exact(2) },
    Entry { name: "/", category: Category::Operator, arity: Arity::Exact(2) },
    Entry { name: "**", category: Category::Operator, arity: Arity::Exact(2) },
    Entry { name: "<", category: Category::Operator, arity: Arity::Exact(2) },
    Entry { name: ">", category: Category::Operator, arity: Arity::Exact(2) },
    Entry { name: "<=", category: Category::Operator, arity: Arity::Exact(2) },
    Entry { name: ">=", category: Category::Operator, arity: Arity::Exact(2) },
    Entry { name: "==", category: Category::Operator, arity: Arity::Exact(2) },
    Entry { name: "!=", category: Category::Operator, arity: Arity::Exact(2) },
    Entry { name: "or", category: Category::Operator, arity: Arity::Exact(2) },
    Entry { name: "and", category: Category::Operator, arity: Arity::Exact(2) },
    Entry { name: "not", category: Category::Operator, arity: Arity::Exact(1) },
    Entry { name: "if", category: Category::Macro, arity: Arity::Exact(3) },
    Entry { name: "defaultExtruderPosition", category: Category::Function, arity: Arity::Exact(0) },
    Entry { name: "int", category: Category::Function, arity: Arity::Exact(1) },
    Entry { name: "math.ceil", category: Category::Function, arity: Arity::Exact(1) },
    Entry { name: "math.floor", category: Category::Function, arity: Arity::Exact(1) },
    Entry { name: "math.log", category: Category::Function, arity: Arity::Exact(1) },
    Entry { name: "math.radians", category: Category::Function, arity: Arity::Exact(1) },
    Entry { name: "math.sqrt", category: Category::Function, arity: Arity::Exact(1) },
    Entry { name: "math.tan", category: Category::Function, arity: Arity::Exact(1) },
    Entry { name: "max", category: Category::Function, arity: Arity::OneOrTwo },
    Entry { name: "min", category: Category::Function, arity: Arity::OneOrTwo },
    Entry { name: "round", category: Category::Function, arity: Arity::OneOrTwo },
    Entry { name: "sum", category: Category::Function, arity: Arity::Exact(1) },
    Entry { name: "extruderValue", category: Category::Macro, arity: Arity::Exact(2) },
    Entry { name: "extruderValues", category: Category::Macro, arity: Arity::Exact(1) },
    Entry { name: "resolveOrValue", category: Category::Macro, arity: Arity::Exact(1) },
];

fn find(name: &str) -> Option<&'static Entry> {
    ENTRIES.iter().find(|entry| entry.name == name)
}

pub fn category(name: &str) -> Option<Category> {
    find(name).map(|entry| entry.category)
}

pub fn is_known(name: &str) -> bool {
    find(name).is_some()
}

/// Validates `got` arguments against `name`'s catalogue arity.
pub fn check_arity(name: &str, got: usize) -> Result<(), CoreError> {
    let entry = find(name).ok_or_else(|| CoreError::UnknownName { name: name.to_owned() })?;
    if entry.arity.accepts(got) {
        Ok(())
    } else {
        Err(CoreError::ArityMismatch { name: name.to_owned(), expected: entry.arity.describe(), got })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_is_rejected() {
        assert!(check_arity("frobnicate", 1).is_err());
    }

    #[test]
    fn arity_checks_reject_wrong_counts() {
        assert!(check_arity("not", 2).is_err());
        assert!(check_arity("not", 1).is_ok());
        assert!(check_arity("round", 3).is_err());
        assert!(check_arity("round", 1).is_ok());
        assert!(check_arity("round", 2).is_ok());
    }

    #[test]
    fn macro_category_is_reported() {
        assert_eq!(category("resolveOrValue"), Some(Category::Macro));
        assert_eq!(category("+"), Some(Category::Operator));
        assert_eq!(category("max"), Some(Category::Function));
    }
}
