//! The tagged-union value model: the common currency between the loader,
//! the expression parser, and the evaluation engine.

pub mod json;
pub mod ordered_map;

pub use ordered_map::OrderedMap;

use crate::error::CoreError;

/// The nine kinds a [`Value`] can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Boolean,
    Integer,
    Float,
    String,
    Variable,
    List,
    Function,
    Object,
}

/// A printer-settings value.
///
/// `Variable` and `Function` carry the textual shape of a name but mean
/// different things downstream: a `Variable` resolves through a lookup,
/// while a `Function` is an application — item 0 is the callee name, items
/// 1.. are argument sub-expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Variable(String),
    List(Vec<Value>),
    Function(Vec<Value>),
    Object(OrderedMap<Value>),
}

fn type_mismatch(message: impl Into<String>) -> CoreError {
    CoreError::TypeMismatch { message: message.into() }
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Value::Variable(name.into())
    }

    /// A function application node: `name(args...)`.
    pub fn call(name: impl Into<String>, args: Vec<Value>) -> Self {
        let mut items = Vec::with_capacity(args.len() + 1);
        items.push(Value::String(name.into()));
        items.extend(args);
        Value::Function(items)
    }

    pub fn type_of(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Boolean(_) => Kind::Boolean,
            Value::Integer(_) => Kind::Integer,
            Value::Float(_) => Kind::Float,
            Value::String(_) => Kind::String,
            Value::Variable(_) => Kind::Variable,
            Value::List(_) => Kind::List,
            Value::Function(_) => Kind::Function,
            Value::Object(_) => Kind::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Number of elements: list/function length, object key count, 0 for
    /// null, 1 for every other scalar.
    pub fn item_count(&self) -> usize {
        match self {
            Value::Null => 0,
            Value::List(items) | Value::Function(items) => items.len(),
            Value::Object(map) => map.len(),
            _ => 1,
        }
    }

    pub fn as_boolean(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => s.parse::<f64>().map(|f| f != 0.0).unwrap_or(!s.is_empty()),
            Value::Variable(_) => true,
            Value::List(_) | Value::Function(_) | Value::Object(_) => self.item_count() != 0,
        }
    }

    pub fn as_integer(&self) -> i64 {
        match self {
            Value::Null => 0,
            Value::Boolean(b) => *b as i64,
            Value::Integer(i) => *i,
            Value::Float(f) => *f as i64,
            Value::String(s) => s.parse::<i64>().or_else(|_| s.parse::<f64>().map(|f| f as i64)).unwrap_or(0),
            Value::Variable(_) => 0,
            Value::List(_) | Value::Function(_) | Value::Object(_) => self.item_count() as i64,
        }
    }

    pub fn as_float(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Integer(i) => *i as f64,
            Value::Float(f) => *f,
            Value::String(s) => s.parse::<f64>().unwrap_or(0.0),
            Value::Variable(_) => 0.0,
            Value::List(_) | Value::Function(_) | Value::Object(_) => self.item_count() as f64,
        }
    }

    /// The name carried by a string/variable/function value, or `None`.
    ///
    /// For a `Function`, this is the callee name at item 0 (when it is a
    /// plain string, which is always how the parser builds it).
    pub fn get_string(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Variable(s) => Some(s),
            Value::Function(items) => match items.first() {
                Some(Value::String(name)) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Function(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&OrderedMap<Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut OrderedMap<Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Resolves a possibly-negative index against a length, per list
    /// indexing rules (negative counts from the end).
    fn resolve_index(index: i64, len: usize) -> Option<usize> {
        let resolved = if index < 0 { index + len as i64 } else { index };
        if resolved < 0 || resolved as usize >= len {
            None
        } else {
            Some(resolved as usize)
        }
    }

    pub fn item_at(&self, index: i64) -> Result<&Value, CoreError> {
        let items = self
            .as_list()
            .ok_or_else(|| type_mismatch("item-at requires a list or function value"))?;
        Self::resolve_index(index, items.len())
            .map(|i| &items[i])
            .ok_or(CoreError::OutOfRange { index, len: items.len() })
    }

    pub fn get_member(&self, name: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(name))
    }

    fn items_mut(&mut self) -> Result<&mut Vec<Value>, CoreError> {
        match self {
            Value::List(items) | Value::Function(items) => Ok(items),
            _ => Err(type_mismatch("operation requires a list or function value")),
        }
    }

    pub fn append(&mut self, value: Value) -> Result<(), CoreError> {
        self.items_mut()?.push(value);
        Ok(())
    }

    pub fn prepend(&mut self, value: Value) -> Result<(), CoreError> {
        self.items_mut()?.insert(0, value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value, CoreError> {
        let items = self.items_mut()?;
        let len = items.len();
        items.pop().ok_or(CoreError::OutOfRange { index: -1, len })
    }

    pub fn set_at(&mut self, index: i64, value: Value) -> Result<(), CoreError> {
        let items = self.items_mut()?;
        let len = items.len();
        let at = Self::resolve_index(index, len).ok_or(CoreError::OutOfRange { index, len })?;
        items[at] = value;
        Ok(())
    }

    /// Grows or shrinks to `new_len`, filling new slots with clones of
    /// `fill`.
    pub fn resize(&mut self, new_len: usize, fill: &Value) -> Result<(), CoreError> {
        let items = self.items_mut()?;
        items.resize_with(new_len, || fill.clone());
        Ok(())
    }

    pub fn add_member(&mut self, name: impl Into<String>, value: Value) -> Result<Option<Value>, CoreError> {
        let map = self.as_object_mut().ok_or_else(|| type_mismatch("add-member requires an object value"))?;
        Ok(map.insert(name, value))
    }

    pub fn remove_member(&mut self, name: &str) -> Result<Option<Value>, CoreError> {
        let map = self.as_object_mut().ok_or_else(|| type_mismatch("remove-member requires an object value"))?;
        Ok(map.remove(name))
    }

    /// Deep copy for composites, and for scalars a plain clone (cheap, and
    /// semantically equivalent to a shared reference since scalars are
    /// immutable).
    pub fn copy(&self) -> Value {
        self.clone()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}
