use crate::atom::Atom;
use crate::error::TupleError;
use std::collections::BTreeMap;
use std::fmt;

/// Value: what a message carries between contexts
///
/// The variant set is closed, so everything a `Value` can hold has a wire
/// form; there is no runtime "unsupported kind" to marshal.
///
/// `Obj` uses `BTreeMap` for deterministic key order, so the same logical
/// object always encodes to the same wire document.
#[derive(Clone)]
pub enum Value {
    Null,
    Number(f64),
    Bool(bool),
    Str(String),
    Atom(Atom),
    /// Plain, growable array
    Arr(Vec<Value>),
    /// Tuple-tagged array: fixed positions, distinct from `Arr` for equality
    ///
    /// Build with `tag` / `Value::tuple`, which refuse empty element lists.
    Tuple(Vec<Value>),
    Obj(BTreeMap<String, Value>),
}

/// Deep equality
///
/// - `NaN` equals `NaN` (values are compared as data, not IEEE numbers)
/// - Atoms compare by identity, which equals name comparison after interning
/// - `Tuple` and `Arr` never compare equal, even with the same elements
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Atom(a), Value::Atom(b)) => a == b,
            (Value::Arr(a), Value::Arr(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Obj(a), Value::Obj(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Build a tuple, rejecting empty element lists
    pub fn tuple(items: Vec<Value>) -> Result<Value, TupleError> {
        tag(items)
    }

    /// Shorthand for `Value::Atom(Atom::new(name))`
    pub fn atom(name: &str) -> Value {
        Value::Atom(Atom::new(name))
    }

    /// Build an object from key/value pairs
    pub fn obj<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Obj(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Name of the value's kind, as reported by the library's `dataType`
    pub fn data_type(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Number(n) if n.is_nan() => "nan",
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Str(_) => "string",
            Value::Atom(_) => "atom",
            Value::Arr(_) => "array",
            Value::Tuple(_) => "tuple",
            Value::Obj(_) => "object",
        }
    }

    /// Elements of an array or tuple
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Arr(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Value::Atom(a) => Some(a),
            _ => None,
        }
    }
}

/// Whether a value is a tuple-tagged array
pub fn is_tuple(value: &Value) -> bool {
    matches!(value, Value::Tuple(_))
}

/// Tag an array as a tuple
pub fn tag(items: Vec<Value>) -> Result<Value, TupleError> {
    if items.is_empty() {
        return Err(TupleError::Empty);
    }
    Ok(Value::Tuple(items))
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Atom(a) => write!(f, "{:?}", a),
            Value::Arr(items) => f.debug_list().entries(items).finish(),
            Value::Tuple(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", item)?;
                }
                write!(f, "}}")
            }
            Value::Obj(map) => f.debug_map().entries(map).finish(),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Atom> for Value {
    fn from(a: Atom) -> Self {
        Value::Atom(a)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Arr(items)
    }
}
