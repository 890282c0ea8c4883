//! Marshalling of Values for transport between contexts
//!
//! Transports carry only plain structures (null, numbers, strings, booleans,
//! arrays, objects), represented here as `serde_json::Value`. Two kinds of
//! `Value` have no native wire form and get a convention instead:
//!
//! - **Atom**: the string `__Symbol(<name>)__`
//! - **Tuple**: an object with the single field `CNS_tuple_` holding the
//!   encoded elements
//!
//! Both conventions are the persisted protocol and must stay bit-compatible
//! with existing peers.
//!
//! # Ambiguity
//!
//! A plain string that already reads `__Symbol(x)__` decodes as the atom `x`.
//! `encode` keeps that behavior for compatibility. `encode_strict` refuses to
//! send such strings instead.
//!
//! # Numbers
//!
//! Integral numbers inside the exactly-representable range go on the wire as
//! JSON integers, as JavaScript peers write them. Non-finite
//! numbers have no JSON form and are sent as `null`.
//!
//! # Values that do not round-trip
//!
//! `decode(encode(v)) == v` holds for every value except these, which can
//! be built but have no faithful wire form:
//!
//! | Value | Sent as | Decodes as |
//! |-------|---------|------------|
//! | `Number(NaN)`, `Number(±Inf)` | `null` | `Null` |
//! | `Atom::new("")` | `"__Symbol()__"` | that string |
//! | atom whose name contains a line break | marker string | that string |
//! | `Value::Tuple(vec![])` built directly | `{"CNS_tuple_": []}` | an `Obj` holding an empty `Arr` |
//!
//! An empty tuple never decodes as a `Tuple`, so handlers only ever see the
//! tuples `tag` would accept.

use crate::atom::Atom;
use crate::error::MarshalError;
use crate::value::Value;
use serde_json::{Map, Number};

/// Wire form of a value
pub type Wire = serde_json::Value;

/// Reserved field that marks an encoded tuple
pub const TUPLE_FIELD: &str = "CNS_tuple_";

/// Opening text of an encoded atom
pub const ATOM_MARKER_PREFIX: &str = "__Symbol(";

/// Closing text of an encoded atom
pub const ATOM_MARKER_SUFFIX: &str = ")__";

/// Largest integer magnitude an f64 represents exactly (2^53)
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Encode a value into its wire form
pub fn encode(value: &Value) -> Wire {
    match value {
        Value::Null => Wire::Null,
        Value::Number(n) => encode_number(*n),
        Value::Bool(b) => Wire::Bool(*b),
        Value::Str(s) => Wire::String(s.clone()),
        Value::Atom(a) => Wire::String(atom_marker(a.name())),
        Value::Arr(items) => Wire::Array(items.iter().map(encode).collect()),
        Value::Tuple(items) => {
            let mut obj = Map::new();
            obj.insert(
                TUPLE_FIELD.to_string(),
                Wire::Array(items.iter().map(encode).collect()),
            );
            Wire::Object(obj)
        }
        Value::Obj(map) => Wire::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), encode(v)))
                .collect(),
        ),
    }
}

/// Encode, refusing strings that would decode as atoms
pub fn encode_strict(value: &Value) -> Result<Wire, MarshalError> {
    check_unambiguous(value)?;
    Ok(encode(value))
}

fn check_unambiguous(value: &Value) -> Result<(), MarshalError> {
    match value {
        Value::Str(s) if parse_atom_marker(s).is_some() => {
            Err(MarshalError::AmbiguousString(s.clone()))
        }
        Value::Arr(items) | Value::Tuple(items) => items.iter().try_for_each(check_unambiguous),
        Value::Obj(map) => map.values().try_for_each(check_unambiguous),
        _ => Ok(()),
    }
}

/// Decode a wire value
pub fn decode(wire: &Wire) -> Value {
    match wire {
        Wire::Null => Value::Null,
        Wire::Bool(b) => Value::Bool(*b),
        Wire::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        Wire::String(s) => match parse_atom_marker(s) {
            Some(name) => Value::Atom(Atom::new(name)),
            None => Value::Str(s.clone()),
        },
        Wire::Array(items) => Value::Arr(items.iter().map(decode).collect()),
        Wire::Object(obj) => match tuple_elements(obj) {
            Some(items) => Value::Tuple(items.iter().map(decode).collect()),
            None => Value::Obj(
                obj.iter()
                    .map(|(k, v)| (k.clone(), decode(v)))
                    .collect(),
            ),
        },
    }
}

/// The wire text for an atom name
pub fn atom_marker(name: &str) -> String {
    format!("{}{}{}", ATOM_MARKER_PREFIX, name, ATOM_MARKER_SUFFIX)
}

/// Extract the atom name from a marker string
///
/// Matches `^__Symbol\(.+\)__$`: at least one name character and no line
/// terminators.
pub fn parse_atom_marker(s: &str) -> Option<&str> {
    let name = s
        .strip_prefix(ATOM_MARKER_PREFIX)?
        .strip_suffix(ATOM_MARKER_SUFFIX)?;
    if name.is_empty() || name.contains(['\n', '\r', '\u{2028}', '\u{2029}']) {
        return None;
    }
    Some(name)
}

/// Elements of a tuple object: exactly one field, `CNS_tuple_`, holding a
/// non-empty array
fn tuple_elements(obj: &Map<String, Wire>) -> Option<&Vec<Wire>> {
    if obj.len() != 1 {
        return None;
    }
    match obj.get(TUPLE_FIELD) {
        Some(Wire::Array(items)) if !items.is_empty() => Some(items),
        _ => None,
    }
}

fn encode_number(n: f64) -> Wire {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Wire::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map(Wire::Number).unwrap_or(Wire::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{is_tuple, tag};
    use serde_json::json;

    fn roundtrip(v: &Value) -> Value {
        decode(&encode(v))
    }

    #[test]
    fn test_atom_wire_shape() {
        assert_eq!(encode(&Value::atom("FOO")), json!("__Symbol(FOO)__"));
    }

    #[test]
    fn test_atom_identity_across_decodes() {
        let wire = json!("__Symbol(ready)__");
        let a = decode(&wire);
        let b = decode(&wire);
        assert_eq!(a, b);
        assert_eq!(a.as_atom(), Some(&Atom::new("ready")));
    }

    #[test]
    fn test_tuple_wire_shape() {
        let t = tag(vec![1.into(), Value::atom("x")]).unwrap();
        assert_eq!(encode(&t), json!({ "CNS_tuple_": [1, "__Symbol(x)__"] }));
    }

    #[test]
    fn test_tuple_preserved() {
        let t = tag(vec![1.into(), 2.into(), 3.into()]).unwrap();
        let back = roundtrip(&t);
        assert_eq!(back, t);
        assert_eq!(back.as_slice().map(<[Value]>::len), Some(3));
    }

    #[test]
    fn test_plain_array_never_becomes_tuple() {
        let arr = Value::Arr(vec![1.into(), 2.into()]);
        let back = roundtrip(&arr);
        assert!(matches!(back, Value::Arr(_)));
        assert_eq!(back, arr);
    }

    #[test]
    fn test_nested_roundtrip() {
        let v = Value::obj([
            ("status", tag(vec![Value::atom("ok"), 2.5.into()]).unwrap()),
            (
                "items",
                Value::Arr(vec![
                    Value::Null,
                    true.into(),
                    "text".into(),
                    tag(vec![Value::Arr(vec![Value::atom("deep")])]).unwrap(),
                ]),
            ),
        ]);
        assert_eq!(roundtrip(&v), v);
    }

    #[test]
    fn test_tuple_field_with_other_keys_is_object() {
        let wire = json!({ "CNS_tuple_": [1], "extra": 2 });
        match decode(&wire) {
            Value::Obj(map) => {
                assert_eq!(map.len(), 2);
                assert_eq!(map["CNS_tuple_"], Value::Arr(vec![1.into()]));
            }
            other => panic!("Expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_tuple_field_without_array_is_object() {
        let wire = json!({ "CNS_tuple_": "nope" });
        assert!(matches!(decode(&wire), Value::Obj(_)));
    }

    #[test]
    fn test_empty_tuple_field_is_object() {
        let wire = json!({ "CNS_tuple_": [] });
        let value = decode(&wire);
        assert!(!is_tuple(&value));
        assert_eq!(
            value,
            Value::obj([("CNS_tuple_", Value::Arr(Vec::new()))])
        );
    }

    #[test]
    fn test_values_without_wire_form() {
        assert_eq!(roundtrip(&Value::Number(f64::NAN)), Value::Null);
        assert_eq!(roundtrip(&Value::Number(f64::NEG_INFINITY)), Value::Null);
        assert_eq!(roundtrip(&Value::atom("")), Value::from("__Symbol()__"));
        assert_eq!(
            roundtrip(&Value::atom("two\nlines")),
            Value::from("__Symbol(two\nlines)__")
        );
        assert!(!is_tuple(&roundtrip(&Value::Tuple(Vec::new()))));
    }

    #[test]
    fn test_marker_string_is_ambiguous() {
        // Known format ambiguity: a string shaped like a marker decodes as an atom
        let v = Value::from("__Symbol(sneaky)__");
        assert_eq!(roundtrip(&v), Value::atom("sneaky"));
        assert_eq!(
            encode_strict(&v),
            Err(MarshalError::AmbiguousString("__Symbol(sneaky)__".to_string()))
        );
    }

    #[test]
    fn test_strict_accepts_ordinary_values() {
        let v = Value::Arr(vec!["__Symbol()__".into(), "__plain__".into(), Value::atom("a")]);
        assert_eq!(encode_strict(&v), Ok(encode(&v)));
    }

    #[test]
    fn test_marker_edge_cases() {
        assert_eq!(parse_atom_marker("__Symbol(a)__"), Some("a"));
        assert_eq!(parse_atom_marker("__Symbol(a b)__"), Some("a b"));
        assert_eq!(parse_atom_marker("__Symbol()__"), None);
        assert_eq!(parse_atom_marker("__Symbol(a\nb)__"), None);
        assert_eq!(parse_atom_marker("_Symbol(a)__"), None);
        assert_eq!(parse_atom_marker("__Symbol(a)_"), None);
    }

    #[test]
    fn test_numbers_on_the_wire() {
        assert_eq!(encode(&2.into()), json!(2));
        assert_eq!(encode(&Value::Number(-7.0)), json!(-7));
        assert_eq!(encode(&Value::Number(1.5)), json!(1.5));
        assert_eq!(encode(&Value::Number(f64::NAN)), Wire::Null);
        assert_eq!(encode(&Value::Number(f64::INFINITY)), Wire::Null);
        assert_eq!(decode(&json!(3)), Value::Number(3.0));
    }

    #[test]
    fn test_object_keys_untouched() {
        let v = Value::obj([("__Symbol(k)__", 1.into())]);
        match roundtrip(&v) {
            Value::Obj(map) => assert!(map.contains_key("__Symbol(k)__")),
            other => panic!("Expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_foreign_document() {
        let wire: Wire =
            serde_json::from_str(r#"{"CNS_tuple_":[1,2]}"#).expect("valid json");
        assert_eq!(decode(&wire), tag(vec![1.into(), 2.into()]).unwrap());
    }
}
