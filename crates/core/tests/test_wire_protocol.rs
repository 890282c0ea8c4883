//! Wire protocol compatibility tests
//!
//! These documents are what an existing JavaScript peer puts on the wire;
//! decoding them must produce the same values this crate encodes.

use cns_core::{Atom, Value, Wire, decode, encode, tag};

#[test]
fn test_decodes_peer_status_message() {
    let text = r#"{"status":{"CNS_tuple_":["__Symbol(ok)__",[1,2,{"CNS_tuple_":[3]}]]},"from":"child"}"#;
    let wire: Wire = serde_json::from_str(text).unwrap();
    let value = decode(&wire);

    let expected = Value::obj([
        (
            "status",
            tag(vec![
                Value::atom("ok"),
                Value::Arr(vec![1.into(), 2.into(), tag(vec![3.into()]).unwrap()]),
            ])
            .unwrap(),
        ),
        ("from", "child".into()),
    ]);
    assert_eq!(value, expected);
}

#[test]
fn test_encoded_text_is_stable() {
    let value = Value::obj([
        ("b", tag(vec![Value::atom("x")]).unwrap()),
        ("a", Value::Arr(vec![1.into(), 0.5.into()])),
    ]);
    let text = serde_json::to_string(&encode(&value)).unwrap();
    assert_eq!(text, r#"{"a":[1,0.5],"b":{"CNS_tuple_":["__Symbol(x)__"]}}"#);
}

#[test]
fn test_atom_survives_text_roundtrip() {
    let value = Value::Arr(vec![Value::atom("ping"), Value::atom("ping")]);
    let text = serde_json::to_string(&encode(&value)).unwrap();
    let back = decode(&serde_json::from_str(&text).unwrap());

    let items = back.as_slice().unwrap();
    assert_eq!(items[0], items[1]);
    assert_eq!(items[0].as_atom(), Some(&Atom::new("ping")));
}
