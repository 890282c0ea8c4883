//! CNS Core: values that cross context boundaries
//!
//! This crate provides the data half of CNS message passing. It has no
//! concurrency of its own; the runtime crate moves these values between
//! contexts.
//!
//! Key design principles:
//! - Value: What a message talks about (Number, Str, Atom, Tuple, etc.)
//! - Atom: Name-interned token, identical across decodes of the same name
//! - Wire: The restricted JSON shape a transport can carry
//!
//! # Modules
//!
//! - `atom`: Process-wide atom interner
//! - `value`: Core Value enum, deep equality and tuple tagging
//! - `marshal`: Value <-> Wire encoding (atom markers, tuple objects)
//! - `config`: Library configuration tree (`lang` / `get_config`)
//! - `error`: Error types for tuples and strict marshalling

pub mod atom;
pub mod config;
pub mod error;
pub mod marshal;
pub mod value;

pub use atom::Atom;
pub use config::LangConfig;
pub use error::{MarshalError, TupleError};
pub use marshal::{
    ATOM_MARKER_PREFIX, ATOM_MARKER_SUFFIX, TUPLE_FIELD, Wire, decode, encode, encode_strict,
};
pub use value::{Value, is_tuple, tag};
