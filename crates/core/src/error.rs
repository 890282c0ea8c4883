//! Error types for value construction and marshalling
//!
//! Marshalling itself has no error path: every `Value` has a wire form.
//! These errors cover the two places a caller can ask for a check.

use thiserror::Error;

/// Error building a tuple
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TupleError {
    /// Tuples carry at least one element
    #[error("Tuples can not be empty.")]
    Empty,
}

/// Error during strict encoding
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
    /// A plain string has the shape of an encoded atom and would decode as one
    #[error("string {0:?} is indistinguishable from an encoded atom")]
    AmbiguousString(String),
}
