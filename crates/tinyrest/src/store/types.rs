//! Error and type definitions shared by the record store.

use serde_json::{Map, Value};
use thiserror::Error;

/// A record rendered as a JSON object, keyed by field name.
pub type Fields = Map<String, Value>;

/// Errors produced by record store operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Payload is not well-formed JSON, is not an object, or does not fit the schema
    #[error("{0}")]
    Decode(String),
    #[error("ID not found")]
    NotFound(i64),
    /// The identifier counter reached `i64::MAX`
    #[error("no identifiers left to assign")]
    IdExhausted,
}

impl StoreError {
    pub(crate) fn decode(err: impl std::fmt::Display) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Errors produced while building a record schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("field name must not be empty")]
    EmptyName,
    #[error("field '{0}' is reserved for the record identifier")]
    Reserved(String),
    #[error("field '{0}' is declared more than once")]
    Duplicate(String),
}
