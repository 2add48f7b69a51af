// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provider Documents
//!
//! A deployed output resource is described by whatever its provider returned:
//! either a flat property bag assembled by the handler, or the raw JSON body
//! of the provider response. Value extraction from either form is a pure
//! function of the document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors produced when evaluating a JSON pointer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointerError {
    /// Pointer is neither empty nor rooted
    #[error("JSON pointer must be empty or start with a \"/\"")]
    Malformed,

    /// Object lacks the requested member
    #[error("object has no key {0:?}")]
    MissingKey(String),

    /// Array token is not a valid index
    #[error("invalid array index {0:?}")]
    InvalidIndex(String),

    /// Array index past the end
    #[error("array index {index} out of bounds (length {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Pointer descends into a scalar
    #[error("cannot descend into {kind} with token {token:?}")]
    NotAContainer { kind: &'static str, token: String },
}

/// Response document of a deployed output resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ProviderDocument {
    /// Property bag assembled by a handler
    Properties(Map<String, Value>),
    /// Raw provider response
    Raw(Value),
}

impl ProviderDocument {
    /// Look up a top-level named property
    pub fn property(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Properties(map) => map.get(name),
            Self::Raw(Value::Object(map)) => map.get(name),
            Self::Raw(_) => None,
        }
    }

    /// Evaluate an RFC 6901 pointer; the empty pointer yields the whole document
    pub fn pointer(&self, pointer: &str) -> Result<Value, PointerError> {
        match self {
            Self::Raw(value) => evaluate_pointer(value, pointer).cloned(),
            Self::Properties(map) => {
                let root = Value::Object(map.clone());
                evaluate_pointer(&root, pointer).cloned()
            }
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Properties(map) => Value::Object(map),
            Self::Raw(value) => value,
        }
    }
}

impl From<Value> for ProviderDocument {
    fn from(value: Value) -> Self {
        Self::Raw(value)
    }
}

/// Evaluate an RFC 6901 JSON pointer against a document
pub fn evaluate_pointer<'a>(document: &'a Value, pointer: &str) -> Result<&'a Value, PointerError> {
    if pointer.is_empty() {
        return Ok(document);
    }
    let rest = pointer.strip_prefix('/').ok_or(PointerError::Malformed)?;

    rest.split('/').map(unescape).try_fold(document, |current, token| match current {
        Value::Object(map) => map.get(&token).ok_or(PointerError::MissingKey(token)),
        Value::Array(items) => {
            let index = parse_index(&token)?;
            items.get(index).ok_or(PointerError::IndexOutOfBounds {
                index,
                len: items.len(),
            })
        }
        other => Err(PointerError::NotAContainer {
            kind: kind_of(other),
            token,
        }),
    })
}

fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

fn parse_index(token: &str) -> Result<usize, PointerError> {
    let canonical = token == "0" || (!token.starts_with('0') && token.bytes().all(|b| b.is_ascii_digit()));
    if token.is_empty() || !canonical {
        return Err(PointerError::InvalidIndex(token.to_string()));
    }
    token
        .parse()
        .map_err(|_| PointerError::InvalidIndex(token.to_string()))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
