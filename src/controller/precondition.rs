// Copyright (c) 2025 - Cowboy AI, Inc.
//! Conditional request evaluation
//!
//! | Header | Value | Record | Outcome |
//! |---|---|---|---|
//! | `If-Match` | `*` or ETag | absent | requested resource does not exist |
//! | `If-Match` | ETag | different ETag | etags do not match |
//! | `If-None-Match` | `*` | present | resource already exists |
//!
//! Missing or empty headers always pass.

use thiserror::Error;

/// Wildcard matching any existing record
pub const WILDCARD: &str = "*";

/// A conditional request that does not hold against the stored record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("requested resource does not exist")]
    DoesNotExist,

    #[error("etags do not match")]
    EtagMismatch,

    #[error("resource already exists")]
    AlreadyExists,
}

/// `If-Match` / `If-None-Match` values of a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preconditions {
    pub if_match: Option<String>,
    pub if_none_match: Option<String>,
}

impl Preconditions {
    /// Unconditional request
    pub fn none() -> Self {
        Self::default()
    }

    pub fn if_match(etag: impl Into<String>) -> Self {
        Self {
            if_match: Some(etag.into()),
            if_none_match: None,
        }
    }

    pub fn if_none_match(etag: impl Into<String>) -> Self {
        Self {
            if_match: None,
            if_none_match: Some(etag.into()),
        }
    }

    /// Evaluate against the ETag of the stored record, `None` if absent
    pub fn check(&self, current: Option<&str>) -> Result<(), PreconditionError> {
        if let Some(expected) = non_empty(&self.if_match) {
            let current = current.ok_or(PreconditionError::DoesNotExist)?;
            if expected != WILDCARD && expected != current {
                return Err(PreconditionError::EtagMismatch);
            }
        }

        if non_empty(&self.if_none_match) == Some(WILDCARD) && current.is_some() {
            return Err(PreconditionError::AlreadyExists);
        }

        Ok(())
    }

    /// ETag the storage write must be conditioned on
    ///
    /// A concrete `If-Match` value is carried through to the store so a
    /// concurrent write between check and save is still rejected.
    pub fn expected_etag<'a>(&'a self, current: Option<&'a str>) -> Option<&'a str> {
        match non_empty(&self.if_match) {
            Some(etag) if etag != WILDCARD => Some(etag),
            _ => current,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
