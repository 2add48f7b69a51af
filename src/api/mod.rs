// Copyright (c) 2025 - Cowboy AI, Inc.
//! API Boundary
//!
//! Versioned wire models and request metadata for the resource controller.
//! The core model in [`crate::domain`] is version-agnostic; each API version
//! lives in its own module with explicit conversions to and from it.
//!
//! # Versions
//!
//! - [`v20231001preview`] - `2023-10-01-preview`

pub mod v20231001preview;

use crate::controller::Preconditions;

/// Response header carrying the record ETag
pub const ETAG_HEADER: &str = "ETag";

pub const IF_MATCH_HEADER: &str = "If-Match";

pub const IF_NONE_MATCH_HEADER: &str = "If-None-Match";

/// Conditional request metadata taken from request headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub if_match: Option<String>,
    pub if_none_match: Option<String>,
}

impl RequestContext {
    /// Collect the conditional headers; names match case-insensitively
    pub fn from_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut context = Self::default();
        for (name, value) in headers {
            if name.eq_ignore_ascii_case(IF_MATCH_HEADER) {
                context.if_match = Some(unquote(value));
            } else if name.eq_ignore_ascii_case(IF_NONE_MATCH_HEADER) {
                context.if_none_match = Some(unquote(value));
            }
        }
        context
    }

    pub fn preconditions(&self) -> Preconditions {
        Preconditions {
            if_match: self.if_match.clone(),
            if_none_match: self.if_none_match.clone(),
        }
    }
}

/// Strip the quotes of an HTTP entity tag
fn unquote(value: &str) -> String {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}
