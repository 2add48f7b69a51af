// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource ID parsing
//!
//! Grammar:
//!
//! ```text
//! id        := "/" ["planes/"] scope* ["providers/" type ["providers/" type]]
//! scope     := <type> "/" <name>
//! type      := <namespace> "/" <type> ["/" <name>] (<type> "/" <name>)*
//! ```
//!
//! Empty segments (`//`) are rejected and a trailing `/` is tolerated.
//! Comparison is case-insensitive.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const SEPARATOR: char = '/';
const PLANES: &str = "planes";
const PROVIDERS: &str = "providers";

/// Errors produced when parsing a resource identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceIdError {
    /// Identifier does not follow the grammar
    #[error("'{0}' is not a valid resource id")]
    Invalid(String),
}

/// A scope segment such as `resourceGroups/rg`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeSegment {
    pub scope_type: String,
    pub name: String,
}

/// A type segment such as `Applications.Core/environments/env0`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSegment {
    pub type_name: String,
    pub name: String,
}

/// Parsed hierarchical resource identifier
#[derive(Debug, Clone, Default)]
pub struct ResourceId {
    normalized: String,
    ucp_qualified: bool,
    scopes: Vec<ScopeSegment>,
    types: Vec<TypeSegment>,
    extensions: Vec<TypeSegment>,
}

impl ResourceId {
    /// Parse an identifier
    pub fn parse(id: &str) -> Result<Self, ResourceIdError> {
        let invalid = || ResourceIdError::Invalid(id.to_string());

        if !id.starts_with(SEPARATOR) || id.starts_with("//") {
            return Err(invalid());
        }

        let mut rest = id.trim_start_matches(SEPARATOR);
        rest = rest.strip_suffix(SEPARATOR).unwrap_or(rest);

        let mut ucp_qualified = false;
        if rest.eq_ignore_ascii_case(PLANES) {
            ucp_qualified = true;
            rest = "";
        } else if let Some(stripped) = strip_prefix_ignore_case(rest, "planes/") {
            ucp_qualified = true;
            rest = stripped;
        }

        if rest.is_empty() {
            return Ok(Self::from_parts(ucp_qualified, Vec::new(), Vec::new(), Vec::new()));
        }

        let segments: Vec<&str> = rest.split(SEPARATOR).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid());
        }

        let mut i = 0;
        let mut scopes = Vec::new();
        while i < segments.len() {
            if segments[i].eq_ignore_ascii_case(PROVIDERS) {
                if i + 1 == segments.len() {
                    return Err(invalid());
                }
                i += 1;
                break;
            }

            if segments.len() - i < 2 {
                // trailing scope collection, e.g. `/resourceGroups`
                scopes.push(ScopeSegment {
                    scope_type: segments[i].to_string(),
                    name: String::new(),
                });
                i += 1;
                break;
            }

            if segments[i + 1].eq_ignore_ascii_case(PROVIDERS) {
                return Err(invalid());
            }

            scopes.push(ScopeSegment {
                scope_type: segments[i].to_string(),
                name: segments[i + 1].to_string(),
            });
            i += 2;
        }

        if i == segments.len() {
            return Ok(Self::from_parts(ucp_qualified, scopes, Vec::new(), Vec::new()));
        }

        let (types, next) = parse_types(&segments, i, true).ok_or_else(invalid)?;
        i = next;

        if i == segments.len() {
            return Ok(Self::from_parts(ucp_qualified, scopes, types, Vec::new()));
        }

        let (extensions, _) = parse_types(&segments, i, false).ok_or_else(invalid)?;
        Ok(Self::from_parts(ucp_qualified, scopes, types, extensions))
    }

    fn from_parts(
        ucp_qualified: bool,
        scopes: Vec<ScopeSegment>,
        types: Vec<TypeSegment>,
        extensions: Vec<TypeSegment>,
    ) -> Self {
        let relative = make_relative(&scopes, &types, &extensions);
        let normalized = match (ucp_qualified, relative.as_str()) {
            (true, "/") => format!("/{}", PLANES),
            (true, _) => format!("/{}{}", PLANES, relative),
            (false, _) => relative,
        };

        Self {
            normalized,
            ucp_qualified,
            scopes,
            types,
            extensions,
        }
    }

    /// Normalized string form
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// True for `/planes/...` identifiers
    pub fn is_ucp_qualified(&self) -> bool {
        self.ucp_qualified
    }

    /// True when the identifier names a scope rather than a resource
    pub fn is_scope(&self) -> bool {
        self.types.is_empty() && self.extensions.is_empty()
    }

    /// True when the identifier names a single resource
    pub fn is_resource(&self) -> bool {
        let last = self.extensions.last().or_else(|| self.types.last());
        matches!(last, Some(segment) if !segment.name.is_empty())
    }

    pub fn scope_segments(&self) -> &[ScopeSegment] {
        &self.scopes
    }

    pub fn type_segments(&self) -> &[TypeSegment] {
        &self.types
    }

    pub fn extension_segments(&self) -> &[TypeSegment] {
        &self.extensions
    }

    /// Fully qualified type, e.g. `Applications.Core/environments`
    pub fn resource_type(&self) -> String {
        let segments = if self.extensions.is_empty() {
            &self.types
        } else {
            &self.extensions
        };

        segments
            .iter()
            .map(|s| s.type_name.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Name of the innermost segment
    pub fn name(&self) -> &str {
        if let Some(last) = self.extensions.last() {
            return &last.name;
        }
        if let Some(last) = self.types.last() {
            return &last.name;
        }
        self.scopes.last().map(|s| s.name.as_str()).unwrap_or("")
    }

    /// Provider namespace of the resource type, e.g. `Applications.Core`
    pub fn provider_namespace(&self) -> &str {
        self.types
            .first()
            .and_then(|t| t.type_name.split(SEPARATOR).next())
            .unwrap_or("")
    }

    /// Name of the first scope with the given type (case-insensitive)
    pub fn find_scope(&self, scope_type: &str) -> Option<&str> {
        self.scopes
            .iter()
            .find(|s| s.scope_type.eq_ignore_ascii_case(scope_type))
            .map(|s| s.name.as_str())
    }

    /// Scope portion of the identifier
    pub fn root_scope(&self) -> String {
        let joined = self
            .scopes
            .iter()
            .flat_map(|s| {
                std::iter::once(s.scope_type.as_str())
                    .chain((!s.name.is_empty()).then_some(s.name.as_str()))
            })
            .collect::<Vec<_>>()
            .join("/");

        if self.ucp_qualified {
            format!("/{}/{}", PLANES, joined)
        } else {
            format!("/{}", joined)
        }
    }

    /// Plane type and name for UCP identifiers, e.g. `radius/local`
    pub fn plane_namespace(&self) -> Option<String> {
        if !self.ucp_qualified {
            return None;
        }
        self.scopes
            .first()
            .map(|s| format!("{}/{}", s.scope_type, s.name))
    }
}

fn parse_types(segments: &[&str], start: usize, allow_extension: bool) -> Option<(Vec<TypeSegment>, usize)> {
    let mut i = start;
    if segments.len() - i < 2 {
        return None;
    }

    let mut first = TypeSegment {
        type_name: format!("{}/{}", segments[i], segments[i + 1]),
        name: String::new(),
    };
    i += 2;
    if i < segments.len() {
        first.name = segments[i].to_string();
        i += 1;
    }

    let mut types = vec![first];
    while i < segments.len() {
        if allow_extension && segments[i].eq_ignore_ascii_case(PROVIDERS) {
            if i + 1 == segments.len() {
                return None;
            }
            return Some((types, i + 1));
        }

        let mut segment = TypeSegment {
            type_name: segments[i].to_string(),
            name: String::new(),
        };
        i += 1;
        if i < segments.len() {
            segment.name = segments[i].to_string();
            i += 1;
        }
        types.push(segment);
    }

    Some((types, i))
}

fn make_relative(scopes: &[ScopeSegment], types: &[TypeSegment], extensions: &[TypeSegment]) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for scope in scopes {
        segments.push(&scope.scope_type);
        if !scope.name.is_empty() {
            segments.push(&scope.name);
        }
    }

    for group in [types, extensions] {
        if group.is_empty() {
            continue;
        }
        segments.push(PROVIDERS);
        for segment in group {
            segments.push(&segment.type_name);
            if !segment.name.is_empty() {
                segments.push(&segment.name);
            }
        }
    }

    format!("/{}", segments.join("/"))
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &value[prefix.len()..])
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

impl FromStr for ResourceId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for ResourceId {
    fn eq(&self, other: &Self) -> bool {
        self.normalized.eq_ignore_ascii_case(&other.normalized)
    }
}

impl Eq for ResourceId {}

impl Hash for ResourceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.to_ascii_lowercase().hash(state);
    }
}

impl Serialize for ResourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.normalized)
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ResourceId::parse(&raw).map_err(serde::de::Error::custom)
    }
}
