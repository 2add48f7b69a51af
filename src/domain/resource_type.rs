// Copyright (c) 2025 - Cowboy AI, Inc.
//! Output Resource Types and Providers
//!
//! An output resource is classified by a `(provider, type)` pair. The provider
//! selects which family of handlers deploys it; the type selects the handler
//! within that family.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Infrastructure provider that owns an output resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Kubernetes API server
    Kubernetes,
    /// Azure Resource Manager
    Azure,
    /// Amazon Web Services (Cloud Control)
    Aws,
    /// Control plane native resources
    Radius,
}

impl Provider {
    /// Every known provider
    pub const ALL: [Provider; 4] = [
        Provider::Kubernetes,
        Provider::Azure,
        Provider::Aws,
        Provider::Radius,
    ];

    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kubernetes => "kubernetes",
            Self::Azure => "azure",
            Self::Aws => "aws",
            Self::Radius => "radius",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised provider name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown provider {0:?}")]
pub struct ParseProviderError(pub String);

impl FromStr for Provider {
    type Err = ParseProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kubernetes" | "k8s" => Ok(Self::Kubernetes),
            "azure" | "arm" => Ok(Self::Azure),
            "aws" => Ok(Self::Aws),
            "radius" | "ucp" => Ok(Self::Radius),
            _ => Err(ParseProviderError(s.to_string())),
        }
    }
}

/// Kind of an output resource
///
/// `provider` is optional on the wire so that a renderer omitting it can be
/// reported as a defect instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceType {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
}

impl ResourceType {
    pub fn new(type_name: impl Into<String>, provider: Provider) -> Self {
        Self {
            type_name: type_name.into(),
            provider: Some(provider),
        }
    }

    /// A type with no provider
    pub fn unqualified(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            provider: None,
        }
    }

    /// Case-insensitive comparison of both parts
    pub fn matches(&self, other: &ResourceType) -> bool {
        self.provider == other.provider && self.type_name.eq_ignore_ascii_case(&other.type_name)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.provider {
            Some(provider) => write!(f, "{}/{}", provider, self.type_name),
            None => f.write_str(&self.type_name),
        }
    }
}

/// Providers this deployment is allowed to target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnabledProviders(HashSet<Provider>);

impl EnabledProviders {
    pub fn new(providers: impl IntoIterator<Item = Provider>) -> Self {
        Self(providers.into_iter().collect())
    }

    pub fn none() -> Self {
        Self(HashSet::new())
    }

    pub fn all() -> Self {
        Self::new(Provider::ALL)
    }

    /// Add a provider to the set
    pub fn with(mut self, provider: Provider) -> Self {
        self.0.insert(provider);
        self
    }

    /// Remove a provider from the set
    pub fn without(mut self, provider: Provider) -> Self {
        self.0.remove(&provider);
        self
    }

    pub fn contains(&self, provider: Provider) -> bool {
        self.0.contains(&provider)
    }

    /// Enabled providers in a stable order
    pub fn iter(&self) -> impl Iterator<Item = Provider> + '_ {
        Provider::ALL.into_iter().filter(|p| self.0.contains(p))
    }

    /// Parse a comma separated list such as `kubernetes,azure`
    pub fn parse_list(list: &str) -> Result<Self, ParseProviderError> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Provider::from_str)
            .collect::<Result<HashSet<_>, _>>()
            .map(Self)
    }
}

impl Default for EnabledProviders {
    fn default() -> Self {
        Self::new([Provider::Kubernetes, Provider::Radius])
    }
}

impl fmt::Display for EnabledProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|p| p.as_str()).collect();
        f.write_str(&names.join(","))
    }
}
