// Copyright (c) 2025 - Cowboy AI, Inc.
//! Value References
//!
//! Declarative descriptors that say where a value lives once the output
//! resources of a render result are deployed:
//!
//! - a literal value,
//! - a named property in the handler's returned property bag,
//! - a JSON pointer into the raw provider document,
//! - (secrets only) the result of a provider action such as `listKeys`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::resource_type::ResourceType;

/// Where to find a non-secret computed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum ComputedValueReference {
    /// Value known at render time
    Static { value: Value },

    /// Named property of a deployed output resource
    #[serde(rename_all = "camelCase")]
    Property {
        #[serde(rename = "localID")]
        local_id: String,
        property: String,
    },

    /// JSON pointer into the provider document of a deployed output resource
    #[serde(rename_all = "camelCase")]
    JsonPointer {
        #[serde(rename = "localID")]
        local_id: String,
        pointer: String,
    },
}

impl ComputedValueReference {
    pub fn static_value(value: impl Into<Value>) -> Self {
        Self::Static {
            value: value.into(),
        }
    }

    pub fn property(local_id: impl Into<String>, property: impl Into<String>) -> Self {
        Self::Property {
            local_id: local_id.into(),
            property: property.into(),
        }
    }

    pub fn json_pointer(local_id: impl Into<String>, pointer: impl Into<String>) -> Self {
        Self::JsonPointer {
            local_id: local_id.into(),
            pointer: pointer.into(),
        }
    }

    /// Output resource the reference depends on
    pub fn local_id(&self) -> Option<&str> {
        match self {
            Self::Static { .. } => None,
            Self::Property { local_id, .. } | Self::JsonPointer { local_id, .. } => Some(local_id),
        }
    }
}

/// Where to find a secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum SecretSource {
    /// Secret known at deploy time
    Value { value: String },

    #[serde(rename_all = "camelCase")]
    Property {
        #[serde(rename = "localID")]
        local_id: String,
        property: String,
    },

    #[serde(rename_all = "camelCase")]
    JsonPointer {
        #[serde(rename = "localID")]
        local_id: String,
        pointer: String,
    },

    /// Provider action invoked at fetch time; `value_selector` is a JSON
    /// pointer into the action response
    #[serde(rename_all = "camelCase")]
    Action {
        #[serde(rename = "localID")]
        local_id: String,
        action: String,
        api_version: String,
        value_selector: String,
    },
}

/// Descriptor of a secret; never holds a provider-derived secret in plaintext
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretValueReference {
    #[serde(flatten)]
    pub source: SecretSource,

    /// Transformer applied after the raw value is fetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformer: Option<ResourceType>,
}

impl SecretValueReference {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::from_source(SecretSource::Value {
            value: value.into(),
        })
    }

    pub fn property(local_id: impl Into<String>, property: impl Into<String>) -> Self {
        Self::from_source(SecretSource::Property {
            local_id: local_id.into(),
            property: property.into(),
        })
    }

    pub fn json_pointer(local_id: impl Into<String>, pointer: impl Into<String>) -> Self {
        Self::from_source(SecretSource::JsonPointer {
            local_id: local_id.into(),
            pointer: pointer.into(),
        })
    }

    pub fn action(
        local_id: impl Into<String>,
        action: impl Into<String>,
        api_version: impl Into<String>,
        value_selector: impl Into<String>,
    ) -> Self {
        Self::from_source(SecretSource::Action {
            local_id: local_id.into(),
            action: action.into(),
            api_version: api_version.into(),
            value_selector: value_selector.into(),
        })
    }

    fn from_source(source: SecretSource) -> Self {
        Self {
            source,
            transformer: None,
        }
    }

    pub fn with_transformer(mut self, transformer: ResourceType) -> Self {
        self.transformer = Some(transformer);
        self
    }

    pub fn local_id(&self) -> Option<&str> {
        match &self.source {
            SecretSource::Value { .. } => None,
            SecretSource::Property { local_id, .. }
            | SecretSource::JsonPointer { local_id, .. }
            | SecretSource::Action { local_id, .. } => Some(local_id),
        }
    }

    /// True when fetching the secret calls the provider
    pub fn requires_action(&self) -> bool {
        matches!(self.source, SecretSource::Action { .. })
    }
}
