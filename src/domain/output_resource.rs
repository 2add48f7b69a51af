// Copyright (c) 2025 - Cowboy AI, Inc.
//! Output Resource Model
//!
//! An output resource is one concrete artifact (a Kubernetes Deployment, an
//! ARM database account, ...) contributed by a renderer. Its `local_id` is
//! unique within one render result and is the join key for dependency edges
//! and value references.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::identity::ResourceIdentity;
use super::resource_type::ResourceType;

/// Edge to another output resource of the same render result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    #[serde(rename = "localID")]
    pub local_id: String,
}

/// One deployable unit produced by a renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputResource {
    #[serde(rename = "localID")]
    pub local_id: String,

    pub resource_type: ResourceType,

    /// Provider-native type (ARM/UCP type) used to match recipe-created resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_resource_type: Option<String>,

    /// `Some(true)` when the control plane owns the artifact's lifecycle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius_managed: Option<bool>,

    /// Request body handed to the handler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,

    /// Set once the resource has been deployed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<ResourceIdentity>,
}

impl OutputResource {
    pub fn new(local_id: impl Into<String>, resource_type: ResourceType) -> Self {
        Self {
            local_id: local_id.into(),
            resource_type,
            provider_resource_type: None,
            radius_managed: None,
            resource: None,
            dependencies: Vec::new(),
            identity: None,
        }
    }

    pub fn with_provider_resource_type(mut self, provider_type: impl Into<String>) -> Self {
        self.provider_resource_type = Some(provider_type.into());
        self
    }

    pub fn with_radius_managed(mut self, managed: bool) -> Self {
        self.radius_managed = Some(managed);
        self
    }

    pub fn with_resource(mut self, resource: Value) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn with_dependency(mut self, local_id: impl Into<String>) -> Self {
        self.dependencies.push(Dependency {
            local_id: local_id.into(),
        });
        self
    }

    pub fn with_identity(mut self, identity: ResourceIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Unset means not managed
    pub fn is_radius_managed(&self) -> bool {
        self.radius_managed.unwrap_or(false)
    }

    pub fn dependency_ids(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(|d| d.local_id.as_str())
    }
}
