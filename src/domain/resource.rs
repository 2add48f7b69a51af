// Copyright (c) 2025 - Cowboy AI, Inc.
//! Logical Resource record
//!
//! The user-declared, provider-agnostic entity ("a Redis cache named X").
//! After a successful deployment it carries the resolved computed values, the
//! secret references and the output resources that realise it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use super::output_resource::OutputResource;
use super::recipe::{RecipeData, RecipeSelection};
use super::references::SecretValueReference;
use crate::resources::{ResourceId, ResourceIdError};

/// Provisioning state reported on a logical resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProvisioningState {
    #[default]
    Accepted,
    Updating,
    Deleting,
    Succeeded,
    Failed,
    Canceled,
}

impl ProvisioningState {
    /// No operation is in flight
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Creation and modification metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<DateTime<Utc>>,
}

/// Template a recipe-backed resource was provisioned from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStatus {
    pub template_kind: String,
    pub template_path: String,
}

/// Observed state of a deployed logical resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_resources: Vec<OutputResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<RecipeStatus>,
    /// Last failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Superseded output resources that still have to be deleted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stale_output_resources: Vec<OutputResource>,
    /// Superseded recipe-created resources that still have to be deleted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_recipe: Option<RecipeData>,
}

impl ResourceStatus {
    /// Whether superseded resources are still awaiting deletion
    pub fn has_stale(&self) -> bool {
        !self.stale_output_resources.is_empty()
            || self.stale_recipe.as_ref().is_some_and(|recipe| !recipe.resources.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProperties {
    /// Owning environment ID
    #[serde(default)]
    pub environment: String,
    /// Owning application ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<RecipeSelection>,
    #[serde(default)]
    pub provisioning_state: ProvisioningState,
    #[serde(default)]
    pub status: ResourceStatus,
    /// Type specific properties consumed by renderers
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Logical resource record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalResource {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub system_data: SystemData,
    #[serde(default)]
    pub properties: ResourceProperties,
    /// Resolved non-secret values
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub computed_values: BTreeMap<String, Value>,
    /// Secret references, resolved on demand
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub secret_values: BTreeMap<String, SecretValueReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_data: Option<RecipeData>,
}

impl LogicalResource {
    /// New resource; name and type are taken from the ID
    pub fn new(id: &ResourceId, environment: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            name: id.name().to_string(),
            resource_type: id.resource_type(),
            properties: ResourceProperties {
                environment: environment.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn with_application(mut self, application: impl Into<String>) -> Self {
        self.properties.application = Some(application.into());
        self
    }

    pub fn with_recipe(mut self, name: impl Into<String>) -> Self {
        self.properties.recipe = Some(RecipeSelection {
            name: name.into(),
            parameters: Map::new(),
        });
        self
    }

    /// Developer parameter for the selected recipe
    pub fn with_recipe_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        let recipe = self.properties.recipe.get_or_insert_with(RecipeSelection::default);
        recipe.parameters.insert(key.into(), value);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.extra.insert(key.into(), value);
        self
    }

    pub fn parsed_id(&self) -> Result<ResourceId, ResourceIdError> {
        ResourceId::parse(&self.id)
    }

    /// Name of the selected recipe, if any
    pub fn recipe_name(&self) -> Option<&str> {
        self.properties
            .recipe
            .as_ref()
            .map(|r| r.name.as_str())
            .filter(|name| !name.is_empty())
    }

    pub fn output_resources(&self) -> &[OutputResource] {
        &self.properties.status.output_resources
    }

    pub fn provisioning_state(&self) -> ProvisioningState {
        self.properties.provisioning_state
    }
}
