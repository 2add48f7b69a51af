// Copyright (c) 2025 - Cowboy AI, Inc.
//! `2023-10-01-preview` wire models
//!
//! Read-only fields (`id`, `name`, `type`, `systemData`,
//! `provisioningState`, `status`) are emitted on the way out and ignored on
//! the way in; the controller derives them from the request and the
//! deployment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{
    LogicalResource, OutputResource, ProvisioningState, RecipeSelection, RecipeStatus, ResourceIdentity,
    ResourceProperties, SystemData,
};

pub const API_VERSION: &str = "2023-10-01-preview";

/// Portable resource as sent and returned by clients
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_data: Option<SystemDataModel>,
    pub properties: ResourcePropertiesModel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemDataModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePropertiesModel {
    pub environment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<RecipeModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusModel>,
    /// Type specific properties
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeModel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusModel {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_resources: Vec<OutputResourceModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<RecipeStatusModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputResourceModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius_managed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStatusModel {
    pub template_kind: String,
    pub template_path: String,
}

impl From<ResourceModel> for LogicalResource {
    fn from(model: ResourceModel) -> Self {
        let properties = model.properties;
        LogicalResource {
            properties: ResourceProperties {
                environment: properties.environment,
                application: properties.application.filter(|id| !id.is_empty()),
                recipe: properties.recipe.map(|recipe| RecipeSelection {
                    name: recipe.name,
                    parameters: recipe.parameters.unwrap_or_default(),
                }),
                extra: properties.extra,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

impl From<&LogicalResource> for ResourceModel {
    fn from(resource: &LogicalResource) -> Self {
        let properties = &resource.properties;
        let status = StatusModel {
            output_resources: properties
                .status
                .output_resources
                .iter()
                .map(OutputResourceModel::from)
                .collect(),
            recipe: properties.status.recipe.as_ref().map(|recipe| RecipeStatusModel {
                template_kind: recipe.template_kind.clone(),
                template_path: recipe.template_path.clone(),
            }),
        };

        ResourceModel {
            id: Some(resource.id.clone()),
            name: Some(resource.name.clone()),
            resource_type: Some(resource.resource_type.clone()),
            system_data: Some(SystemDataModel::from(&resource.system_data)),
            properties: ResourcePropertiesModel {
                environment: properties.environment.clone(),
                application: properties.application.clone(),
                recipe: properties.recipe.as_ref().map(|recipe| RecipeModel {
                    name: recipe.name.clone(),
                    parameters: Some(recipe.parameters.clone()).filter(|p| !p.is_empty()),
                }),
                provisioning_state: Some(properties.provisioning_state),
                status: Some(status),
                extra: properties.extra.clone(),
            },
        }
    }
}

impl From<&SystemData> for SystemDataModel {
    fn from(data: &SystemData) -> Self {
        Self {
            created_by: data.created_by.clone(),
            created_at: data.created_at,
            last_modified_by: data.last_modified_by.clone(),
            last_modified_at: data.last_modified_at,
        }
    }
}

impl From<&OutputResource> for OutputResourceModel {
    fn from(resource: &OutputResource) -> Self {
        Self {
            local_id: Some(resource.local_id.clone()),
            id: resource.identity.as_ref().map(identity_id),
            radius_managed: resource.radius_managed,
        }
    }
}

impl From<RecipeStatusModel> for RecipeStatus {
    fn from(model: RecipeStatusModel) -> Self {
        Self {
            template_kind: model.template_kind,
            template_path: model.template_path,
        }
    }
}

/// Resource ID clients see for a provider identity
///
/// Kubernetes objects are addressed through the `kubernetes` plane, with the
/// API group taken from the object's API version (`core` when ungrouped).
pub fn identity_id(identity: &ResourceIdentity) -> String {
    match identity {
        ResourceIdentity::Kubernetes {
            api_version,
            object_kind,
            namespace,
            name,
        } => {
            let group = match api_version.split_once('/') {
                Some((group, _)) => group,
                None => "core",
            };
            if namespace.is_empty() {
                format!("/planes/kubernetes/local/providers/{}/{}/{}", group, object_kind, name)
            } else {
                format!(
                    "/planes/kubernetes/local/namespaces/{}/providers/{}/{}/{}",
                    namespace, group, object_kind, name
                )
            }
        }
        other => other.to_string(),
    }
}
