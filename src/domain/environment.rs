// Copyright (c) 2025 - Cowboy AI, Inc.
//! Environment and Application records
//!
//! Both are owned by other components; the deployment processor only reads
//! them to parametrize rendering and recipe deployment.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::recipe::DEFAULT_TEMPLATE_KIND;

/// Compute target of an environment or application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ComputeTarget {
    #[serde(rename_all = "camelCase")]
    Kubernetes {
        namespace: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resource_id: Option<String>,
    },
}

impl ComputeTarget {
    pub fn kubernetes(namespace: impl Into<String>) -> Self {
        Self::Kubernetes {
            namespace: namespace.into(),
            resource_id: None,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            Self::Kubernetes { namespace, .. } => namespace,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureScope {
    /// e.g. `/subscriptions/<sub>/resourceGroups/<rg>`
    pub scope: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsScope {
    /// e.g. `/planes/aws/aws/accounts/<account>/regions/<region>`
    pub scope: String,
}

/// Cloud scopes recipes deploy into
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderScopes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureScope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsScope>,
}

/// Catalog entry for one recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentRecipe {
    /// Logical resource type the recipe provisions
    pub resource_type: String,
    #[serde(default = "default_template_kind")]
    pub template_kind: String,
    pub template_path: String,
    /// Operator supplied parameters
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
}

fn default_template_kind() -> String {
    DEFAULT_TEMPLATE_KIND.to_string()
}

impl EnvironmentRecipe {
    pub fn new(resource_type: impl Into<String>, template_path: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            template_kind: default_template_kind(),
            template_path: template_path.into(),
            parameters: Map::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute: Option<ComputeTarget>,
    /// Recipe name to catalog entry
    #[serde(default)]
    pub recipes: BTreeMap<String, EnvironmentRecipe>,
    #[serde(default)]
    pub providers: ProviderScopes,
}

/// Environment record as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub properties: EnvironmentProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute: Option<ComputeTarget>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationProperties {
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub status: ApplicationStatus,
}

/// Application record as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub properties: ApplicationProperties,
}

impl ApplicationRecord {
    /// Kubernetes namespace the application's workloads run in
    pub fn namespace(&self) -> Option<&str> {
        self.properties
            .status
            .compute
            .as_ref()
            .map(ComputeTarget::namespace)
            .filter(|ns| !ns.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_environment_record_from_json() {
        let record: EnvironmentRecord = serde_json::from_value(json!({
            "id": "/planes/radius/local/resourceGroups/rg/providers/Applications.Core/environments/env0",
            "name": "env0",
            "properties": {
                "compute": { "kind": "kubernetes", "namespace": "radius-test" },
                "recipes": {
                    "mongoDB": {
                        "resourceType": "Applications.Datastores/mongoDatabases",
                        "templatePath": "registry/mongo:v1"
                    }
                },
                "providers": { "azure": { "scope": "/subscriptions/sub/resourceGroups/rg" } }
            }
        }))
        .unwrap();

        let recipe = &record.properties.recipes["mongoDB"];
        assert_eq!(recipe.template_kind, "bicep");
        assert_eq!(recipe.template_path, "registry/mongo:v1");
        assert_eq!(
            record.properties.compute.as_ref().map(ComputeTarget::namespace),
            Some("radius-test")
        );
        assert!(record.properties.providers.aws.is_none());
    }

    #[test]
    fn test_application_namespace() {
        let mut app = ApplicationRecord {
            id: "/planes/radius/local/resourceGroups/rg/providers/Applications.Core/applications/app".into(),
            name: "app".into(),
            properties: ApplicationProperties::default(),
        };
        assert_eq!(app.namespace(), None);

        app.properties.status.compute = Some(ComputeTarget::kubernetes("app-ns"));
        assert_eq!(app.namespace(), Some("app-ns"));
    }
}
