// Copyright (c) 2025 - Cowboy AI, Inc.
//! Recipe records
//!
//! A recipe is an externally authored IaC module (Bicep, Terraform) that
//! provisions infrastructure in place of direct handler calls.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::environment::ProviderScopes;

/// Template engine default when an environment does not name one
pub const DEFAULT_TEMPLATE_KIND: &str = "bicep";

/// Recipe chosen by a developer on a logical resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSelection {
    pub name: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
}

/// Identity of a record referenced from a recipe context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRef {
    pub id: String,
    pub name: String,
}

/// Runtime placement available to recipe templates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeContext {
    /// Namespace the resource's workloads run in
    pub namespace: String,
    /// Namespace configured on the environment
    pub environment_namespace: String,
}

/// Context handed to every recipe template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeContext {
    pub resource: ContextRef,
    pub resource_type: String,
    pub environment: ContextRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<ContextRef>,
    pub runtime: RuntimeContext,
}

/// Everything a recipe handler needs to run a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRequest {
    pub name: String,
    pub template_kind: String,
    pub template_path: String,
    /// Operator parameters overridden by developer parameters
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub providers: ProviderScopes,
    pub context: RecipeContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

/// What a recipe deployment produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeOutput {
    /// Provider resource IDs in creation order
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub values: Map<String, Value>,
    #[serde(default)]
    pub secrets: Map<String, Value>,
}

impl RecipeOutput {
    pub fn with_resources<I, S>(resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resources: resources.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn with_secret(mut self, key: impl Into<String>, value: Value) -> Self {
        self.secrets.insert(key.into(), value);
        self
    }
}

/// Persisted record of a recipe deployment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeData {
    pub name: String,
    pub template_kind: String,
    pub template_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Provider resource IDs created by the template
    #[serde(default)]
    pub resources: Vec<String>,
}

impl RecipeData {
    pub fn from_request(request: &RecipeRequest, resources: Vec<String>) -> Self {
        Self {
            name: request.name.clone(),
            template_kind: request.template_kind.clone(),
            template_path: request.template_path.clone(),
            api_version: request.api_version.clone(),
            parameters: request.parameters.clone(),
            resources,
        }
    }
}
