// Copyright (c) 2025 - Cowboy AI, Inc.
//! Environment Metadata Resolver
//!
//! Reads the environment (and optional application) records a logical
//! resource points at and produces everything rendering and recipe
//! deployment need:
//!
//! - the Kubernetes namespace (application namespace wins over environment),
//! - the cloud provider scopes,
//! - the recipe selected by the resource, merged with operator parameters,
//! - the recipe context handed to the IaC template.
//!
//! All problems with the references themselves are client errors.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::domain::{
    ApplicationRecord, ContextRef, EnvironmentRecord, LogicalResource, ProviderScopes,
    RecipeContext, RecipeRequest, RuntimeContext,
};
use crate::errors::{DeploymentError, DeploymentResult};
use crate::resources::ResourceId;
use crate::store::{StorageClient, StoreError};

/// Resource type of environment records
pub const ENVIRONMENT_RESOURCE_TYPE: &str = "Applications.Core/environments";

/// Resource type of application records
pub const APPLICATION_RESOURCE_TYPE: &str = "Applications.Core/applications";

/// Recipe selected for a resource, resolved against the environment catalog
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeMetadata {
    pub name: String,
    pub resource_type: String,
    pub template_kind: String,
    pub template_path: String,
    /// Operator parameters from the environment
    pub parameters: Map<String, Value>,
}

/// Everything resolved from an environment record
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentMetadata {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub providers: ProviderScopes,
    pub recipe: Option<RecipeMetadata>,
}

/// Resolves environment and application context for rendering
#[derive(Clone)]
pub struct EnvironmentResolver {
    store: Arc<dyn StorageClient>,
}

impl EnvironmentResolver {
    pub fn new(store: Arc<dyn StorageClient>) -> Self {
        Self { store }
    }

    /// Resolve an environment and, optionally, a recipe from its catalog
    #[instrument(skip(self), fields(environment = %environment_id))]
    pub async fn resolve(
        &self,
        environment_id: &str,
        recipe_name: Option<&str>,
        resource_type: &str,
    ) -> DeploymentResult<EnvironmentMetadata> {
        let id = ResourceId::parse(environment_id).map_err(|_| {
            DeploymentError::InvalidRequest(format!(
                "provided environment id {:?} is not a valid id.",
                environment_id
            ))
        })?;
        if !id.resource_type().eq_ignore_ascii_case(ENVIRONMENT_RESOURCE_TYPE) {
            return Err(DeploymentError::InvalidRequest(format!(
                "provided environment id type {:?} is not a valid type.",
                id.resource_type()
            )));
        }

        let record: EnvironmentRecord = self
            .load(environment_id, || format!("environment {:?} does not exist", environment_id))
            .await?;

        let namespace = record
            .properties
            .compute
            .as_ref()
            .map(|compute| compute.namespace().to_string())
            .filter(|ns| !ns.is_empty())
            .ok_or_else(|| {
                DeploymentError::InvalidRequest("cannot find namespace in the environment resource".to_string())
            })?;

        let recipe = match recipe_name {
            Some(name) => Some(resolve_recipe(&record, environment_id, name, resource_type)?),
            None => None,
        };

        debug!(namespace = %namespace, recipe = ?recipe.as_ref().map(|r| &r.template_path), "Resolved environment");

        Ok(EnvironmentMetadata {
            id: id.to_string(),
            name: if record.name.is_empty() { id.name().to_string() } else { record.name },
            namespace,
            providers: record.properties.providers,
            recipe,
        })
    }

    /// Resolve the application record a resource belongs to
    #[instrument(skip(self), fields(application = %application_id))]
    pub async fn resolve_application(&self, application_id: &str) -> DeploymentResult<ApplicationRecord> {
        let id = ResourceId::parse(application_id).map_err(|_| {
            DeploymentError::InvalidRequest(format!(
                "provided application id {:?} is not a valid id.",
                application_id
            ))
        })?;
        if !id.resource_type().eq_ignore_ascii_case(APPLICATION_RESOURCE_TYPE) {
            return Err(DeploymentError::InvalidRequest(format!(
                "provided application id type {:?} is not a valid type.",
                id.resource_type()
            )));
        }

        self.load(application_id, || format!("application {:?} does not exist", application_id))
            .await
    }

    async fn load<T, F>(&self, id: &str, missing: F) -> DeploymentResult<T>
    where
        T: serde::de::DeserializeOwned,
        F: FnOnce() -> String,
    {
        match self.store.get(id).await {
            Ok(object) => Ok(object.decode()?),
            Err(StoreError::NotFound(_)) => Err(DeploymentError::InvalidRequest(missing())),
            Err(err) => Err(err.into()),
        }
    }
}

fn resolve_recipe(
    record: &EnvironmentRecord,
    environment_id: &str,
    name: &str,
    resource_type: &str,
) -> DeploymentResult<RecipeMetadata> {
    let recipe = record.properties.recipes.get(name).ok_or_else(|| {
        DeploymentError::InvalidRequest(format!(
            "recipe with name {:?} does not exist in the environment {}",
            name, environment_id
        ))
    })?;

    if !recipe.resource_type.eq_ignore_ascii_case(resource_type) {
        return Err(DeploymentError::InvalidRequest(format!(
            "recipe with name {:?} of type {:?} in the environment {} cannot be used for resource type {:?}",
            name, recipe.resource_type, environment_id, resource_type
        )));
    }

    Ok(RecipeMetadata {
        name: name.to_string(),
        resource_type: recipe.resource_type.clone(),
        template_kind: recipe.template_kind.clone(),
        template_path: recipe.template_path.clone(),
        parameters: recipe.parameters.clone(),
    })
}

/// Operator parameters overridden key by key by developer parameters
pub fn merge_parameters(operator: &Map<String, Value>, developer: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = operator.clone();
    for (key, value) in developer {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Build the recipe request for a resource
pub fn build_recipe_request(
    resource: &LogicalResource,
    environment: &EnvironmentMetadata,
    application: Option<&ApplicationRecord>,
    namespace: &str,
) -> Option<RecipeRequest> {
    let recipe = environment.recipe.as_ref()?;
    let developer = resource
        .properties
        .recipe
        .as_ref()
        .map(|r| r.parameters.clone())
        .unwrap_or_default();

    let context = RecipeContext {
        resource: ContextRef {
            id: resource.id.clone(),
            name: resource.name.clone(),
        },
        resource_type: resource.resource_type.clone(),
        environment: ContextRef {
            id: environment.id.clone(),
            name: environment.name.clone(),
        },
        application: application.map(|app| ContextRef {
            id: app.id.clone(),
            name: app.name.clone(),
        }),
        runtime: RuntimeContext {
            namespace: namespace.to_string(),
            environment_namespace: environment.namespace.clone(),
        },
    };

    Some(RecipeRequest {
        name: recipe.name.clone(),
        template_kind: recipe.template_kind.clone(),
        template_path: recipe.template_path.clone(),
        parameters: merge_parameters(&recipe.parameters, &developer),
        providers: environment.providers.clone(),
        context,
        api_version: None,
    })
}
