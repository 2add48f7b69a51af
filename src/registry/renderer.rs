// Copyright (c) 2025 - Cowboy AI, Inc.
//! Renderer capability
//!
//! A renderer turns a logical resource plus its environment context into the
//! output resources and value references that realise it. Renderers are pure:
//! they never call providers.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::HandlerResult;
use crate::domain::{
    ComputedValueReference, LogicalResource, OutputResource, ProviderScopes, RecipeRequest,
    SecretValueReference,
};

/// Context resolved from the environment and application records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOptions {
    pub environment_id: String,
    /// Namespace workloads are rendered into (application override applied)
    pub namespace: String,
    /// Namespace configured on the environment
    pub environment_namespace: String,
    pub providers: ProviderScopes,
    /// Set when the resource is provisioned through a recipe
    pub recipe: Option<RecipeRequest>,
}

/// Result of rendering one logical resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RendererOutput {
    pub resources: Vec<OutputResource>,
    pub computed_values: BTreeMap<String, ComputedValueReference>,
    pub secret_values: BTreeMap<String, SecretValueReference>,
    /// Recipe to run instead of direct handler calls
    pub recipe: Option<RecipeRequest>,
}

impl RendererOutput {
    pub fn with_resource(mut self, resource: OutputResource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn with_computed_value(mut self, name: impl Into<String>, reference: ComputedValueReference) -> Self {
        self.computed_values.insert(name.into(), reference);
        self
    }

    pub fn with_secret_value(mut self, name: impl Into<String>, reference: SecretValueReference) -> Self {
        self.secret_values.insert(name.into(), reference);
        self
    }

    pub fn with_recipe(mut self, recipe: RecipeRequest) -> Self {
        self.recipe = Some(recipe);
        self
    }
}

/// Converts a logical resource into output resources and value references
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render a resource
    ///
    /// `HandlerError::Client` marks a problem with the resource definition
    /// and is reported to the caller as a bad request.
    async fn render(
        &self,
        resource: &LogicalResource,
        options: &RenderOptions,
    ) -> HandlerResult<RendererOutput>;
}
