// Copyright (c) 2025 - Cowboy AI, Inc.
//! Capability Registry
//!
//! Pluggable capabilities the deployment processor dispatches to:
//!
//! - [`Renderer`] keyed by logical resource type (case-insensitive)
//! - [`ResourceHandler`] keyed by `(provider, output resource type)`
//! - [`SecretValueTransformer`] keyed like handlers
//! - a single [`RecipeHandler`] for IaC-module provisioning
//!
//! A [`Registry`] is assembled once with [`RegistryBuilder`] at process start
//! and is read-only afterwards, so lookups need no synchronization.
//!
//! # Example
//!
//! ```rust,ignore
//! let registry = Registry::builder()
//!     .with_renderer("Applications.Datastores/mongoDatabases", Arc::new(MongoRenderer))
//!     .with_handler(ResourceType::new("Deployment", Provider::Kubernetes), Arc::new(KubeHandler))
//!     .with_recipe_handler(Arc::new(BicepDriver::new()))
//!     .build();
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::{Provider, ResourceType};

pub mod handler;
pub mod recipe;
pub mod renderer;
pub mod transformer;

pub use handler::{PutRequest, PutResponse, ResourceHandler};
pub use recipe::RecipeHandler;
pub use renderer::{RenderOptions, Renderer, RendererOutput};
pub use transformer::SecretValueTransformer;

/// Errors reported by capabilities
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// The request is invalid (bad upstream reference, bad definition)
    #[error("{0}")]
    Client(String),

    /// The target does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The capability does not implement the operation
    #[error("{0}")]
    Unsupported(String),

    /// Provider call failed
    #[error("{0}")]
    Provider(String),
}

impl HandlerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, HandlerError::NotFound(_))
    }
}

/// Result type for capability calls
pub type HandlerResult<T> = Result<T, HandlerError>;

type HandlerKey = (Provider, String);

fn handler_key(resource_type: &ResourceType) -> Option<HandlerKey> {
    resource_type
        .provider
        .map(|provider| (provider, resource_type.type_name.to_lowercase()))
}

/// Read-only capability lookup
#[derive(Clone, Default)]
pub struct Registry {
    renderers: HashMap<String, Arc<dyn Renderer>>,
    handlers: HashMap<HandlerKey, Arc<dyn ResourceHandler>>,
    transformers: HashMap<HandlerKey, Arc<dyn SecretValueTransformer>>,
    recipe_handler: Option<Arc<dyn RecipeHandler>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Renderer for a logical resource type
    pub fn renderer(&self, resource_type: &str) -> Option<Arc<dyn Renderer>> {
        self.renderers.get(&resource_type.to_lowercase()).cloned()
    }

    /// Handler for an output resource kind
    pub fn handler(&self, resource_type: &ResourceType) -> Option<Arc<dyn ResourceHandler>> {
        handler_key(resource_type).and_then(|key| self.handlers.get(&key).cloned())
    }

    /// Secret transformer for a resource kind
    pub fn transformer(&self, resource_type: &ResourceType) -> Option<Arc<dyn SecretValueTransformer>> {
        handler_key(resource_type).and_then(|key| self.transformers.get(&key).cloned())
    }

    pub fn recipe_handler(&self) -> Option<Arc<dyn RecipeHandler>> {
        self.recipe_handler.clone()
    }

    /// Registered logical resource types (lowercased)
    pub fn renderer_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.renderers.keys().cloned().collect();
        types.sort();
        types
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("renderers", &self.renderer_types())
            .field("handlers", &self.handlers.len())
            .field("transformers", &self.transformers.len())
            .field("recipe_handler", &self.recipe_handler.is_some())
            .finish()
    }
}

/// Assembles a [`Registry`]
#[derive(Default)]
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    pub fn with_renderer(mut self, resource_type: impl AsRef<str>, renderer: Arc<dyn Renderer>) -> Self {
        self.registry
            .renderers
            .insert(resource_type.as_ref().to_lowercase(), renderer);
        self
    }

    /// Register a handler; a type without a provider is ignored
    pub fn with_handler(mut self, resource_type: ResourceType, handler: Arc<dyn ResourceHandler>) -> Self {
        if let Some(key) = handler_key(&resource_type) {
            self.registry.handlers.insert(key, handler);
        }
        self
    }

    pub fn with_transformer(
        mut self,
        resource_type: ResourceType,
        transformer: Arc<dyn SecretValueTransformer>,
    ) -> Self {
        if let Some(key) = handler_key(&resource_type) {
            self.registry.transformers.insert(key, transformer);
        }
        self
    }

    pub fn with_recipe_handler(mut self, handler: Arc<dyn RecipeHandler>) -> Self {
        self.registry.recipe_handler = Some(handler);
        self
    }

    pub fn build(self) -> Registry {
        self.registry
    }
}
