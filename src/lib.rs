// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment processor for the Composable Information Machine
//!
//! Turns user-declared logical resources ("a Redis cache named X") into
//! provider-specific output resources, deploys them in dependency order,
//! resolves the values and secrets consumers need and tears everything down
//! again in reverse order.
//!
//! # Architecture
//!
//! ```text
//!                ┌───────────────────────┐
//!  request ────▶ │ ResourceController    │ ETag preconditions, lifecycle,
//!                │                       │ garbage collection, persistence
//!                └──────────┬────────────┘
//!                           ▼
//!                ┌───────────────────────┐      ┌──────────────────────┐
//!                │ DeploymentProcessor   │ ───▶ │ EnvironmentResolver  │
//!                │ render/deploy/delete/ │      └──────────────────────┘
//!                │ fetch_secrets         │      ┌──────────────────────┐
//!                └──────────┬────────────┘ ───▶ │ DependencyGraph      │
//!                           ▼                   └──────────────────────┘
//!                ┌───────────────────────┐
//!                │ Registry              │ renderers, handlers,
//!                └───────────────────────┘ recipe handler, transformers
//! ```
//!
//! Records live behind [`store::StorageClient`], either in memory or in a
//! NATS JetStream key/value bucket.
//!
//! # Example
//!
//! ```rust,ignore
//! use cim_deployment::prelude::*;
//!
//! let store: Arc<dyn StorageClient> = Arc::new(InMemoryStore::new());
//! let processor = DeploymentProcessor::new(registry, store.clone(), ProcessorConfig::from_env());
//! let controller = ResourceController::new(processor, store);
//!
//! let saved = controller
//!     .create_or_update(id, resource, &Preconditions::none(), &Cancellation::new())
//!     .await?;
//! ```

pub mod api;
pub mod config;
pub mod controller;
pub mod deployment;
pub mod domain;
pub mod environment;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod registry;
pub mod resources;
pub mod state_machine;
pub mod store;

pub use config::{NatsStoreConfig, ProcessorConfig};
pub use controller::{ControllerError, ControllerResult, ResourceController, ResourceService};
pub use deployment::{Cancellation, DeploymentOutput, DeploymentProcessor};
pub use errors::{DeploymentError, DeploymentResult};
pub use resources::ResourceId;

/// Commonly used types
pub mod prelude {
    pub use crate::api::RequestContext;
    pub use crate::config::ProcessorConfig;
    pub use crate::controller::{
        ControllerError, DeleteOutcome, Preconditions, ResourceController, ResourceService, SavedResource,
    };
    pub use crate::deployment::{Cancellation, DeploymentOutput, DeploymentProcessor};
    pub use crate::domain::{
        ComputedValueReference, EnabledProviders, LogicalResource, OutputResource, Provider, ResourceIdentity,
        ResourceType, SecretValueReference,
    };
    pub use crate::errors::{DeploymentError, DeploymentResult};
    pub use crate::registry::{
        HandlerError, HandlerResult, RecipeHandler, Registry, Renderer, ResourceHandler, SecretValueTransformer,
    };
    pub use crate::resources::ResourceId;
    pub use crate::store::{InMemoryStore, StorageClient};
    pub use std::sync::Arc;
}
