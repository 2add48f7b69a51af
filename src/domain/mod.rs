// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Domain Models
//!
//! Version-agnostic data model shared by the renderer, processor and
//! controller layers.
//!
//! # Records
//!
//! - [`LogicalResource`] - user-declared resource with its resolved values
//! - [`EnvironmentRecord`] / [`ApplicationRecord`] - read-only context
//! - [`RecipeData`] - persisted outcome of a recipe deployment
//!
//! # Render Artifacts
//!
//! - [`OutputResource`] - one deployable unit with dependency edges
//! - [`ComputedValueReference`] / [`SecretValueReference`] - where to find values
//! - [`ProviderDocument`] - handler response used for value extraction
//!
//! # Classification
//!
//! - [`Provider`] / [`ResourceType`] / [`EnabledProviders`]
//! - [`ResourceIdentity`] - provider-assigned handle

pub mod document;
pub mod environment;
pub mod identity;
pub mod output_resource;
pub mod recipe;
pub mod references;
pub mod resource;
pub mod resource_type;

pub use document::{evaluate_pointer, PointerError, ProviderDocument};
pub use environment::{
    ApplicationProperties, ApplicationRecord, ApplicationStatus, AwsScope, AzureScope,
    ComputeTarget, EnvironmentProperties, EnvironmentRecipe, EnvironmentRecord, ProviderScopes,
};
pub use identity::ResourceIdentity;
pub use output_resource::{Dependency, OutputResource};
pub use recipe::{
    ContextRef, RecipeContext, RecipeData, RecipeOutput, RecipeRequest, RecipeSelection,
    RuntimeContext, DEFAULT_TEMPLATE_KIND,
};
pub use references::{ComputedValueReference, SecretSource, SecretValueReference};
pub use resource::{
    LogicalResource, ProvisioningState, RecipeStatus, ResourceProperties, ResourceStatus,
    SystemData,
};
pub use resource_type::{EnabledProviders, ParseProviderError, Provider, ResourceType};
