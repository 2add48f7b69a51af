// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for deployment operations
//!
//! Every failure surfaced by the deployment processor is a [`DeploymentError`].
//! Variants fall into two families:
//!
//! - **Client errors**: the caller supplied something invalid (bad environment
//!   reference, unknown recipe, unsupported resource type, a handler-reported
//!   bad request). These map to 4xx responses.
//! - **Defects**: a renderer, recipe or handler produced an inconsistent result
//!   (cycle, dangling dependency, missing provider, missing identity, broken
//!   JSON pointer) or a backing service failed. These map to 5xx responses.

use thiserror::Error;

use crate::domain::{OutputResource, PointerError, Provider, RecipeData, ResourceType};
use crate::graph::GraphError;
use crate::registry::HandlerError;
use crate::store::StoreError;

/// Errors that can occur while rendering, deploying or deleting resources
#[derive(Debug, Error)]
pub enum DeploymentError {
    /// The request was invalid
    #[error("{0}")]
    InvalidRequest(String),

    /// No renderer is registered for the logical resource type
    #[error("resource type {0:?} is not supported")]
    UnsupportedResourceType(String),

    /// A handler or renderer rejected the request as invalid
    #[error("{0}")]
    HandlerClient(String),

    /// A record required by the operation does not exist
    #[error("{0}")]
    NotFound(String),

    /// Output resource has no provider
    #[error("output resource {local_id:?} does not have a provider specified")]
    MissingProvider { local_id: String },

    /// Output resource targets a provider that is switched off
    #[error("provider {provider} is not configured. Cannot support resource type {resource_type}")]
    ProviderNotEnabled {
        provider: Provider,
        resource_type: String,
    },

    /// No handler is registered for the output resource kind
    #[error("output resource kind '{0}' is unsupported")]
    UnsupportedOutputResource(ResourceType),

    /// Dependency graph is malformed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Handler completed without reporting an identity
    #[error("output resource {local_id:?} does not have an identity. This is a bug in the handler or renderer")]
    MissingIdentity { local_id: String },

    /// A value reference names an output resource that was never deployed
    #[error("cannot find an output resource matching localID {local_id:?} for {reference}")]
    MissingReference { local_id: String, reference: String },

    /// A JSON pointer could not be evaluated
    #[error("failed to process JSON Pointer {pointer:?}: {source}")]
    JsonPointer {
        pointer: String,
        #[source]
        source: PointerError,
    },

    /// Recipe support was requested but no recipe handler is registered
    #[error("recipe {0:?} cannot be deployed: no recipe handler is registered")]
    RecipeUnavailable(String),

    /// A handler failed for a reason other than bad input
    #[error("{0}")]
    Handler(String),

    /// Storage backend failure
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// A provider call exceeded its time budget
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// The caller cancelled the operation
    #[error("operation was cancelled")]
    Cancelled,

    /// Deployment failed after some output resources were provisioned
    #[error("{source}")]
    PartialDeployment {
        #[source]
        source: Box<DeploymentError>,
        deployed: Vec<OutputResource>,
        /// Recipe that ran before the failure
        recipe: Option<RecipeData>,
    },

    /// Record could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for deployment operations
pub type DeploymentResult<T> = Result<T, DeploymentError>;

impl DeploymentError {
    /// Whether the caller, rather than a renderer, handler or backend, is at fault
    pub fn is_client_error(&self) -> bool {
        match self {
            DeploymentError::InvalidRequest(_)
            | DeploymentError::UnsupportedResourceType(_)
            | DeploymentError::HandlerClient(_)
            | DeploymentError::NotFound(_) => true,
            DeploymentError::Storage(err) => {
                matches!(err, StoreError::NotFound(_) | StoreError::Conflict { .. })
            }
            DeploymentError::PartialDeployment { source, .. } => source.is_client_error(),
            _ => false,
        }
    }

    /// HTTP-like status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            DeploymentError::InvalidRequest(_)
            | DeploymentError::UnsupportedResourceType(_)
            | DeploymentError::HandlerClient(_) => 400,
            DeploymentError::NotFound(_) => 404,
            DeploymentError::Storage(StoreError::NotFound(_)) => 404,
            DeploymentError::Storage(StoreError::Conflict { .. }) => 412,
            DeploymentError::PartialDeployment { source, .. } => source.status_code(),
            _ => 500,
        }
    }

    /// Output resources provisioned before the failure, if any
    pub fn deployed_resources(&self) -> &[OutputResource] {
        match self {
            DeploymentError::PartialDeployment { deployed, .. } => deployed,
            _ => &[],
        }
    }

    /// Recipe deployed before the failure, if any
    pub fn recipe_data(&self) -> Option<&RecipeData> {
        match self {
            DeploymentError::PartialDeployment { recipe, .. } => recipe.as_ref(),
            _ => None,
        }
    }

    /// Whether anything was provisioned before the failure
    pub fn provisioned_anything(&self) -> bool {
        !self.deployed_resources().is_empty() || self.recipe_data().is_some_and(|r| !r.resources.is_empty())
    }

    /// Strip the partial deployment wrapper
    pub fn into_root_cause(self) -> DeploymentError {
        match self {
            DeploymentError::PartialDeployment { source, .. } => source.into_root_cause(),
            other => other,
        }
    }

    pub(crate) fn pointer(pointer: impl Into<String>, source: PointerError) -> Self {
        DeploymentError::JsonPointer {
            pointer: pointer.into(),
            source,
        }
    }
}

impl From<HandlerError> for DeploymentError {
    fn from(err: HandlerError) -> Self {
        match err {
            HandlerError::Client(message) => DeploymentError::HandlerClient(message),
            HandlerError::NotFound(message) => DeploymentError::NotFound(message),
            HandlerError::Unsupported(message) | HandlerError::Provider(message) => {
                DeploymentError::Handler(message)
            }
        }
    }
}

impl From<serde_json::Error> for DeploymentError {
    fn from(err: serde_json::Error) -> Self {
        DeploymentError::Serialization(err.to_string())
    }
}
