// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource handler capability
//!
//! A handler issues the provider API calls for one kind of output resource.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::{HandlerError, HandlerResult};
use crate::domain::{OutputResource, ProviderDocument, ResourceIdentity};

/// Input to [`ResourceHandler::put`]
#[derive(Debug, Clone, PartialEq)]
pub struct PutRequest {
    pub resource: OutputResource,
    /// Property bags of already deployed resources, keyed by local ID
    pub dependency_properties: BTreeMap<String, Map<String, Value>>,
}

/// Output of [`ResourceHandler::put`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PutResponse {
    /// Provider handle; `None` keeps an identity already on the resource
    pub identity: Option<ResourceIdentity>,
    /// Named properties for property references
    pub properties: Map<String, Value>,
    /// Raw provider response for JSON pointer references
    pub document: Option<Value>,
}

impl PutResponse {
    pub fn new(identity: ResourceIdentity) -> Self {
        Self {
            identity: Some(identity),
            ..Default::default()
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_document(mut self, document: Value) -> Self {
        self.document = Some(document);
        self
    }

    /// Document used for JSON pointer evaluation
    ///
    /// The raw response when present, the property bag otherwise.
    pub fn provider_document(&self) -> ProviderDocument {
        match &self.document {
            Some(raw) => ProviderDocument::Raw(raw.clone()),
            None => ProviderDocument::Properties(self.properties.clone()),
        }
    }
}

/// Creates, reads and deletes one kind of output resource
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Create or update the resource; must be idempotent per identity
    async fn put(&self, request: PutRequest) -> HandlerResult<PutResponse>;

    /// Delete the resource; an already deleted resource reports `NotFound`
    async fn delete(&self, resource: &OutputResource) -> HandlerResult<()>;

    /// Read the current provider document of a deployed resource
    async fn get(&self, resource: &OutputResource) -> HandlerResult<ProviderDocument> {
        Err(HandlerError::Unsupported(format!(
            "handler for {} does not support reading resources",
            resource.resource_type
        )))
    }

    /// Invoke a side-effect free provider action such as `listKeys`
    async fn invoke_action(
        &self,
        resource: &OutputResource,
        action: &str,
        _api_version: &str,
    ) -> HandlerResult<Value> {
        Err(HandlerError::Unsupported(format!(
            "handler for {} does not support action {:?}",
            resource.resource_type, action
        )))
    }
}
