// Copyright (c) 2025 - Cowboy AI, Inc.
//! Recipe handler capability

use async_trait::async_trait;
use serde_json::Value;

use super::HandlerResult;
use crate::domain::{RecipeOutput, RecipeRequest};

/// Drives an external IaC engine
#[async_trait]
pub trait RecipeHandler: Send + Sync {
    /// Run the template and report the provider resource IDs it created
    async fn deploy(&self, request: &RecipeRequest) -> HandlerResult<RecipeOutput>;

    /// Fetch the raw provider document of a created resource
    async fn get_resource(&self, provider_resource_id: &str) -> HandlerResult<Value>;

    /// Delete a created resource; an already deleted resource reports `NotFound`
    async fn delete(&self, provider_resource_id: &str, api_version: &str) -> HandlerResult<()>;
}
