// Copyright (c) 2025 - Cowboy AI, Inc.
//! Secret value transformer capability

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use super::HandlerResult;

/// Post-processes a fetched secret, e.g. to assemble a connection string
#[async_trait]
pub trait SecretValueTransformer: Send + Sync {
    async fn transform(
        &self,
        computed_values: &BTreeMap<String, Value>,
        secret: Value,
    ) -> HandlerResult<Value>;
}
