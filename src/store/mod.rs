// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Record Storage
//!
//! This module defines the storage interface for resource records and its
//! implementations.
//!
//! # Architecture
//!
//! ```text
//! Controller ──save/delete──▶ StorageClient ──▶ NATS JetStream KV
//!      │                           ▲        └─▶ in-memory map
//!      └──▶ Processor ──get────────┘
//! ```
//!
//! # Concurrency
//!
//! Records are protected by optimistic concurrency: every write produces a
//! new ETag and a write carrying a stale ETag is rejected with
//! [`StoreError::Conflict`]. Nothing is locked.
//!
//! # Example
//!
//! ```rust,no_run
//! use cim_deployment::store::{InMemoryStore, StorageClient};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryStore::new();
//!     let etag = store.save("/planes/radius/local/resourceGroups/rg", json!({}), None).await?;
//!     store.delete("/planes/radius/local/resourceGroups/rg", Some(&etag)).await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub mod memory;
#[cfg(feature = "nats")]
pub mod nats;

pub use memory::InMemoryStore;
#[cfg(feature = "nats")]
pub use nats::NatsKvStore;

use crate::resources::ResourceId;

/// Storage failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record with the given ID
    #[error("the resource with id {0:?} was not found")]
    NotFound(String),

    /// Expected ETag did not match the stored one
    #[error("the resource with id {id:?} was modified concurrently")]
    Conflict { id: String },

    /// Query or continuation token is invalid
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Record could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backend failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// A stored record and its version
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub id: String,
    pub etag: String,
    pub data: Value,
}

impl StoredObject {
    /// Decode the record into a typed model
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

/// Scope/type listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// e.g. `/planes/radius/local/resourceGroups/rg`
    pub root_scope: String,
    /// e.g. `Applications.Datastores/mongoDatabases`
    pub resource_type: String,
    pub max_items: Option<usize>,
    pub continuation: Option<String>,
}

impl Query {
    pub fn new(root_scope: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            root_scope: root_scope.into(),
            resource_type: resource_type.into(),
            ..Default::default()
        }
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn with_continuation(mut self, token: impl Into<String>) -> Self {
        self.continuation = Some(token.into());
        self
    }

    /// Whether a stored ID falls inside this query
    pub fn matches(&self, id: &str) -> bool {
        let Ok(parsed) = ResourceId::parse(id) else {
            return false;
        };
        parsed.root_scope().eq_ignore_ascii_case(&self.root_scope)
            && parsed.resource_type().eq_ignore_ascii_case(&self.resource_type)
    }
}

/// One page of query results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    pub items: Vec<StoredObject>,
    /// Token for the next page, `None` on the last page
    pub continuation: Option<String>,
}

/// Page a sorted result set with an offset continuation token
pub(crate) fn paginate(items: Vec<StoredObject>, query: &Query) -> StoreResult<QueryPage> {
    let offset = match &query.continuation {
        Some(token) => token
            .parse::<usize>()
            .map_err(|_| StoreError::InvalidQuery(format!("bad continuation token {:?}", token)))?,
        None => 0,
    };

    let total = items.len();
    let page: Vec<StoredObject> = match query.max_items {
        Some(max) => items.into_iter().skip(offset).take(max).collect(),
        None => items.into_iter().skip(offset).collect(),
    };

    let next = offset + page.len();
    let continuation = (next < total && !page.is_empty()).then(|| next.to_string());
    Ok(QueryPage {
        items: page,
        continuation,
    })
}

/// Storage key for an ID
pub(crate) fn normalize_key(id: &str) -> String {
    id.trim_end_matches('/').to_lowercase()
}

/// Persistent storage of resource records
///
/// Implementations must:
///
/// - treat IDs case-insensitively,
/// - mint a new ETag on every successful save,
/// - reject a save or delete whose expected ETag is stale.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Read a record
    ///
    /// # Errors
    ///
    /// - `NotFound` if no record exists
    async fn get(&self, id: &str) -> StoreResult<StoredObject>;

    /// Write a record and return its new ETag
    ///
    /// With `expected_etag` set the write only succeeds if the record exists
    /// with that ETag.
    async fn save(&self, id: &str, data: Value, expected_etag: Option<&str>) -> StoreResult<String>;

    /// Remove a record
    ///
    /// # Errors
    ///
    /// - `NotFound` if no record exists
    /// - `Conflict` if `expected_etag` is stale
    async fn delete(&self, id: &str, expected_etag: Option<&str>) -> StoreResult<()>;

    /// List records of one type under a scope, ordered by ID
    async fn query(&self, query: &Query) -> StoreResult<QueryPage>;
}
