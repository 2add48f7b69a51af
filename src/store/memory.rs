// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-memory storage
//!
//! Process-local [`StorageClient`] used by tests and single-node setups.
//! ETags are UUID v7 strings.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{normalize_key, paginate, Query, QueryPage, StorageClient, StoreError, StoreResult, StoredObject};

/// In-memory record store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<BTreeMap<String, StoredObject>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl StorageClient for InMemoryStore {
    async fn get(&self, id: &str) -> StoreResult<StoredObject> {
        self.records
            .read()
            .await
            .get(&normalize_key(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn save(&self, id: &str, data: Value, expected_etag: Option<&str>) -> StoreResult<String> {
        let key = normalize_key(id);
        let mut records = self.records.write().await;

        if let Some(expected) = expected_etag {
            match records.get(&key) {
                Some(current) if current.etag == expected => {}
                _ => return Err(StoreError::Conflict { id: id.to_string() }),
            }
        }

        let etag = Uuid::now_v7().to_string();
        records.insert(
            key,
            StoredObject {
                id: id.to_string(),
                etag: etag.clone(),
                data,
            },
        );
        Ok(etag)
    }

    async fn delete(&self, id: &str, expected_etag: Option<&str>) -> StoreResult<()> {
        let key = normalize_key(id);
        let mut records = self.records.write().await;

        let current = records
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if let Some(expected) = expected_etag {
            if current.etag != expected {
                return Err(StoreError::Conflict { id: id.to_string() });
            }
        }

        records.remove(&key);
        Ok(())
    }

    async fn query(&self, query: &Query) -> StoreResult<QueryPage> {
        let matching: Vec<StoredObject> = self
            .records
            .read()
            .await
            .values()
            .filter(|object| query.matches(&object.id))
            .cloned()
            .collect();
        paginate(matching, query)
    }
}
