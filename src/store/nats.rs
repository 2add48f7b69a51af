// Copyright (c) 2025 - Cowboy AI, Inc.
//! NATS JetStream key/value storage
//!
//! Records are stored in a JetStream KV bucket. The KV revision of the last
//! write is the record's ETag, so optimistic concurrency maps directly onto
//! KV compare-and-set (`create` for new keys, `update` with a revision for
//! existing ones).
//!
//! # Example
//!
//! ```rust,no_run
//! use cim_deployment::config::NatsStoreConfig;
//! use cim_deployment::store::{NatsKvStore, StorageClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = NatsKvStore::connect(&NatsStoreConfig::from_env()).await?;
//!     let record = store.get("/planes/radius/local/resourceGroups/rg/providers/Applications.Core/environments/env0").await?;
//!     println!("etag: {}", record.etag);
//!     Ok(())
//! }
//! ```

use std::fmt::Display;

use async_nats::jetstream::{self, kv};
use async_nats::ConnectOptions;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::{normalize_key, paginate, Query, QueryPage, StorageClient, StoreError, StoreResult, StoredObject};
use crate::config::NatsStoreConfig;

/// Stored value: the original ID is kept because keys are normalized
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    id: String,
    data: Value,
}

/// JetStream KV-backed record store
pub struct NatsKvStore {
    kv: kv::Store,
    bucket: String,
}

impl NatsKvStore {
    /// Connect to NATS and open (or create) the configured bucket
    pub async fn connect(config: &NatsStoreConfig) -> StoreResult<Self> {
        let options = ConnectOptions::new()
            .name("cim-deployment")
            .connection_timeout(config.connect_timeout);

        let client = async_nats::connect_with_options(config.servers.join(","), options)
            .await
            .map_err(backend)?;

        info!("Connected to NATS at {:?}", config.servers);

        Self::with_jetstream(jetstream::new(client), config).await
    }

    /// Open (or create) the bucket on an existing JetStream context
    pub async fn with_jetstream(jetstream: jetstream::Context, config: &NatsStoreConfig) -> StoreResult<Self> {
        let kv = match jetstream.get_key_value(config.bucket.clone()).await {
            Ok(kv) => kv,
            Err(_) => {
                debug!(bucket = %config.bucket, "Creating key/value bucket");
                jetstream
                    .create_key_value(kv::Config {
                        bucket: config.bucket.clone(),
                        history: config.history,
                        ..Default::default()
                    })
                    .await
                    .map_err(backend)?
            }
        };

        Ok(Self {
            kv,
            bucket: config.bucket.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Latest entry for a key, including delete markers
    async fn entry(&self, key: &str) -> StoreResult<Option<kv::Entry>> {
        self.kv.entry(key).await.map_err(backend)
    }

    /// Latest live (non-deleted) entry for a key
    async fn live_entry(&self, key: &str) -> StoreResult<Option<kv::Entry>> {
        Ok(self
            .entry(key)
            .await?
            .filter(|entry| matches!(entry.operation, kv::Operation::Put)))
    }

    fn decode(entry: &kv::Entry) -> StoreResult<StoredObject> {
        let envelope: Envelope = serde_json::from_slice(&entry.value)?;
        Ok(StoredObject {
            id: envelope.id,
            etag: entry.revision.to_string(),
            data: envelope.data,
        })
    }
}

/// KV key for a resource ID
fn kv_key(id: &str) -> String {
    normalize_key(id).trim_start_matches('/').to_string()
}

fn backend(err: impl Display) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Map a failed compare-and-set onto a conflict
fn write_error(id: &str, err: impl Display) -> StoreError {
    let message = err.to_string();
    if message.to_lowercase().contains("wrong last") || message.to_lowercase().contains("already exists") {
        StoreError::Conflict { id: id.to_string() }
    } else {
        StoreError::Backend(message)
    }
}

#[async_trait]
impl StorageClient for NatsKvStore {
    async fn get(&self, id: &str) -> StoreResult<StoredObject> {
        let entry = self
            .live_entry(&kv_key(id))
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Self::decode(&entry)
    }

    async fn save(&self, id: &str, data: Value, expected_etag: Option<&str>) -> StoreResult<String> {
        let key = kv_key(id);
        let payload = serde_json::to_vec(&Envelope {
            id: id.to_string(),
            data,
        })?;

        let current = self.entry(&key).await?;
        if let Some(expected) = expected_etag {
            let live_revision = current
                .as_ref()
                .filter(|entry| matches!(entry.operation, kv::Operation::Put))
                .map(|entry| entry.revision.to_string());
            if live_revision.as_deref() != Some(expected) {
                return Err(StoreError::Conflict { id: id.to_string() });
            }
        }

        let revision = match current {
            // Overwrites and resurrections of deleted keys both go through CAS
            Some(entry) => self
                .kv
                .update(&key, payload.into(), entry.revision)
                .await
                .map_err(|e| write_error(id, e))?,
            // Revision 0 only matches a key that was never written
            None => self
                .kv
                .update(&key, payload.into(), 0)
                .await
                .map_err(|e| write_error(id, e))?,
        };

        debug!(key = %key, revision, "Saved record");
        Ok(revision.to_string())
    }

    async fn delete(&self, id: &str, expected_etag: Option<&str>) -> StoreResult<()> {
        let key = kv_key(id);
        let entry = self
            .live_entry(&key)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let Some(expected) = expected_etag {
            if entry.revision.to_string() != expected {
                return Err(StoreError::Conflict { id: id.to_string() });
            }
        }

        self.kv.delete(&key).await.map_err(backend)?;
        debug!(key = %key, "Deleted record");
        Ok(())
    }

    async fn query(&self, query: &Query) -> StoreResult<QueryPage> {
        let mut keys = Box::pin(self.kv.keys().await.map_err(backend)?);
        let mut matching = Vec::new();

        while let Some(key) = keys.next().await {
            let key = key.map_err(backend)?;
            let Some(entry) = self.live_entry(&key).await? else {
                continue;
            };
            let object = Self::decode(&entry)?;
            if query.matches(&object.id) {
                matching.push(object);
            }
        }

        matching.sort_by_key(|object| normalize_key(&object.id));
        paginate(matching, query)
    }
}
