//! Durable key/value store client.
//!
//! [`CacheStore`] is the thin interface over the host's durable KV store
//! with per-key TTL and metadata. [`MemoryStore`] is the in-process
//! implementation used in development and tests; it enforces TTL on read
//! and supports prefix listing like the real backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache store backend failure: {0}")]
    Backend(String),
    #[error("stored value for `{key}` could not be decoded: {detail}")]
    Decode { key: String, detail: String },
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    pub fn decode(key: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Decode {
            key: key.into(),
            detail: detail.into(),
        }
    }
}

/// Write options: optional TTL plus free-form metadata tags.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub ttl: Option<Duration>,
    pub metadata: HashMap<String, String>,
}

impl PutOptions {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Default::default()
        }
    }
}

/// A stored value together with its metadata tags.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub value: String,
    pub metadata: HashMap<String, String>,
}

/// Client interface over the durable key/value store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn get_with_metadata(&self, key: &str) -> Result<Option<StoredEntry>, StoreError>;
    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
    /// List all live keys starting with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// Fetch and JSON-decode a stored value.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn CacheStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| StoreError::decode(key, err.to_string())),
        None => Ok(None),
    }
}

/// JSON-encode and store a value.
pub async fn put_json<T: Serialize>(
    store: &dyn CacheStore,
    key: &str,
    value: &T,
    options: PutOptions,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value)
        .map_err(|err| StoreError::backend(format!("encoding `{key}`: {err}")))?;
    store.put(key, raw, options).await
}

struct StoredRecord {
    value: String,
    metadata: HashMap<String, String>,
    expires_at: Option<OffsetDateTime>,
}

impl StoredRecord {
    fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory durable-store stand-in with per-key TTL and prefix listing.
#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<String, StoredRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Drop every expired record. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired(now));
        before - self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get_with_metadata(key).await?.map(|entry| entry.value))
    }

    async fn get_with_metadata(&self, key: &str) -> Result<Option<StoredEntry>, StoreError> {
        let now = OffsetDateTime::now_utc();
        if let Some(record) = self.records.get(key) {
            if !record.is_expired(now) {
                return Ok(Some(StoredEntry {
                    value: record.value.clone(),
                    metadata: record.metadata.clone(),
                }));
            }
        }
        // Expired entries are reaped lazily on read.
        self.records
            .remove_if(key, |_, record| record.is_expired(now));
        Ok(None)
    }

    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<(), StoreError> {
        let expires_at = options.ttl.map(|ttl| OffsetDateTime::now_utc() + ttl);
        self.records.insert(
            key.to_string(),
            StoredRecord {
                value,
                metadata: options.metadata,
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.records.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let now = OffsetDateTime::now_utc();
        let mut keys: Vec<String> = self
            .records
            .iter()
            .filter(|entry| entry.key().starts_with(prefix) && !entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
