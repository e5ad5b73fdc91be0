//! In-memory storage backend.
//!
//! Backed by plain `HashMap`s behind an `Arc<Mutex<_>>`. Documents are
//! cloned in and out, so a writer replacing a CodeMap can never expose a
//! half-written document to a concurrent reader. Intended for tests and for
//! single-process deployments where persistence is handled elsewhere.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

use crate::auth::{ApiKeyRecord, RateLimitRecord};
use crate::domain::CodeMap;
use crate::error::{Error, Result};
use crate::storage::{CacheEntry, Store};

/// Inner storage structure (not thread-safe on its own).
///
/// CodeMaps and cache entries are keyed by `(tenant_id, key)` tuples, so
/// tenant isolation holds even for project IDs or hashes that happen to
/// contain separator characters.
#[derive(Default)]
struct Inner {
    code_maps: HashMap<(String, String), CodeMap>,
    cache: HashMap<(String, String), CacheEntry>,
    api_keys: HashMap<String, ApiKeyRecord>,
    rate_limits: HashMap<String, RateLimitRecord>,
}

/// Ephemeral, thread-safe store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::Storage("storage mutex poisoned".to_string()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn save_code_map(
        &self,
        tenant_id: &str,
        project_id: &str,
        code_map: &CodeMap,
    ) -> Result<()> {
        code_map.validate()?;
        let mut inner = self.lock()?;
        inner.code_maps.insert(
            (tenant_id.to_string(), project_id.to_string()),
            code_map.clone(),
        );
        debug!(tenant_id, project_id, "stored code map");
        Ok(())
    }

    async fn get_code_map(&self, tenant_id: &str, project_id: &str) -> Result<Option<CodeMap>> {
        let inner = self.lock()?;
        Ok(inner
            .code_maps
            .get(&(tenant_id.to_string(), project_id.to_string()))
            .cloned())
    }

    async fn delete_code_map(&self, tenant_id: &str, project_id: &str) -> Result<bool> {
        let mut inner = self.lock()?;
        Ok(inner
            .code_maps
            .remove(&(tenant_id.to_string(), project_id.to_string()))
            .is_some())
    }

    async fn list_projects(&self, tenant_id: &str) -> Result<Vec<String>> {
        let inner = self.lock()?;
        let mut projects: Vec<String> = inner
            .code_maps
            .keys()
            .filter(|(tenant, _)| tenant == tenant_id)
            .map(|(_, project)| project.clone())
            .collect();
        projects.sort();
        Ok(projects)
    }

    async fn save_cache(
        &self,
        tenant_id: &str,
        query_hash: &str,
        value: &serde_json::Value,
        ttl: Duration,
    ) -> Result<()> {
        let mut inner = self.lock()?;
        inner.cache.insert(
            (tenant_id.to_string(), query_hash.to_string()),
            CacheEntry::new(value.clone(), ttl),
        );
        Ok(())
    }

    async fn get_cache(
        &self,
        tenant_id: &str,
        query_hash: &str,
    ) -> Result<Option<serde_json::Value>> {
        let mut inner = self.lock()?;
        let key = (tenant_id.to_string(), query_hash.to_string());
        match inner.cache.get(&key) {
            Some(entry) if entry.is_expired() => {
                inner.cache.remove(&key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn delete_cache(&self, tenant_id: &str, query_hash: &str) -> Result<bool> {
        let mut inner = self.lock()?;
        Ok(inner
            .cache
            .remove(&(tenant_id.to_string(), query_hash.to_string()))
            .is_some())
    }

    async fn purge_cache(&self, tenant_id: &str) -> Result<()> {
        let mut inner = self.lock()?;
        inner.cache.retain(|(tenant, _), _| tenant != tenant_id);
        Ok(())
    }

    async fn put_api_key(&self, key_hash: &str, record: &ApiKeyRecord) -> Result<()> {
        let mut inner = self.lock()?;
        inner.api_keys.insert(key_hash.to_string(), record.clone());
        Ok(())
    }

    async fn get_api_key(&self, key_hash: &str) -> Result<Option<ApiKeyRecord>> {
        let inner = self.lock()?;
        Ok(inner.api_keys.get(key_hash).cloned())
    }

    async fn get_rate_limit(&self, source_ip: &str) -> Result<Option<RateLimitRecord>> {
        let inner = self.lock()?;
        Ok(inner.rate_limits.get(source_ip).cloned())
    }

    async fn save_rate_limit(&self, source_ip: &str, record: &RateLimitRecord) -> Result<()> {
        let mut inner = self.lock()?;
        inner
            .rate_limits
            .insert(source_ip.to_string(), record.clone());
        Ok(())
    }
}
