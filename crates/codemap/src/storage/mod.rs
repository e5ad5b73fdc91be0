//! Storage abstraction layer for the CodeMap engine.
//!
//! This module provides the core storage trait and the built-in backends:
//!
//! - **In-memory**: fast, ephemeral storage backed by `HashMap`
//! - **JSON file**: persistent storage, one document per file, with
//!   atomic temp-file-then-rename writes
//!
//! # Architecture
//!
//! The storage layer uses an async trait so that both blocking (in-memory)
//! and truly async (networked key-value) implementations fit behind the same
//! interface. The trait is object-safe, allowing dynamic dispatch via
//! `Arc<dyn Store>`.
//!
//! All CodeMap and cache operations are scoped by `tenant_id`: two tenants
//! may use identical `project_id` strings without collision. API-key and
//! rate-limit records are global, since they exist before a tenant identity
//! is established.
//!
//! # Absence vs. corruption
//!
//! `get_*` methods return `Ok(None)` when no record exists. They return an
//! error only when stored data cannot be decoded or fails validation, which
//! is corruption, not absence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::auth::{ApiKeyRecord, RateLimitRecord};
use crate::domain::CodeMap;
use crate::error::Result;

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// A cached query result with its expiry time.
///
/// Cache entries expire by TTL only; their lifecycle is independent of the
/// CodeMap they were computed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The previously computed result
    pub value: serde_json::Value,

    /// When this entry stops being served
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Build an entry that expires `ttl` from now.
    #[must_use]
    pub fn new(value: serde_json::Value, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        Self {
            value,
            expires_at: Utc::now() + ttl,
        }
    }

    /// Whether this entry has passed its expiry time.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Core storage trait for the CodeMap engine.
///
/// Implementations must be `Send + Sync` to support concurrent access in
/// async contexts, and take `&self` throughout: backends use interior
/// mutability (e.g. `Arc<Mutex<_>>`) so that concurrent requests for
/// different tenants share no mutable state.
///
/// # Implementation requirements
///
/// - `save_code_map` **MUST** validate the document via
///   [`CodeMap::validate`] and reject it atomically on any violation.
/// - Writes are whole-document replacements; a concurrent reader observes
///   either the pre- or post-write document, never a partial mix.
#[async_trait]
pub trait Store: Send + Sync {
    // ========== CodeMap documents ==========

    /// Persist a CodeMap for `(tenant_id, project_id)`, replacing any
    /// previous document as one atomic unit.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the document fails schema validation
    /// (nothing is persisted), or `Error::Storage` on backend failure.
    async fn save_code_map(
        &self,
        tenant_id: &str,
        project_id: &str,
        code_map: &CodeMap,
    ) -> Result<()>;

    /// Fetch the CodeMap for `(tenant_id, project_id)`.
    ///
    /// Returns `Ok(None)` when no document exists.
    ///
    /// # Errors
    ///
    /// Returns an error only if stored data fails decoding or validation.
    async fn get_code_map(&self, tenant_id: &str, project_id: &str) -> Result<Option<CodeMap>>;

    /// Delete the CodeMap for `(tenant_id, project_id)`.
    ///
    /// Returns `true` if a document was deleted, `false` if none existed.
    async fn delete_code_map(&self, tenant_id: &str, project_id: &str) -> Result<bool>;

    /// List the project IDs with a stored CodeMap for this tenant.
    async fn list_projects(&self, tenant_id: &str) -> Result<Vec<String>>;

    // ========== Cached query results ==========

    /// Store a computed query result under `(tenant_id, query_hash)` with
    /// the given time-to-live.
    async fn save_cache(
        &self,
        tenant_id: &str,
        query_hash: &str,
        value: &serde_json::Value,
        ttl: Duration,
    ) -> Result<()>;

    /// Fetch a cached result. Expired entries are treated as absent.
    async fn get_cache(&self, tenant_id: &str, query_hash: &str)
        -> Result<Option<serde_json::Value>>;

    /// Delete one cached result. Returns `true` if an entry was deleted.
    async fn delete_cache(&self, tenant_id: &str, query_hash: &str) -> Result<bool>;

    /// Delete every cached result belonging to this tenant.
    ///
    /// Used when a CodeMap is overwritten, so a re-upload is never answered
    /// from a stale cache.
    async fn purge_cache(&self, tenant_id: &str) -> Result<()>;

    // ========== Access-control records ==========

    /// Persist an API-key record under the key's one-way hash. The key
    /// itself is never stored.
    async fn put_api_key(&self, key_hash: &str, record: &ApiKeyRecord) -> Result<()>;

    /// Fetch the record for a key hash, or `Ok(None)` for an unknown key.
    async fn get_api_key(&self, key_hash: &str) -> Result<Option<ApiKeyRecord>>;

    /// Fetch the registration rate-limit record for a source IP.
    async fn get_rate_limit(&self, source_ip: &str) -> Result<Option<RateLimitRecord>>;

    /// Persist the registration rate-limit record for a source IP.
    async fn save_rate_limit(&self, source_ip: &str, record: &RateLimitRecord) -> Result<()>;
}
