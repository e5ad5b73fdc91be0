//! The query engine: operation dispatch over an injected store.
//!
//! Every operation is stateless and short-lived. The engine loads the
//! tenant's CodeMap, rebuilds the graph index, runs the requested analysis,
//! and returns a plain structured value; nothing persists in memory between
//! requests. Query results are cached per tenant under a hash of the query
//! shape, with a TTL from configuration; cache failures are logged and never
//! fail the query.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::analysis::{
    aggregate_architecture, analyze_impact, check_breaking_change, AggregationLevel,
    ArchitectureReport, BreakingChangeReport, ImpactReport,
};
use crate::config::EngineConfig;
use crate::domain::CodeMap;
use crate::error::{Error, Result};
use crate::graph::{resolve_dependents, DependentsReport, GraphIndex};
use crate::storage::Store;

/// Dependency-impact query engine, scoped per call by `(tenant_id,
/// project_id)`.
pub struct QueryEngine {
    store: Arc<dyn Store>,
    cache_ttl: Duration,
}

impl QueryEngine {
    /// Create an engine with the default configuration.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_config(store, &EngineConfig::default())
    }

    /// Create an engine with an explicit configuration.
    #[must_use]
    pub fn with_config(store: Arc<dyn Store>, config: &EngineConfig) -> Self {
        Self {
            store,
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
        }
    }

    /// Validate and persist a CodeMap, replacing any previous document for
    /// this project as one atomic unit.
    ///
    /// The tenant's cached query results are purged (best effort) so a
    /// re-upload is never answered from a stale cache.
    ///
    /// # Errors
    ///
    /// `Error::Validation` rejects the whole document; nothing is persisted.
    pub async fn save_code_map(
        &self,
        tenant_id: &str,
        project_id: &str,
        code_map: &CodeMap,
    ) -> Result<()> {
        require_non_empty("tenant_id", tenant_id)?;
        require_non_empty("project_id", project_id)?;

        self.store
            .save_code_map(tenant_id, project_id, code_map)
            .await?;

        if let Err(e) = self.store.purge_cache(tenant_id).await {
            warn!(tenant_id, error = %e, "cache purge after save failed");
        }
        Ok(())
    }

    /// Delete the CodeMap for a project. Returns `true` if one existed.
    pub async fn delete_code_map(&self, tenant_id: &str, project_id: &str) -> Result<bool> {
        require_non_empty("tenant_id", tenant_id)?;
        require_non_empty("project_id", project_id)?;
        self.store.delete_code_map(tenant_id, project_id).await
    }

    /// List the tenant's projects with a stored CodeMap.
    pub async fn list_projects(&self, tenant_id: &str) -> Result<Vec<String>> {
        require_non_empty("tenant_id", tenant_id)?;
        self.store.list_projects(tenant_id).await
    }

    /// Who depends on `symbol`, directly and transitively.
    ///
    /// `depth` bounds the traversal (1 = direct only); `None` is unbounded.
    ///
    /// # Errors
    ///
    /// `Error::ProjectNotFound` if the project has no stored CodeMap;
    /// `Error::InvalidArgument` for an empty symbol.
    pub async fn get_dependents(
        &self,
        tenant_id: &str,
        project_id: &str,
        symbol: &str,
        depth: Option<u32>,
    ) -> Result<DependentsReport> {
        require_non_empty("symbol", symbol)?;
        let depth_arg = format!("{depth:?}");
        let query = self.query_hash(project_id, "get_dependents", &[symbol, &depth_arg]);

        self.cached(tenant_id, &query, || async {
            let code_map = self.load(tenant_id, project_id).await?;
            let index = GraphIndex::build(&code_map);
            Ok(resolve_dependents(&index, symbol, depth))
        })
        .await
    }

    /// Risk scoring and test suggestions for changing `symbol`.
    pub async fn get_impact_report(
        &self,
        tenant_id: &str,
        project_id: &str,
        symbol: &str,
        include_tests: bool,
    ) -> Result<ImpactReport> {
        require_non_empty("symbol", symbol)?;
        let tests_arg = include_tests.to_string();
        let query = self.query_hash(project_id, "get_impact_report", &[symbol, &tests_arg]);

        self.cached(tenant_id, &query, || async {
            let code_map = self.load(tenant_id, project_id).await?;
            let index = GraphIndex::build(&code_map);
            Ok(analyze_impact(&index, symbol, include_tests))
        })
        .await
    }

    /// Classify a proposed signature change for `symbol`.
    pub async fn check_breaking_change(
        &self,
        tenant_id: &str,
        project_id: &str,
        symbol: &str,
        new_signature: &str,
    ) -> Result<BreakingChangeReport> {
        require_non_empty("symbol", symbol)?;
        require_non_empty("new_signature", new_signature)?;
        let query = self.query_hash(
            project_id,
            "check_breaking_change",
            &[symbol, new_signature],
        );

        self.cached(tenant_id, &query, || async {
            let code_map = self.load(tenant_id, project_id).await?;
            let index = GraphIndex::build(&code_map);
            Ok(check_breaking_change(&index, symbol, new_signature))
        })
        .await
    }

    /// Module- or package-level architecture rollup.
    pub async fn get_architecture(
        &self,
        tenant_id: &str,
        project_id: &str,
        level: AggregationLevel,
    ) -> Result<ArchitectureReport> {
        let level_arg = level.to_string();
        let query = self.query_hash(project_id, "get_architecture", &[&level_arg]);

        self.cached(tenant_id, &query, || async {
            let code_map = self.load(tenant_id, project_id).await?;
            let index = GraphIndex::build(&code_map);
            Ok(aggregate_architecture(&index, level))
        })
        .await
    }

    /// Load the project's CodeMap or fail with `ProjectNotFound`.
    async fn load(&self, tenant_id: &str, project_id: &str) -> Result<CodeMap> {
        require_non_empty("tenant_id", tenant_id)?;
        require_non_empty("project_id", project_id)?;
        self.store
            .get_code_map(tenant_id, project_id)
            .await?
            .ok_or_else(|| Error::ProjectNotFound(project_id.to_string()))
    }

    /// Stable hash identifying a query's shape within one tenant.
    ///
    /// Every field is hashed with a length prefix, so field boundaries are
    /// unambiguous regardless of what characters the values contain.
    fn query_hash(&self, project_id: &str, operation: &str, args: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for part in [project_id, operation].iter().chain(args) {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Serve from the tenant's cache, or compute and cache the result.
    ///
    /// Cache reads and writes are best effort: a failing cache degrades to
    /// recomputation, never to a failed query.
    async fn cached<T, F, Fut>(&self, tenant_id: &str, query_hash: &str, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        match self.store.get_cache(tenant_id, query_hash).await {
            Ok(Some(value)) => {
                if let Ok(result) = serde_json::from_value(value) {
                    debug!(tenant_id, query_hash, "cache hit");
                    return Ok(result);
                }
                // Undecodable entry (schema drift); fall through and recompute
            }
            Ok(None) => {}
            Err(e) => warn!(tenant_id, error = %e, "cache read failed"),
        }

        let result = compute().await?;

        match serde_json::to_value(&result) {
            Ok(value) => {
                if let Err(e) = self
                    .store
                    .save_cache(tenant_id, query_hash, &value, self.cache_ttl)
                    .await
                {
                    warn!(tenant_id, error = %e, "cache write failed");
                }
            }
            Err(e) => warn!(tenant_id, error = %e, "cache serialization failed"),
        }

        Ok(result)
    }
}

/// Argument validation happens before any graph computation; the message
/// names the offending field.
fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!(
            "{field} must be a non-empty string"
        )));
    }
    Ok(())
}
