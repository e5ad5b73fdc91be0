//! File-backed storage: one JSON document per key.
//!
//! Layout under the store root:
//!
//! ```text
//! {root}/tenants/{tenant_id}/codemaps/{project_id}.json
//! {root}/tenants/{tenant_id}/cache/{query_hash}.json
//! {root}/auth/keys/{key_hash}.json
//! {root}/auth/ratelimit/{source_ip}.json
//! ```
//!
//! # Atomicity
//!
//! Writes go to a `.tmp` sibling first and are renamed into place. Renames
//! within one filesystem are atomic on POSIX, so a concurrent reader sees
//! either the previous document or the new one, never a partial write.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::auth::{ApiKeyRecord, RateLimitRecord};
use crate::domain::CodeMap;
use crate::error::{Error, Result};
use crate::storage::{CacheEntry, Store};

/// Persistent store writing one JSON file per record.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `root`. Directories are created lazily on
    /// first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn code_map_path(&self, tenant_id: &str, project_id: &str) -> Result<PathBuf> {
        Ok(self
            .root
            .join("tenants")
            .join(safe_component(tenant_id, "tenant_id")?)
            .join("codemaps")
            .join(format!("{}.json", safe_component(project_id, "project_id")?)))
    }

    fn cache_dir(&self, tenant_id: &str) -> Result<PathBuf> {
        Ok(self
            .root
            .join("tenants")
            .join(safe_component(tenant_id, "tenant_id")?)
            .join("cache"))
    }

    fn cache_path(&self, tenant_id: &str, query_hash: &str) -> Result<PathBuf> {
        Ok(self
            .cache_dir(tenant_id)?
            .join(format!("{}.json", safe_component(query_hash, "query_hash")?)))
    }

    fn api_key_path(&self, key_hash: &str) -> Result<PathBuf> {
        Ok(self
            .root
            .join("auth")
            .join("keys")
            .join(format!("{}.json", safe_component(key_hash, "key_hash")?)))
    }

    fn rate_limit_path(&self, source_ip: &str) -> PathBuf {
        // IPv6 addresses contain colons, which some filesystems reject
        let name: String = source_ip
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '-' })
            .collect();
        self.root
            .join("auth")
            .join("ratelimit")
            .join(format!("{name}.json"))
    }
}

/// Reject key components that could escape the store root.
fn safe_component<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains('/')
        || value.contains('\\')
    {
        return Err(Error::InvalidArgument(format!(
            "{field} {value:?} is not a valid storage key component"
        )));
    }
    Ok(value)
}

/// Atomically write `contents` to `path`, creating parent directories.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(".tmp");
    let temp_path = PathBuf::from(temp_path);

    if let Err(e) = tokio::fs::write(&temp_path, contents).await {
        // Best-effort cleanup of the temp file
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}

/// Read a file, mapping "no such file" to `None`.
async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Delete a file, reporting whether it existed.
async fn remove_optional(path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn save_code_map(
        &self,
        tenant_id: &str,
        project_id: &str,
        code_map: &CodeMap,
    ) -> Result<()> {
        code_map.validate()?;
        let path = self.code_map_path(tenant_id, project_id)?;
        let contents = serde_json::to_vec_pretty(code_map)?;
        write_atomic(&path, &contents).await?;
        debug!(tenant_id, project_id, path = %path.display(), "stored code map");
        Ok(())
    }

    async fn get_code_map(&self, tenant_id: &str, project_id: &str) -> Result<Option<CodeMap>> {
        let path = self.code_map_path(tenant_id, project_id)?;
        let Some(bytes) = read_optional(&path).await? else {
            return Ok(None);
        };

        // A present-but-undecodable document is corruption, not absence
        let code_map: CodeMap = serde_json::from_slice(&bytes).map_err(|e| {
            Error::Validation(format!(
                "stored code map for project {project_id:?} is corrupted: {e}"
            ))
        })?;
        code_map.validate()?;
        Ok(Some(code_map))
    }

    async fn delete_code_map(&self, tenant_id: &str, project_id: &str) -> Result<bool> {
        remove_optional(&self.code_map_path(tenant_id, project_id)?).await
    }

    async fn list_projects(&self, tenant_id: &str) -> Result<Vec<String>> {
        let dir = self
            .root
            .join("tenants")
            .join(safe_component(tenant_id, "tenant_id")?)
            .join("codemaps");

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut projects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(project) = name.to_string_lossy().strip_suffix(".json") {
                projects.push(project.to_string());
            }
        }
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
        let entry = CacheEntry::new(value.clone(), ttl);
        let contents = serde_json::to_vec(&entry)?;
        write_atomic(&self.cache_path(tenant_id, query_hash)?, &contents).await
    }

    async fn get_cache(
        &self,
        tenant_id: &str,
        query_hash: &str,
    ) -> Result<Option<serde_json::Value>> {
        let path = self.cache_path(tenant_id, query_hash)?;
        let Some(bytes) = read_optional(&path).await? else {
            return Ok(None);
        };

        // An unreadable cache entry is dropped rather than surfaced; the
        // result it held can always be recomputed
        let Ok(entry) = serde_json::from_slice::<CacheEntry>(&bytes) else {
            let _ = remove_optional(&path).await;
            return Ok(None);
        };
        if entry.is_expired() {
            let _ = remove_optional(&path).await;
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    async fn delete_cache(&self, tenant_id: &str, query_hash: &str) -> Result<bool> {
        remove_optional(&self.cache_path(tenant_id, query_hash)?).await
    }

    async fn purge_cache(&self, tenant_id: &str) -> Result<()> {
        let dir = self.cache_dir(tenant_id)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn put_api_key(&self, key_hash: &str, record: &ApiKeyRecord) -> Result<()> {
        let contents = serde_json::to_vec(record)?;
        write_atomic(&self.api_key_path(key_hash)?, &contents).await
    }

    async fn get_api_key(&self, key_hash: &str) -> Result<Option<ApiKeyRecord>> {
        let Some(bytes) = read_optional(&self.api_key_path(key_hash)?).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn get_rate_limit(&self, source_ip: &str) -> Result<Option<RateLimitRecord>> {
        let Some(bytes) = read_optional(&self.rate_limit_path(source_ip)).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save_rate_limit(&self, source_ip: &str, record: &RateLimitRecord) -> Result<()> {
        let contents = serde_json::to_vec(record)?;
        write_atomic(&self.rate_limit_path(source_ip), &contents).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_component_rejects_traversal() {
        assert!(safe_component("proj", "project_id").is_ok());
        assert!(safe_component("..", "project_id").is_err());
        assert!(safe_component("a/b", "project_id").is_err());
        assert!(safe_component("a\\b", "project_id").is_err());
        assert!(safe_component("", "project_id").is_err());
    }

    #[test]
    fn rate_limit_path_sanitizes_ipv6() {
        let store = JsonFileStore::new("/tmp/store");
        let path = store.rate_limit_path("2001:db8::1");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(!name.contains(':'), "got {name}");
    }
}
