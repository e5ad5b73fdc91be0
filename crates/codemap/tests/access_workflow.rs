//! The full multi-tenant workflow: register a key, derive the tenant,
//! upload a document under it, and query it back with a validated key.

mod common;

use anyhow::Result;
use codemap::auth::TENANT_ID_LEN;
use codemap::{AccessControl, JsonFileStore, QueryEngine};
use common::sample_code_map;
use std::sync::Arc;
use tempfile::tempdir;

#[tokio::test]
async fn register_upload_validate_query() -> Result<()> {
    let dir = tempdir()?;
    let store = Arc::new(JsonFileStore::new(dir.path()));
    let auth = AccessControl::new(store.clone());
    let engine = QueryEngine::new(store);

    let registered = auth.register("203.0.113.7").await?;
    assert_eq!(registered.tenant_id.len(), TENANT_ID_LEN);

    engine
        .save_code_map(&registered.tenant_id, "authsvc", &sample_code_map())
        .await?;

    // A later request presents the key and gets the same tenant back
    let validation = auth.validate(&registered.api_key).await;
    assert!(validation.valid);
    let tenant_id = validation.tenant_id.expect("valid key carries a tenant");
    assert_eq!(tenant_id, registered.tenant_id);

    let report = engine
        .get_dependents(&tenant_id, "authsvc", "auth.validate_token", None)
        .await?;
    assert_eq!(report.total, 4);
    Ok(())
}

#[tokio::test]
async fn keys_from_different_registrations_map_to_different_tenants() -> Result<()> {
    let dir = tempdir()?;
    let store = Arc::new(JsonFileStore::new(dir.path()));
    let auth = AccessControl::new(store.clone());
    let engine = QueryEngine::new(store);

    let first = auth.register("203.0.113.7").await?;
    let second = auth.register("203.0.113.8").await?;
    assert_ne!(first.tenant_id, second.tenant_id);

    engine
        .save_code_map(&first.tenant_id, "authsvc", &sample_code_map())
        .await?;

    // The second tenant sees an empty namespace
    assert!(engine.list_projects(&second.tenant_id).await?.is_empty());
    Ok(())
}
