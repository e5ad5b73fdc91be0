//! End-to-end query tests through the engine with in-memory storage.
//!
//! These exercise the full path a request takes: argument validation,
//! document load, graph construction, analysis, and the per-tenant result
//! cache.

mod common;

use codemap::{
    AggregationLevel, EngineConfig, Error, MemoryStore, QueryEngine, RiskLevel,
};
use common::{edge, sample_code_map, symbol};
use std::sync::Arc;

fn engine() -> QueryEngine {
    QueryEngine::new(Arc::new(MemoryStore::new()))
}

#[tokio::test]
async fn dependents_query_end_to_end() {
    common::init_tracing();
    let engine = engine();
    engine
        .save_code_map("tenant-a", "authsvc", &sample_code_map())
        .await
        .unwrap();

    let report = engine
        .get_dependents("tenant-a", "authsvc", "auth.validate_token", None)
        .await
        .unwrap();

    assert_eq!(report.symbol, "auth.validate_token");
    assert_eq!(report.direct.len(), 3);
    assert_eq!(report.transitive.len(), 1);
    assert_eq!(report.transitive[0].symbol, "services.user_service");
    assert_eq!(report.total, 4);
}

#[tokio::test]
async fn depth_one_limits_to_direct_dependents() {
    let engine = engine();
    engine
        .save_code_map("tenant-a", "authsvc", &sample_code_map())
        .await
        .unwrap();

    let report = engine
        .get_dependents("tenant-a", "authsvc", "auth.validate_token", Some(1))
        .await
        .unwrap();

    assert_eq!(report.direct.len(), 3);
    assert!(report.transitive.is_empty());
}

#[tokio::test]
async fn impact_query_end_to_end() {
    let engine = engine();
    engine
        .save_code_map("tenant-a", "authsvc", &sample_code_map())
        .await
        .unwrap();

    let report = engine
        .get_impact_report("tenant-a", "authsvc", "auth.validate_token", true)
        .await
        .unwrap();

    // 3 direct + 1 transitive across api.py, middleware.py, services.py
    assert_eq!(
        report.affected_files,
        vec!["api.py", "middleware.py", "services.py"]
    );
    assert_eq!(report.risk_score, 48);
    assert_eq!(report.risk_level, RiskLevel::Medium);
    assert_eq!(
        report.suggested_tests,
        Some(vec!["tests.test_api.test_login".to_string()])
    );
    assert!(report.summary.contains("MEDIUM"));
}

#[tokio::test]
async fn breaking_change_query_end_to_end() {
    let engine = engine();
    engine
        .save_code_map("tenant-a", "authsvc", &sample_code_map())
        .await
        .unwrap();

    let report = engine
        .check_breaking_change(
            "tenant-a",
            "authsvc",
            "auth.validate_token",
            "def validate_token(token, audience)",
        )
        .await
        .unwrap();

    assert!(report.breaking);
    assert_eq!(report.breaking_callers.len(), 4);
    assert!(report.safe_callers.is_empty());
}

#[tokio::test]
async fn architecture_query_end_to_end() {
    let engine = engine();
    engine
        .save_code_map("tenant-a", "authsvc", &sample_code_map())
        .await
        .unwrap();

    let report = engine
        .get_architecture("tenant-a", "authsvc", AggregationLevel::Module)
        .await
        .unwrap();

    assert_eq!(report.level, AggregationLevel::Module);
    let names: Vec<&str> = report.aggregates.iter().map(|a| a.name.as_str()).collect();
    assert!(names.contains(&"auth.py"));
    assert!(names.contains(&"api.py"));
    assert!(report.cycles.is_empty());
}

#[tokio::test]
async fn unknown_project_is_project_not_found() {
    let engine = engine();

    let err = engine
        .get_dependents("tenant-a", "no-such-project", "auth.validate_token", None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ProjectNotFound(_)), "got {err}");
}

#[tokio::test]
async fn empty_symbol_is_rejected_before_loading() {
    let engine = engine();

    let err = engine
        .get_dependents("tenant-a", "authsvc", "   ", None)
        .await
        .unwrap_err();

    // Argument validation runs first, so a missing project never masks it
    assert!(matches!(err, Error::InvalidArgument(_)), "got {err}");
}

#[tokio::test]
async fn cached_result_survives_document_deletion() {
    let engine = engine();
    engine
        .save_code_map("tenant-a", "authsvc", &sample_code_map())
        .await
        .unwrap();

    let first = engine
        .get_dependents("tenant-a", "authsvc", "auth.validate_token", None)
        .await
        .unwrap();

    assert!(engine.delete_code_map("tenant-a", "authsvc").await.unwrap());

    // Identical query is answered from cache
    let cached = engine
        .get_dependents("tenant-a", "authsvc", "auth.validate_token", None)
        .await
        .unwrap();
    assert_eq!(cached.total, first.total);

    // A query with different arguments misses and hits the missing document
    let err = engine
        .get_dependents("tenant-a", "authsvc", "auth.validate_token", Some(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProjectNotFound(_)));
}

#[tokio::test]
async fn saving_a_new_document_invalidates_cached_results() {
    let engine = engine();

    let mut v1 = sample_code_map();
    v1.dependencies = vec![edge("api.login", "auth.validate_token")];
    engine
        .save_code_map("tenant-a", "authsvc", &v1)
        .await
        .unwrap();

    let before = engine
        .get_dependents("tenant-a", "authsvc", "auth.validate_token", None)
        .await
        .unwrap();
    assert_eq!(before.total, 1);

    engine
        .save_code_map("tenant-a", "authsvc", &sample_code_map())
        .await
        .unwrap();

    let after = engine
        .get_dependents("tenant-a", "authsvc", "auth.validate_token", None)
        .await
        .unwrap();
    assert_eq!(after.total, 4);
}

#[tokio::test]
async fn saving_the_identical_document_twice_is_idempotent() {
    let engine = engine();
    let map = sample_code_map();

    engine.save_code_map("tenant-a", "authsvc", &map).await.unwrap();
    let first = engine
        .get_impact_report("tenant-a", "authsvc", "auth.validate_token", true)
        .await
        .unwrap();

    engine.save_code_map("tenant-a", "authsvc", &map).await.unwrap();
    let second = engine
        .get_impact_report("tenant-a", "authsvc", "auth.validate_token", true)
        .await
        .unwrap();

    assert_eq!(first.risk_score, second.risk_score);
    assert_eq!(first.affected_files, second.affected_files);
    assert_eq!(first.suggested_tests, second.suggested_tests);
    assert_eq!(first.summary, second.summary);
    assert_eq!(
        engine.list_projects("tenant-a").await.unwrap(),
        vec!["authsvc"]
    );
}

#[tokio::test]
async fn invalid_document_is_rejected_and_not_stored() {
    let engine = engine();

    let mut map = sample_code_map();
    map.version = "not-semver".to_string();
    let err = engine
        .save_code_map("tenant-a", "authsvc", &map)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "got {err}");

    assert!(engine
        .list_projects("tenant-a")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn tenants_cannot_see_each_other() {
    let engine = engine();
    engine
        .save_code_map("tenant-a", "authsvc", &sample_code_map())
        .await
        .unwrap();

    let err = engine
        .get_dependents("tenant-b", "authsvc", "auth.validate_token", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProjectNotFound(_)));

    assert_eq!(
        engine.list_projects("tenant-a").await.unwrap(),
        vec!["authsvc"]
    );
    assert!(engine.list_projects("tenant-b").await.unwrap().is_empty());
}

#[tokio::test]
async fn list_and_delete_manage_the_project_catalog() {
    let engine = engine();
    engine
        .save_code_map("tenant-a", "svc-b", &sample_code_map())
        .await
        .unwrap();
    engine
        .save_code_map("tenant-a", "svc-a", &sample_code_map())
        .await
        .unwrap();

    assert_eq!(
        engine.list_projects("tenant-a").await.unwrap(),
        vec!["svc-a", "svc-b"]
    );

    assert!(engine.delete_code_map("tenant-a", "svc-a").await.unwrap());
    assert!(!engine.delete_code_map("tenant-a", "svc-a").await.unwrap());
    assert_eq!(
        engine.list_projects("tenant-a").await.unwrap(),
        vec!["svc-b"]
    );
}

#[tokio::test]
async fn zero_ttl_config_disables_cache_reuse() {
    let store = Arc::new(MemoryStore::new());
    let config = EngineConfig {
        cache_ttl_secs: 0,
        ..EngineConfig::default()
    };
    let engine = QueryEngine::with_config(store, &config);

    engine
        .save_code_map("tenant-a", "authsvc", &sample_code_map())
        .await
        .unwrap();
    engine
        .get_dependents("tenant-a", "authsvc", "auth.validate_token", None)
        .await
        .unwrap();

    // With an expired-on-write cache the deleted document is not served
    engine.delete_code_map("tenant-a", "authsvc").await.unwrap();
    let err = engine
        .get_dependents("tenant-a", "authsvc", "auth.validate_token", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProjectNotFound(_)));
}

#[tokio::test]
async fn dangling_edge_targets_resolve_with_sentinel_location() {
    let engine = engine();

    let mut map = sample_code_map();
    map.dependencies.push(edge("ghost.caller", "auth.validate_token"));
    engine
        .save_code_map("tenant-a", "authsvc", &map)
        .await
        .unwrap();

    let report = engine
        .get_dependents("tenant-a", "authsvc", "auth.validate_token", Some(1))
        .await
        .unwrap();

    let ghost = report
        .direct
        .iter()
        .find(|d| d.symbol == "ghost.caller")
        .expect("dangling caller should still be reported");
    assert_eq!(ghost.file, "<unknown>");
    assert_eq!(ghost.line, 0);
}

#[tokio::test]
async fn architecture_reports_cycles_between_modules() {
    let engine = engine();

    let map = codemap::CodeMap {
        version: "1.0.0".to_string(),
        generated_at: "2026-01-15T10:30:00Z".to_string(),
        source_root: "/repo".to_string(),
        symbols: vec![
            symbol("orders.place", "orders.py", 1),
            symbol("billing.charge", "billing.py", 1),
        ],
        dependencies: vec![
            edge("orders.place", "billing.charge"),
            edge("billing.charge", "orders.place"),
        ],
    };
    engine
        .save_code_map("tenant-a", "shop", &map)
        .await
        .unwrap();

    let report = engine
        .get_architecture("tenant-a", "shop", AggregationLevel::Module)
        .await
        .unwrap();

    assert_eq!(report.cycles.len(), 1);
    assert!(report.summary.contains("1 circular dependency"));
}
