//! Common fixtures shared across integration tests.
#![allow(dead_code)]

use codemap::{CodeMap, DependencyEdge, DependencyKind, Symbol, SymbolKind};

/// Install a test subscriber honoring `RUST_LOG`. Safe to call from every
/// test; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A declared function symbol with defaults suitable for most tests.
pub fn symbol(qualified_name: &str, file: &str, line: u32) -> Symbol {
    Symbol {
        qualified_name: qualified_name.to_string(),
        kind: SymbolKind::Function,
        file: file.to_string(),
        line,
        column: None,
        docstring: None,
        signature: None,
    }
}

/// A `calls` edge without recorded locations.
pub fn edge(from: &str, to: &str) -> DependencyEdge {
    DependencyEdge {
        from_sym: from.to_string(),
        to_sym: to.to_string(),
        kind: DependencyKind::Calls,
        locations: None,
    }
}

/// A small auth-service code map: three direct callers of
/// `auth.validate_token`, one transitive caller reached through `api.login`,
/// and a test module covering the api file.
pub fn sample_code_map() -> CodeMap {
    let mut validate = symbol("auth.validate_token", "auth.py", 10);
    validate.signature = Some("def validate_token(token)".to_string());

    CodeMap {
        version: "1.0.0".to_string(),
        generated_at: "2026-01-15T10:30:00Z".to_string(),
        source_root: "/repo".to_string(),
        symbols: vec![
            validate,
            symbol("api.login", "api.py", 20),
            symbol("api.protected", "api.py", 40),
            symbol("middleware.check_auth", "middleware.py", 5),
            symbol("services.user_service", "services.py", 8),
            symbol("tests.test_api.test_login", "tests/test_api.py", 3),
        ],
        dependencies: vec![
            edge("api.login", "auth.validate_token"),
            edge("api.protected", "auth.validate_token"),
            edge("middleware.check_auth", "auth.validate_token"),
            edge("services.user_service", "api.login"),
        ],
    }
}
