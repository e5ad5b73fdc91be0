//! # CodeMap: Dependency-Impact Query Engine
//!
//! CodeMap answers "what breaks if I change this symbol?" over a
//! pre-extracted dependency graph. Clients upload a CodeMap document (the
//! symbols and dependency edges of a codebase, produced by an external
//! extractor); the engine validates it, stores it per tenant, and serves
//! graph queries: dependents resolution, impact scoring, breaking-change
//! classification, and architecture aggregation.
//!
//! ## Design Philosophy
//!
//! - **Query engine, not extractor** - graph construction from source code
//!   happens elsewhere; this crate consumes the resulting document
//! - **Stateless operations** - every query loads the stored document,
//!   rebuilds the index, computes, and returns; nothing lives between calls
//! - **Tenant isolation** - all storage is keyed by `(tenant_id, project_id)`
//!   and tenants can never observe each other's data
//! - **Facts, not judgments** - reports counts, scores, and classifications
//!   with the rules that produced them
//!
//! ## Quick Start
//!
//! ```no_run
//! use codemap::{MemoryStore, QueryEngine};
//! use std::sync::Arc;
//!
//! # async fn run(code_map: codemap::CodeMap) -> codemap::Result<()> {
//! let engine = QueryEngine::new(Arc::new(MemoryStore::new()));
//!
//! engine.save_code_map("tenant", "my-project", &code_map).await?;
//!
//! let report = engine
//!     .get_impact_report("tenant", "my-project", "auth.validate_token", true)
//!     .await?;
//! println!("{}", report.summary);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod analysis;
pub mod auth;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod graph;
pub mod storage;

pub use analysis::{
    AggregationLevel, ArchitectureReport, BreakingChangeReport, Hotspot, HotspotRisk,
    ImpactReport, RiskLevel,
};
pub use auth::{AccessControl, KeyValidation, RegisteredKey};
pub use config::EngineConfig;
pub use domain::{CodeMap, DependencyEdge, DependencyKind, Symbol, SymbolKind};
pub use engine::QueryEngine;
pub use error::{Error, Result};
pub use graph::{Dependent, DependentsReport};
pub use storage::{JsonFileStore, MemoryStore, Store};
