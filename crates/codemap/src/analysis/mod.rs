//! Analysis operations built on the graph index.
//!
//! Each operation is a pure function over an in-memory [`GraphIndex`]:
//! impact scoring, breaking-change classification, and module/package
//! architecture aggregation.
//!
//! [`GraphIndex`]: crate::graph::GraphIndex

mod architecture;
mod breaking;
mod impact;

pub use architecture::{
    aggregate_architecture, AggregateEdge, AggregateInfo, AggregationLevel, ArchitectureReport,
    Hotspot, HotspotRisk,
};
pub use breaking::{check_breaking_change, BreakingChangeReport};
pub use impact::{analyze_impact, ImpactReport, RiskLevel};
