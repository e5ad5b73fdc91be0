//! Module/package architecture aggregation.
//!
//! Rolls symbol-level edges up to aggregates (full file path for modules,
//! first path segment for packages), then reports per-aggregate fan-in and
//! fan-out, collapsed edge counts, hotspots, and circular dependencies.
//!
//! The aggregate graph uses petgraph's `DiGraph` with a node map keyed by
//! aggregate name; cycle enumeration is a depth-first search that reports
//! each distinct cycle once (rotations collapse onto one node-set).

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::graph::GraphIndex;

/// Hotspot threshold: aggregates with more distinct dependents than this
/// are flagged.
const HOTSPOT_THRESHOLD: usize = 5;

/// Dependent count above which a hotspot is HIGH rather than MEDIUM risk.
const HOTSPOT_HIGH_THRESHOLD: usize = 10;

/// Upper bound on reported cycles, to keep pathological graphs answerable.
const MAX_CYCLES: usize = 50;

/// Granularity of the rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationLevel {
    /// One aggregate per file
    Module,

    /// One aggregate per first path segment
    Package,
}

impl fmt::Display for AggregationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module => write!(f, "module"),
            Self::Package => write!(f, "package"),
        }
    }
}

/// Per-aggregate rollup statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateInfo {
    /// Aggregate name (file path or first path segment)
    pub name: String,

    /// Number of symbols rolled into this aggregate
    pub symbols: usize,

    /// Distinct *other* aggregates with at least one inbound edge
    pub dependents: usize,

    /// Distinct *other* aggregates with at least one outbound edge
    pub dependencies: usize,
}

/// A collapsed aggregate-to-aggregate edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateEdge {
    /// Source aggregate
    pub from: String,

    /// Target aggregate
    pub to: String,

    /// Number of underlying symbol-level edges collapsed into this one
    pub count: usize,
}

/// Risk band for a hotspot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HotspotRisk {
    /// 6-10 distinct dependents
    Medium,

    /// More than 10 distinct dependents
    High,
}

/// An aggregate with an unusually high distinct-dependent count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotspot {
    /// Aggregate name
    pub name: String,

    /// Distinct dependent aggregates
    pub dependents: usize,

    /// MEDIUM for 6-10, HIGH above 10
    pub risk: HotspotRisk,
}

/// Result of architecture aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureReport {
    /// Granularity used
    pub level: AggregationLevel,

    /// All aggregates, sorted by name
    pub aggregates: Vec<AggregateInfo>,

    /// Cross-aggregate edges, sorted by (from, to)
    pub edges: Vec<AggregateEdge>,

    /// Distinct cycles, each an ordered node sequence starting and ending
    /// at the same aggregate
    pub cycles: Vec<Vec<String>>,

    /// Aggregates with dependents above the threshold, sorted descending
    pub hotspots: Vec<Hotspot>,

    /// One-sentence human-readable summary
    pub summary: String,
}

/// Roll the symbol graph up to `level` aggregates.
///
/// Self-loops (edges within one aggregate) are excluded from dependent and
/// dependency counts and from the reported edge list. Edges whose endpoint
/// is not a declared symbol are skipped; without a symbol record there is no
/// file to aggregate by.
#[must_use]
pub fn aggregate_architecture(
    index: &GraphIndex<'_>,
    level: AggregationLevel,
) -> ArchitectureReport {
    // Symbol counts per aggregate
    let mut symbol_counts: BTreeMap<String, usize> = BTreeMap::new();
    for symbol in index.symbols() {
        *symbol_counts
            .entry(aggregate_key(&symbol.file, level))
            .or_default() += 1;
    }

    // Collapse symbol-level edges onto aggregate pairs
    let mut edge_counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for edge in index.edges() {
        let (Some(from_sym), Some(to_sym)) = (index.symbol(edge.from), index.symbol(edge.to))
        else {
            continue;
        };
        let from = aggregate_key(&from_sym.file, level);
        let to = aggregate_key(&to_sym.file, level);
        if from == to {
            continue;
        }
        *edge_counts.entry((from, to)).or_default() += 1;
    }

    // Distinct fan-in/fan-out per aggregate
    let mut inbound: HashMap<&str, HashSet<&str>> = HashMap::new();
    let mut outbound: HashMap<&str, HashSet<&str>> = HashMap::new();
    for (from, to) in edge_counts.keys() {
        inbound.entry(to).or_default().insert(from);
        outbound.entry(from).or_default().insert(to);
    }

    let aggregates: Vec<AggregateInfo> = symbol_counts
        .iter()
        .map(|(name, &symbols)| AggregateInfo {
            name: name.clone(),
            symbols,
            dependents: inbound.get(name.as_str()).map_or(0, HashSet::len),
            dependencies: outbound.get(name.as_str()).map_or(0, HashSet::len),
        })
        .collect();

    let edges: Vec<AggregateEdge> = edge_counts
        .iter()
        .map(|((from, to), &count)| AggregateEdge {
            from: from.clone(),
            to: to.clone(),
            count,
        })
        .collect();

    let cycles = find_cycles(&edge_counts);

    let mut hotspots: Vec<Hotspot> = aggregates
        .iter()
        .filter(|a| a.dependents > HOTSPOT_THRESHOLD)
        .map(|a| Hotspot {
            name: a.name.clone(),
            dependents: a.dependents,
            risk: if a.dependents > HOTSPOT_HIGH_THRESHOLD {
                HotspotRisk::High
            } else {
                HotspotRisk::Medium
            },
        })
        .collect();
    hotspots.sort_by(|a, b| b.dependents.cmp(&a.dependents).then(a.name.cmp(&b.name)));

    let summary = format!(
        "{} {}s, {} circular dependenc{}, {}",
        aggregates.len(),
        level,
        cycles.len(),
        if cycles.len() == 1 { "y" } else { "ies" },
        if hotspots.is_empty() {
            "no hotspots".to_string()
        } else {
            format!("{} hotspots", hotspots.len())
        },
    );

    ArchitectureReport {
        level,
        aggregates,
        edges,
        cycles,
        hotspots,
        summary,
    }
}

/// Aggregation key for a symbol's file at the given level.
fn aggregate_key(file: &str, level: AggregationLevel) -> String {
    match level {
        AggregationLevel::Module => file.to_string(),
        AggregationLevel::Package => file.split('/').next().unwrap_or(file).to_string(),
    }
}

/// Enumerate distinct cycles in the aggregate graph.
///
/// DFS from each node in sorted order; a cycle is recorded when the search
/// returns to its start. Rotations of the same cycle are deduplicated by
/// node-set.
fn find_cycles(edge_counts: &BTreeMap<(String, String), usize>) -> Vec<Vec<String>> {
    let mut graph: DiGraph<String, usize> = DiGraph::new();
    let mut node_map: BTreeMap<&str, NodeIndex> = BTreeMap::new();

    for (from, to) in edge_counts.keys() {
        for name in [from.as_str(), to.as_str()] {
            node_map
                .entry(name)
                .or_insert_with(|| graph.add_node(name.to_string()));
        }
    }
    for ((from, to), &count) in edge_counts {
        graph.add_edge(node_map[from.as_str()], node_map[to.as_str()], count);
    }

    let mut cycles: Vec<Vec<String>> = Vec::new();
    let mut seen_sets: HashSet<BTreeSet<String>> = HashSet::new();

    for &start in node_map.values() {
        let mut path = vec![start];
        let mut on_path: HashSet<NodeIndex> = HashSet::from([start]);
        dfs_cycles(
            &graph, start, start, &mut path, &mut on_path, &mut seen_sets, &mut cycles,
        );
        if cycles.len() >= MAX_CYCLES {
            break;
        }
    }

    cycles
}

fn dfs_cycles(
    graph: &DiGraph<String, usize>,
    start: NodeIndex,
    current: NodeIndex,
    path: &mut Vec<NodeIndex>,
    on_path: &mut HashSet<NodeIndex>,
    seen_sets: &mut HashSet<BTreeSet<String>>,
    cycles: &mut Vec<Vec<String>>,
) {
    if cycles.len() >= MAX_CYCLES {
        return;
    }

    for neighbor in graph.neighbors(current) {
        if neighbor == start {
            let node_set: BTreeSet<String> =
                path.iter().map(|&n| graph[n].clone()).collect();
            if seen_sets.insert(node_set) {
                let mut cycle: Vec<String> = path.iter().map(|&n| graph[n].clone()).collect();
                cycle.push(graph[start].clone());
                cycles.push(cycle);
            }
        } else if !on_path.contains(&neighbor) {
            path.push(neighbor);
            on_path.insert(neighbor);
            dfs_cycles(graph, start, neighbor, path, on_path, seen_sets, cycles);
            on_path.remove(&neighbor);
            path.pop();
        }
    }
}
