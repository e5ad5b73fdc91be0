//! Breadth-first dependents resolution: "who depends on X".

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use crate::graph::GraphIndex;

/// Sentinel file for a dependent named by an edge but absent from the
/// symbol list.
pub const UNKNOWN_LOCATION_FILE: &str = "<unknown>";

/// Sentinel line paired with [`UNKNOWN_LOCATION_FILE`].
pub const UNKNOWN_LINE: u32 = 0;

/// One symbol that depends on the query target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependent {
    /// Qualified name of the dependent symbol
    pub symbol: String,

    /// Source file, or [`UNKNOWN_LOCATION_FILE`] for a dangling endpoint
    pub file: String,

    /// Line number, or [`UNKNOWN_LINE`] for a dangling endpoint
    pub line: u32,
}

/// Result of dependents resolution for one target symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependentsReport {
    /// The query target
    pub symbol: String,

    /// Symbols with an edge pointing directly at the target
    pub direct: Vec<Dependent>,

    /// Symbols reachable from a direct dependent via further reverse edges,
    /// excluding the target and anything already visited
    pub transitive: Vec<Dependent>,

    /// `direct.len() + transitive.len()`
    pub total: usize,
}

/// Resolve direct and transitive dependents of `symbol`.
///
/// Breadth-first over the reverse adjacency. The visited set guarantees
/// termination even through cycles, and the target itself never appears in
/// its own dependents. `max_depth` bounds the traversal (1 = direct only);
/// `None` is unbounded. Results are sorted by symbol name so the outcome is
/// independent of traversal order.
///
/// An unknown target is not an error: a symbol with no incoming edges simply
/// has zero dependents.
#[must_use]
pub fn resolve_dependents(
    index: &GraphIndex<'_>,
    symbol: &str,
    max_depth: Option<u32>,
) -> DependentsReport {
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(symbol);

    let mut direct = Vec::new();
    let mut queue: VecDeque<(&str, u32)> = VecDeque::new();

    for edge in index.incoming(symbol) {
        if visited.insert(edge.from) {
            direct.push(make_dependent(index, edge.from));
            queue.push_back((edge.from, 1));
        }
    }

    let mut transitive = Vec::new();
    while let Some((current, depth)) = queue.pop_front() {
        if let Some(max) = max_depth {
            if depth >= max {
                continue;
            }
        }
        for edge in index.incoming(current) {
            if visited.insert(edge.from) {
                transitive.push(make_dependent(index, edge.from));
                queue.push_back((edge.from, depth + 1));
            }
        }
    }

    direct.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    transitive.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let total = direct.len() + transitive.len();
    DependentsReport {
        symbol: symbol.to_string(),
        direct,
        transitive,
        total,
    }
}

fn make_dependent(index: &GraphIndex<'_>, name: &str) -> Dependent {
    match index.symbol(name) {
        Some(symbol) => Dependent {
            symbol: name.to_string(),
            file: symbol.file.clone(),
            line: symbol.line,
        },
        None => Dependent {
            symbol: name.to_string(),
            file: UNKNOWN_LOCATION_FILE.to_string(),
            line: UNKNOWN_LINE,
        },
    }
}
