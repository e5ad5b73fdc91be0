//! Graph construction and traversal over a CodeMap.
//!
//! The index is rebuilt from the stored document on every query and never
//! persisted; nodes are keyed by qualified name, so cyclic graphs need no
//! special ownership handling.

mod dependents;

pub use dependents::{
    resolve_dependents, Dependent, DependentsReport, UNKNOWN_LINE, UNKNOWN_LOCATION_FILE,
};

use std::collections::HashMap;

use crate::domain::{CodeMap, DependencyKind, Symbol};

/// A borrowed view of one dependency edge.
///
/// Multiple edges between the same symbol pair are kept as separate entries
/// (multiplicity is preserved); the architecture aggregator needs the counts.
#[derive(Debug, Clone, Copy)]
pub struct EdgeRef<'a> {
    /// The depending symbol
    pub from: &'a str,

    /// The symbol being depended on
    pub to: &'a str,

    /// Relationship kind
    pub kind: DependencyKind,
}

/// Forward and reverse adjacency over one CodeMap, plus a symbol lookup
/// table for location resolution.
pub struct GraphIndex<'a> {
    forward: HashMap<&'a str, Vec<EdgeRef<'a>>>,
    reverse: HashMap<&'a str, Vec<EdgeRef<'a>>>,
    symbols: HashMap<&'a str, &'a Symbol>,
    edge_count: usize,
}

impl<'a> GraphIndex<'a> {
    /// Build adjacency from a CodeMap's dependency list.
    #[must_use]
    pub fn build(code_map: &'a CodeMap) -> Self {
        let mut forward: HashMap<&str, Vec<EdgeRef<'_>>> = HashMap::new();
        let mut reverse: HashMap<&str, Vec<EdgeRef<'_>>> = HashMap::new();

        for dep in &code_map.dependencies {
            let edge = EdgeRef {
                from: dep.from_sym.as_str(),
                to: dep.to_sym.as_str(),
                kind: dep.kind,
            };
            forward.entry(edge.from).or_default().push(edge);
            reverse.entry(edge.to).or_default().push(edge);
        }

        let symbols = code_map
            .symbols
            .iter()
            .map(|s| (s.qualified_name.as_str(), s))
            .collect();

        Self {
            forward,
            reverse,
            symbols,
            edge_count: code_map.dependencies.len(),
        }
    }

    /// Edges leaving `symbol` (what it depends on).
    #[must_use]
    pub fn outgoing(&self, symbol: &str) -> &[EdgeRef<'a>] {
        self.forward.get(symbol).map_or(&[], Vec::as_slice)
    }

    /// Edges entering `symbol` (what depends on it).
    #[must_use]
    pub fn incoming(&self, symbol: &str) -> &[EdgeRef<'a>] {
        self.reverse.get(symbol).map_or(&[], Vec::as_slice)
    }

    /// All edges, in document order, multiplicity preserved.
    pub fn edges(&self) -> impl Iterator<Item = EdgeRef<'a>> + '_ {
        self.forward.values().flatten().copied()
    }

    /// Look up a declared symbol.
    #[must_use]
    pub fn symbol(&self, qualified_name: &str) -> Option<&'a Symbol> {
        self.symbols.get(qualified_name).copied()
    }

    /// All declared symbols.
    pub fn symbols(&self) -> impl Iterator<Item = &'a Symbol> + '_ {
        self.symbols.values().copied()
    }

    /// Number of symbol-level edges in the document.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}
