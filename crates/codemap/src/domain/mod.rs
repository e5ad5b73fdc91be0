//! Domain types for CodeMap documents.
//!
//! A `CodeMap` is the serialized artifact produced by an external analyzer:
//! a flat list of symbols plus the dependency edges between them. This module
//! owns the document schema and its validation. Parsing and validation happen
//! at the boundary; nothing malformed enters the graph engine.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{Error, Result};

/// A complete code-structure artifact for one project.
///
/// Stored and replaced as one atomic unit; there are no partial-field
/// updates. Symbols are unique by `qualified_name` within one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeMap {
    /// Analyzer schema version (semver, e.g. "1.2.0")
    pub version: String,

    /// When the artifact was generated (ISO-8601 / RFC-3339)
    pub generated_at: String,

    /// Root path the analyzer ran against
    pub source_root: String,

    /// All declared symbols
    pub symbols: Vec<Symbol>,

    /// Directed dependency edges between symbols
    pub dependencies: Vec<DependencyEdge>,
}

/// A named code entity with a source location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    /// Unique key within one CodeMap (e.g. "auth.validate_token")
    pub qualified_name: String,

    /// What kind of entity this is
    pub kind: SymbolKind,

    /// Source file, relative to `source_root`
    pub file: String,

    /// Line number (non-negative by construction)
    pub line: u32,

    /// Column number (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,

    /// Documentation string (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,

    /// Recorded signature, used by the breaking-change checker (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Kind of a declared symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// A module or file-level namespace
    Module,

    /// A class or type definition
    Class,

    /// A free function
    Function,

    /// A method on a class
    Method,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module => write!(f, "module"),
            Self::Class => write!(f, "class"),
            Self::Function => write!(f, "function"),
            Self::Method => write!(f, "method"),
        }
    }
}

/// A directed relationship between two symbols.
///
/// Endpoints are qualified names and are not required to resolve to a
/// declared [`Symbol`]; dangling references are tolerated and handled by the
/// resolver with a sentinel location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The depending symbol
    pub from_sym: String,

    /// The symbol being depended on
    pub to_sym: String,

    /// Relationship kind
    pub kind: DependencyKind,

    /// Call/use sites backing this edge. The same symbol pair may be
    /// connected by several sites; multiplicity is preserved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<EdgeLocation>>,
}

/// Kind of a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// `from_sym` calls `to_sym`
    Calls,

    /// `from_sym` imports `to_sym`
    Imports,

    /// `from_sym` inherits from `to_sym`
    Inherits,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Calls => write!(f, "calls"),
            Self::Imports => write!(f, "imports"),
            Self::Inherits => write!(f, "inherits"),
        }
    }
}

/// A single call/use site backing a dependency edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeLocation {
    /// Source file of the site
    pub file: String,

    /// Line number of the site
    pub line: u32,
}

impl CodeMap {
    /// Validate the full structural schema of this document.
    ///
    /// Checks, in order:
    /// - `version` is a `major.minor.patch` semver string
    /// - `generated_at` parses as RFC-3339
    /// - every symbol has a non-empty `qualified_name` and `file`
    /// - symbols are unique by `qualified_name`
    /// - every edge has non-empty endpoints
    ///
    /// Enum membership for `kind` and non-negative line numbers are enforced
    /// by the types themselves at deserialization time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first violation found. The
    /// caller rejects the whole document; nothing is persisted.
    pub fn validate(&self) -> Result<()> {
        if !is_semver(&self.version) {
            return Err(Error::Validation(format!(
                "version must be a semver string (major.minor.patch), got {:?}",
                self.version
            )));
        }

        if DateTime::parse_from_rfc3339(&self.generated_at).is_err() {
            return Err(Error::Validation(format!(
                "generated_at must be an RFC-3339 timestamp, got {:?}",
                self.generated_at
            )));
        }

        let mut seen = HashSet::with_capacity(self.symbols.len());
        for symbol in &self.symbols {
            if symbol.qualified_name.is_empty() {
                return Err(Error::Validation(
                    "symbol qualified_name must not be empty".to_string(),
                ));
            }
            if symbol.file.is_empty() {
                return Err(Error::Validation(format!(
                    "symbol {:?} has an empty file path",
                    symbol.qualified_name
                )));
            }
            if !seen.insert(symbol.qualified_name.as_str()) {
                return Err(Error::Validation(format!(
                    "duplicate symbol qualified_name {:?}",
                    symbol.qualified_name
                )));
            }
        }

        for edge in &self.dependencies {
            if edge.from_sym.is_empty() || edge.to_sym.is_empty() {
                return Err(Error::Validation(
                    "dependency edge endpoints must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Look up a declared symbol by qualified name.
    #[must_use]
    pub fn symbol(&self, qualified_name: &str) -> Option<&Symbol> {
        self.symbols
            .iter()
            .find(|s| s.qualified_name == qualified_name)
    }
}

/// Check for a plain `major.minor.patch` version string.
fn is_semver(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_map() -> CodeMap {
        CodeMap {
            version: "1.0.0".to_string(),
            generated_at: "2026-01-15T10:30:00Z".to_string(),
            source_root: "/repo".to_string(),
            symbols: vec![Symbol {
                qualified_name: "auth.validate_token".to_string(),
                kind: SymbolKind::Function,
                file: "auth.py".to_string(),
                line: 12,
                column: Some(0),
                docstring: None,
                signature: Some("def validate_token(token)".to_string()),
            }],
            dependencies: vec![DependencyEdge {
                from_sym: "api.login".to_string(),
                to_sym: "auth.validate_token".to_string(),
                kind: DependencyKind::Calls,
                locations: Some(vec![EdgeLocation {
                    file: "api.py".to_string(),
                    line: 44,
                }]),
            }],
        }
    }

    #[test]
    fn valid_map_passes_validation() {
        assert!(valid_map().validate().is_ok());
    }

    #[test]
    fn rejects_malformed_version() {
        for bad in ["1.0", "v1.0.0", "1.0.x", "", "1..0"] {
            let mut map = valid_map();
            map.version = bad.to_string();
            assert!(
                map.validate().is_err(),
                "version {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_malformed_timestamp() {
        let mut map = valid_map();
        map.generated_at = "yesterday".to_string();
        let err = map.validate().unwrap_err();
        assert!(err.to_string().contains("generated_at"));
    }

    #[test]
    fn rejects_duplicate_qualified_names() {
        let mut map = valid_map();
        let dup = map.symbols[0].clone();
        map.symbols.push(dup);
        let err = map.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_empty_edge_endpoint() {
        let mut map = valid_map();
        map.dependencies[0].to_sym = String::new();
        assert!(map.validate().is_err());
    }

    #[test]
    fn unknown_kind_fails_deserialization() {
        let json = r#"{
            "qualified_name": "a.b",
            "kind": "macro",
            "file": "a.py",
            "line": 1
        }"#;
        assert!(serde_json::from_str::<Symbol>(json).is_err());
    }

    #[test]
    fn negative_line_fails_deserialization() {
        let json = r#"{
            "qualified_name": "a.b",
            "kind": "function",
            "file": "a.py",
            "line": -3
        }"#;
        assert!(serde_json::from_str::<Symbol>(json).is_err());
    }

    #[test]
    fn dangling_edges_are_tolerated() {
        let mut map = valid_map();
        map.dependencies.push(DependencyEdge {
            from_sym: "ghost.caller".to_string(),
            to_sym: "auth.validate_token".to_string(),
            kind: DependencyKind::Imports,
            locations: None,
        });
        assert!(map.validate().is_ok());
    }

    #[test]
    fn round_trips_through_json() {
        let map = valid_map();
        let json = serde_json::to_string(&map).unwrap();
        let back: CodeMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.symbols[0].qualified_name, "auth.validate_token");
        assert_eq!(back.dependencies[0].kind, DependencyKind::Calls);
    }
}
