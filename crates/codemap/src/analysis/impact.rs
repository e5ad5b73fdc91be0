//! Impact analysis: blast-radius scoring and test suggestions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::graph::{resolve_dependents, Dependent, GraphIndex, UNKNOWN_LOCATION_FILE};

/// Risk bands for the 0-100 impact score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Score below 25
    Low,

    /// Score 25-49
    Medium,

    /// Score 50-74
    High,

    /// Score 75 and above
    Critical,
}

impl RiskLevel {
    fn from_score(score: u32) -> Self {
        match score {
            0..=24 => Self::Low,
            25..=49 => Self::Medium,
            50..=74 => Self::High,
            _ => Self::Critical,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Result of impact analysis for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactReport {
    /// The symbol being analyzed
    pub symbol: String,

    /// Direct dependents
    pub direct: Vec<Dependent>,

    /// Transitive dependents
    pub transitive: Vec<Dependent>,

    /// Deduplicated, sorted files across direct and transitive dependents
    pub affected_files: Vec<String>,

    /// `min(100, direct*10 + transitive*3 + files*5)`
    pub risk_score: u32,

    /// Band the score falls into
    pub risk_level: RiskLevel,

    /// Test symbols likely covering the affected files; present only when
    /// requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_tests: Option<Vec<String>>,

    /// One-sentence human-readable summary
    pub summary: String,
}

/// Compute the impact report for `symbol`.
///
/// Runs the dependents resolver with unbounded depth, then derives the
/// affected-file list, the deterministic risk score, and (when
/// `include_tests` is set) test suggestions based on file-naming heuristics.
/// Sentinel locations of dangling dependents are not counted as files.
#[must_use]
pub fn analyze_impact(index: &GraphIndex<'_>, symbol: &str, include_tests: bool) -> ImpactReport {
    let dependents = resolve_dependents(index, symbol, None);

    let affected_files: Vec<String> = dependents
        .direct
        .iter()
        .chain(&dependents.transitive)
        .map(|d| d.file.clone())
        .filter(|f| f != UNKNOWN_LOCATION_FILE)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let risk_score = risk_score(
        dependents.direct.len(),
        dependents.transitive.len(),
        affected_files.len(),
    );
    let risk_level = RiskLevel::from_score(risk_score);

    let suggested_tests = include_tests.then(|| suggest_tests(index, &affected_files));

    let summary = format!(
        "{risk_level} risk: {} dependents ({} direct, {} transitive) across {} files",
        dependents.total,
        dependents.direct.len(),
        dependents.transitive.len(),
        affected_files.len(),
    );

    ImpactReport {
        symbol: symbol.to_string(),
        direct: dependents.direct,
        transitive: dependents.transitive,
        affected_files,
        risk_score,
        risk_level,
        suggested_tests,
        summary,
    }
}

/// The deterministic 0-100 risk heuristic.
fn risk_score(direct: usize, transitive: usize, files: usize) -> u32 {
    let raw = direct as u64 * 10 + transitive as u64 * 3 + files as u64 * 5;
    u32::try_from(raw.min(100)).unwrap_or(100)
}

/// Collect test symbols whose file matches a test-naming pattern and whose
/// path mentions the base name of an affected file.
fn suggest_tests(index: &GraphIndex<'_>, affected_files: &[String]) -> Vec<String> {
    let mut suggestions = BTreeSet::new();

    for file in affected_files {
        let Some(base) = base_name(file) else {
            continue;
        };
        for symbol in index.symbols() {
            if is_test_file(&symbol.file) && symbol.file.contains(base) {
                suggestions.insert(symbol.qualified_name.clone());
            }
        }
    }

    suggestions.into_iter().collect()
}

/// Last path segment without its extension.
fn base_name(path: &str) -> Option<&str> {
    let segment = path.rsplit('/').next()?;
    let base = segment.split('.').next().unwrap_or(segment);
    (!base.is_empty()).then_some(base)
}

/// Test-file naming heuristic: `test_` prefix, `_test` stem suffix, or a
/// `.test.` infix (e.g. `auth.test.ts`).
fn is_test_file(path: &str) -> bool {
    let Some(segment) = path.rsplit('/').next() else {
        return false;
    };
    let stem = segment.split('.').next().unwrap_or(segment);
    stem.starts_with("test_") || stem.ends_with("_test") || segment.contains(".test.")
}
