//! Breaking-change classification for signature edits.
//!
//! This is a lightweight parameter-list comparison, not full-language
//! parsing: it extracts the parenthesized parameter list, splits it on
//! top-level commas, and compares the ordered sequence of required
//! parameters. It is deliberately conservative; a symbol with no recorded
//! signature is classified as breaking.

use serde::{Deserialize, Serialize};

use crate::graph::{resolve_dependents, Dependent, GraphIndex};

/// Result of checking a proposed signature change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakingChangeReport {
    /// The symbol whose signature is changing
    pub symbol: String,

    /// Signature currently on record, if any
    pub old_signature: Option<String>,

    /// The proposed signature
    pub new_signature: String,

    /// Whether the change is classified as breaking
    pub breaking: bool,

    /// Why the classification was made
    pub reason: String,

    /// All current dependents, when the change is breaking
    pub breaking_callers: Vec<Dependent>,

    /// All current dependents, when the change is safe
    pub safe_callers: Vec<Dependent>,

    /// What to do about it
    pub suggestion: String,
}

/// One parsed parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Param {
    name: String,
    /// Has a default value, or is a variadic catch-all; callers need not
    /// pass it
    optional: bool,
}

/// Classify a proposed signature change for `symbol`.
///
/// The symbol's recorded signature is looked up in the index. All current
/// dependents (direct and transitive) are attributed as `breaking_callers`
/// or `safe_callers` depending on the classification.
#[must_use]
pub fn check_breaking_change(
    index: &GraphIndex<'_>,
    symbol: &str,
    new_signature: &str,
) -> BreakingChangeReport {
    let old_signature = index
        .symbol(symbol)
        .and_then(|s| s.signature.as_deref())
        .map(str::to_string);

    let dependents = resolve_dependents(index, symbol, None);
    let mut callers: Vec<Dependent> = dependents.direct;
    callers.extend(dependents.transitive);

    let (breaking, reason, suggestion) = match &old_signature {
        None => (
            true,
            "no prior signature on record".to_string(),
            "record the current signature first, or treat all callers as affected".to_string(),
        ),
        Some(old) => classify(old, new_signature),
    };

    let (breaking_callers, safe_callers) = if breaking {
        (callers, Vec::new())
    } else {
        (Vec::new(), callers)
    };

    BreakingChangeReport {
        symbol: symbol.to_string(),
        old_signature,
        new_signature: new_signature.to_string(),
        breaking,
        reason,
        breaking_callers,
        safe_callers,
        suggestion,
    }
}

/// Compare two signatures; returns (breaking, reason, suggestion).
fn classify(old: &str, new: &str) -> (bool, String, String) {
    let old_params = parse_params(old);
    let new_params = parse_params(new);

    if new_params.len() < old_params.len() {
        return (
            true,
            "parameter count decreased".to_string(),
            "deprecate the parameter instead of removing it, or introduce a new symbol name"
                .to_string(),
        );
    }

    let old_required: Vec<&str> = required_names(&old_params);
    let new_required: Vec<&str> = required_names(&new_params);

    if old_required != new_required {
        let same_set = {
            let mut a = old_required.clone();
            let mut b = new_required.clone();
            a.sort_unstable();
            b.sort_unstable();
            a == b
        };
        if same_set {
            return (
                true,
                "required parameter order changed".to_string(),
                "keep the parameter order stable, or introduce a new symbol name".to_string(),
            );
        }
        return (
            true,
            "a required parameter without a default was added".to_string(),
            "give the new parameter a default value, or introduce a new symbol name".to_string(),
        );
    }

    (
        false,
        "only trailing optional parameters or the return type changed".to_string(),
        "change is backward compatible; regenerate the code map after release".to_string(),
    )
}

fn required_names(params: &[Param]) -> Vec<&str> {
    params
        .iter()
        .filter(|p| !p.optional)
        .map(|p| p.name.as_str())
        .collect()
}

/// Extract the parameter list between the first balanced pair of
/// parentheses and split it on top-level commas.
fn parse_params(signature: &str) -> Vec<Param> {
    let Some(open) = signature.find('(') else {
        return Vec::new();
    };

    let body = &signature[open + 1..];
    let mut depth = 0usize;
    let mut current = String::new();
    let mut parts = Vec::new();

    for c in body.chars() {
        match c {
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' if depth == 0 => break,
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }

    parts
        .iter()
        .filter_map(|part| parse_param(part))
        .collect()
}

fn parse_param(raw: &str) -> Option<Param> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    // Variadic catch-alls never force callers to change
    let variadic = raw.starts_with('*');
    let has_default = split_top_level_eq(raw);

    let name_part = raw
        .split(['=', ':'])
        .next()
        .unwrap_or(raw)
        .trim()
        .trim_start_matches('*')
        .trim();

    Some(Param {
        name: name_part.to_string(),
        optional: variadic || has_default,
    })
}

/// Whether the parameter text contains a top-level `=` (a default value),
/// ignoring any inside nested brackets.
fn split_top_level_eq(raw: &str) -> bool {
    let mut depth = 0usize;
    for c in raw.chars() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            '=' if depth == 0 => return true,
            _ => {}
        }
    }
    false
}
