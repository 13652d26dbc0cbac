//! Tool catalog: the normalized tools of one connected backend.
//!
//! Provides:
//! - Exact, case-sensitive lookup
//! - Name-sorted listing
//! - "Did you mean" suggestions by Levenshtein edit distance

use std::collections::BTreeMap;

use crate::schema::{normalize, RawToolDescriptor, ToolDescriptor};

use super::types::SkippedTool;

// ─── ToolCatalog ─────────────────────────────────────────────────────────────

/// Immutable once built; shared behind an `Arc` for the session's lifetime.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl ToolCatalog {
    /// Normalize every raw descriptor. Failures are skipped and reported.
    pub fn build(raw: &[RawToolDescriptor]) -> (Self, Vec<SkippedTool>) {
        let mut tools = BTreeMap::new();
        let mut skipped = Vec::new();

        for descriptor in raw {
            match normalize(descriptor) {
                Ok(tool) => {
                    if tools.insert(tool.name.clone(), tool).is_some() {
                        tracing::warn!(tool = %descriptor.name, "duplicate tool name; keeping the last one");
                    }
                }
                Err(e) => {
                    tracing::warn!(tool = %descriptor.name, error = %e, "skipping tool with unusable schema");
                    skipped.push(SkippedTool {
                        name: descriptor.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        (Self { tools }, skipped)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    /// All tools, sorted by name.
    pub fn sorted(&self) -> Vec<&ToolDescriptor> {
        self.tools.values().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Closest tool name to `name`, ties broken alphabetically.
    ///
    /// With `max_distance` set, candidates further away are not suggested.
    pub fn closest(&self, name: &str, max_distance: Option<usize>) -> Option<String> {
        self.tools
            .keys()
            .map(|candidate| (levenshtein(name, candidate), candidate))
            .filter(|(dist, _)| max_distance.map_or(true, |max| *dist <= max))
            .min()
            .map(|(_, candidate)| candidate.clone())
    }
}

// ─── Edit Distance ───────────────────────────────────────────────────────────

/// Levenshtein edit distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let n = b.len();

    // Single-row DP
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

// ─── Tests ───────────────────────────────────────────────────────────────────
