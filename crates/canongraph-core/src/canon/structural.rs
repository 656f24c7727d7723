//! Structural cleanup rules: dedupe, token inference, counts.

use super::CanonRule;
use crate::binding::stringify;
use crate::primitives::{LABEL_CLAUSE, LABEL_HLO};
use crate::{Artifact, ClauseKind, EdgeKey};
use std::collections::{BTreeMap, BTreeSet};

/// Keep the first edge per `(type, from, to)`; later duplicates are dropped
/// without merging their props.
#[derive(Debug, Clone, Copy, Default)]
pub struct DedupeEdges;

impl DedupeEdges {
    /// Registry name.
    pub const NAME: &'static str = "dedupe-edges";
}

impl CanonRule for DedupeEdges {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, artifact: &Artifact) -> Artifact {
        let mut seen: BTreeSet<EdgeKey> = BTreeSet::new();
        let mut out = artifact.clone();
        out.edges.retain(|edge| seen.insert(edge.key()));
        out
    }
}

/// Fill an empty `tokens` list from the term records.
///
/// Unions every term's `tokens`, `signatureTokens`, `aliases`, and all tag
/// keys and tag values. Each tag value becomes one stringified token (arrays
/// join with commas). Does nothing once `tokens` is non-empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct InferTokensFromTerms;

impl InferTokensFromTerms {
    /// Registry name.
    pub const NAME: &'static str = "infer-tokens-from-terms";
}

impl CanonRule for InferTokensFromTerms {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, artifact: &Artifact) -> Artifact {
        let mut out = artifact.clone();
        if out.tokens.as_ref().is_some_and(|t| !t.is_empty()) {
            return out;
        }
        let Some(terms) = artifact.terms.as_ref() else {
            return out;
        };

        let mut tokens = BTreeSet::new();
        for term in terms {
            tokens.extend(term.tokens.iter().cloned());
            tokens.extend(term.signature_tokens.iter().cloned());
            tokens.extend(term.aliases.iter().cloned());
            for (key, value) in &term.tags {
                tokens.insert(key.clone());
                tokens.insert(stringify(value));
            }
        }
        tokens.remove("");

        out.tokens = Some(tokens.into_iter().collect());
        out
    }
}

/// Replace `counts` with values derived from the current arrays and labels.
///
/// Keys: `hlos`, `clauses`, `asserts`, `tags`, `unknown`, `nodes`, `edges`.
/// Clause statistics come from the `clauses` array when present, otherwise
/// from `Clause`-labeled nodes and their `kind` prop.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecomputeCounts;

impl RecomputeCounts {
    /// Registry name.
    pub const NAME: &'static str = "recompute-counts";
}

impl CanonRule for RecomputeCounts {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, artifact: &Artifact) -> Artifact {
        let kinds: Vec<ClauseKind> = match artifact.clauses.as_ref() {
            Some(clauses) => clauses.iter().map(|c| c.kind).collect(),
            None => artifact
                .nodes
                .iter()
                .filter(|n| n.has_label(LABEL_CLAUSE))
                .map(|n| {
                    n.props
                        .get("kind")
                        .cloned()
                        .and_then(|k| serde_json::from_value(k).ok())
                        .unwrap_or(ClauseKind::Unknown)
                })
                .collect(),
        };
        let of_kind = |kind: ClauseKind| kinds.iter().filter(|k| **k == kind).count() as u64;

        let mut counts = BTreeMap::new();
        counts.insert(
            "hlos".to_string(),
            artifact.nodes.iter().filter(|n| n.has_label(LABEL_HLO)).count() as u64,
        );
        counts.insert("clauses".to_string(), kinds.len() as u64);
        counts.insert("asserts".to_string(), of_kind(ClauseKind::Assert));
        counts.insert("tags".to_string(), of_kind(ClauseKind::Tag));
        counts.insert("unknown".to_string(), of_kind(ClauseKind::Unknown));
        counts.insert("nodes".to_string(), artifact.nodes.len() as u64);
        counts.insert("edges".to_string(), artifact.edges.len() as u64);

        let mut out = artifact.clone();
        out.counts = Some(counts);
        out
    }
}

// =============================================================================
// TESTS
// =============================================================================
