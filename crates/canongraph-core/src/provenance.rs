//! # Provenance
//!
//! Explain and replay for canon-derived edges.
//!
//! A derived edge stores `{kind, rule, sources}` under `props.provenance`.
//! Replaying the named rule over an artifact built from `sources` alone
//! must reproduce the edge.

use crate::canon::{CanonRule, rule_by_name};
use crate::primitives::PROP_PROVENANCE;
use crate::{Artifact, CanonError, Edge, EdgeKey, Provenance};
use std::collections::BTreeSet;

/// Source edges recorded on a derived edge.
///
/// Empty when the edge has no provenance or it is malformed.
#[must_use]
pub fn explain_derived_edge(edge: &Edge) -> Vec<EdgeKey> {
    edge.props
        .get(PROP_PROVENANCE)
        .and_then(|p| p.get("sources"))
        .and_then(|s| serde_json::from_value(s.clone()).ok())
        .unwrap_or_default()
}

/// The full provenance record, if present and well-formed.
#[must_use]
pub fn provenance_of(edge: &Edge) -> Option<Provenance> {
    let value = edge.props.get(PROP_PROVENANCE)?;
    serde_json::from_value(value.clone()).ok()
}

/// Edges carrying a well-formed provenance record, in artifact order.
pub fn derived_edges(artifact: &Artifact) -> impl Iterator<Item = (&Edge, Provenance)> {
    artifact
        .edges
        .iter()
        .filter_map(|edge| provenance_of(edge).map(|p| (edge, p)))
}

/// A minimal artifact whose edge set is exactly `sources`.
///
/// Nodes, terms and clauses are empty.
#[must_use]
pub fn artifact_from_sources(dataset: &str, sources: &[EdgeKey]) -> Artifact {
    let mut artifact = Artifact::new(dataset);
    artifact.edges = sources.iter().cloned().map(Edge::from_key).collect();
    artifact.terms = Some(Vec::new());
    artifact.clauses = Some(Vec::new());
    artifact
}

/// Like [`artifact_from_sources`], plus copies of the source endpoints
/// found in `origin`, so label-dependent rules can fire on replay.
#[must_use]
pub fn artifact_from_sources_with_nodes(
    dataset: &str,
    sources: &[EdgeKey],
    origin: &Artifact,
) -> Artifact {
    let mut artifact = artifact_from_sources(dataset, sources);
    let mut seen = BTreeSet::new();
    for id in sources.iter().flat_map(|s| [s.from.as_str(), s.to.as_str()]) {
        if !seen.insert(id) {
            continue;
        }
        if let Some(node) = origin.node(id) {
            artifact.nodes.push(node.clone());
        }
    }
    artifact
}

/// Whether `rule` re-derives `edge` from its recorded sources alone.
///
/// Edges without sources never replay.
#[must_use]
pub fn replays(rule: &dyn CanonRule, edge: &Edge, origin: &Artifact) -> bool {
    let sources = explain_derived_edge(edge);
    if sources.is_empty() {
        return false;
    }
    let minimal = artifact_from_sources_with_nodes(&origin.dataset, &sources, origin);
    rule.apply(&minimal)
        .has_edge(&edge.edge_type, &edge.from, &edge.to)
}

/// Replay `edge` through the rule named in its provenance.
///
/// Fails with `InvalidArtifact` when the edge has no provenance and with
/// `UnknownRule` when the recorded rule is not registered.
pub fn verify_derivation(edge: &Edge, origin: &Artifact) -> Result<bool, CanonError> {
    let provenance = provenance_of(edge).ok_or_else(|| {
        CanonError::InvalidArtifact(format!(
            "edge {}({}, {}) carries no provenance",
            edge.edge_type, edge.from, edge.to
        ))
    })?;
    let rule = rule_by_name(&provenance.rule)?;
    Ok(replays(rule.as_ref(), edge, origin))
}

// =============================================================================
// TESTS
// =============================================================================
