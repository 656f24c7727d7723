//! Logical-inference rules. Each derived edge carries the provenance needed
//! to re-derive it from its sources alone.
//!
//! All three check for an existing edge before inserting, so reapplying a
//! rule to its own output adds nothing.

use super::CanonRule;
use crate::primitives::{
    EDGE_ACCEPT, EDGE_HAS, EDGE_IMPLIES, EDGE_LINK, EDGE_NEGATED, EDGE_ONE_OF, EDGE_RELATED,
    LABEL_SYLLOGISM_TARGET,
};
use crate::{Artifact, Edge, EdgeKey, Provenance, ProvenanceKind};
use std::collections::{BTreeMap, BTreeSet};

/// Hypothetical syllogism: `LINK(a, b)` with `b` labeled `B` yields `RELATED(a, b)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelatedFromLinkToLabel;

impl RelatedFromLinkToLabel {
    /// Registry name.
    pub const NAME: &'static str = "related-from-link-to-label";
}

impl CanonRule for RelatedFromLinkToLabel {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, artifact: &Artifact) -> Artifact {
        let targets: BTreeSet<&str> = artifact
            .nodes
            .iter()
            .filter(|n| n.has_label(LABEL_SYLLOGISM_TARGET))
            .map(|n| n.id.as_str())
            .collect();
        let mut known = artifact.edge_keys();
        let mut out = artifact.clone();

        for link in artifact.edges_of_type(EDGE_LINK) {
            if !targets.contains(link.to.as_str()) {
                continue;
            }
            let key = EdgeKey::new(EDGE_RELATED, &link.from, &link.to);
            if known.insert(key.clone()) {
                let provenance =
                    Provenance::new(ProvenanceKind::Hypothetical, Self::NAME, vec![link.key()]);
                out.edges.push(Edge::derived(key, &provenance));
            }
        }
        out
    }
}

/// `HAS(s, f)` and `IMPLIES(f, c)` yield `ONE_OF(s, c)`.
///
/// One edge per distinct `(s, c)`; its provenance is the first
/// `HAS`/`IMPLIES` pair that produced it.
#[derive(Debug, Clone, Copy, Default)]
pub struct HypothesizeFromConjunction;

impl HypothesizeFromConjunction {
    /// Registry name.
    pub const NAME: &'static str = "hypothesize-from-conjunction";
}

impl CanonRule for HypothesizeFromConjunction {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, artifact: &Artifact) -> Artifact {
        let mut implications: BTreeMap<&str, Vec<&Edge>> = BTreeMap::new();
        for implies in artifact.edges_of_type(EDGE_IMPLIES) {
            implications.entry(implies.from.as_str()).or_default().push(implies);
        }
        let mut known = artifact.edge_keys();
        let mut out = artifact.clone();

        for has in artifact.edges_of_type(EDGE_HAS) {
            let Some(consequences) = implications.get(has.to.as_str()) else {
                continue;
            };
            for implies in consequences {
                let key = EdgeKey::new(EDGE_ONE_OF, &has.from, &implies.to);
                if known.insert(key.clone()) {
                    let provenance = Provenance::new(
                        ProvenanceKind::Hypothetical,
                        Self::NAME,
                        vec![has.key(), implies.key()],
                    );
                    out.edges.push(Edge::derived(key, &provenance));
                }
            }
        }
        out
    }
}

/// Disjunctive syllogism over `ONE_OF(s, ·)` minus `NEGATED(s, ·)`.
///
/// When exactly one option survives, adds `ACCEPT(s, o)`. Provenance lists
/// every `ONE_OF` and every `NEGATED` edge of the subject, necessary or not.
/// Zero or several survivors add nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveDisjunction;

impl ResolveDisjunction {
    /// Registry name.
    pub const NAME: &'static str = "resolve-disjunction";
}

impl CanonRule for ResolveDisjunction {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, artifact: &Artifact) -> Artifact {
        let mut subjects: Vec<&str> = Vec::new();
        let mut options: BTreeMap<&str, Vec<&Edge>> = BTreeMap::new();
        for one_of in artifact.edges_of_type(EDGE_ONE_OF) {
            let entry = options.entry(one_of.from.as_str()).or_default();
            if entry.is_empty() {
                subjects.push(one_of.from.as_str());
            }
            entry.push(one_of);
        }
        let mut negations: BTreeMap<&str, Vec<&Edge>> = BTreeMap::new();
        for negated in artifact.edges_of_type(EDGE_NEGATED) {
            negations.entry(negated.from.as_str()).or_default().push(negated);
        }

        let mut known = artifact.edge_keys();
        let mut out = artifact.clone();

        for subject in subjects {
            let offered = options.get(subject).map(Vec::as_slice).unwrap_or_default();
            let denied = negations.get(subject).map(Vec::as_slice).unwrap_or_default();
            let excluded: BTreeSet<&str> = denied.iter().map(|e| e.to.as_str()).collect();

            let mut remaining: Vec<&str> = Vec::new();
            for edge in offered {
                let option = edge.to.as_str();
                if !excluded.contains(option) && !remaining.contains(&option) {
                    remaining.push(option);
                }
            }
            let [accepted] = remaining.as_slice() else {
                continue;
            };

            let key = EdgeKey::new(EDGE_ACCEPT, subject, *accepted);
            if known.insert(key.clone()) {
                let sources = offered
                    .iter()
                    .chain(denied.iter())
                    .map(|e| e.key())
                    .collect();
                let provenance = Provenance::new(ProvenanceKind::Disjunctive, Self::NAME, sources);
                out.edges.push(Edge::derived(key, &provenance));
            }
        }
        out
    }
}

// =============================================================================
// TESTS
// =============================================================================
