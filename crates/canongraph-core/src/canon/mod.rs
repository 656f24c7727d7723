//! # Canon Rule Pipeline
//!
//! Ordered, pure `Artifact → Artifact` transforms.
//!
//! - Every rule takes the artifact by reference and returns a new one
//! - Every rule is idempotent: applying it to its own output changes nothing
//! - Ordering is caller-controlled; no rule observes a later rule's output
//!
//! Structural rules (dedupe, token inference, counts) form the default
//! pipeline. Logical-inference rules add provenance-tagged edges and are
//! opt-in.

mod logical;
mod structural;

pub use logical::{HypothesizeFromConjunction, RelatedFromLinkToLabel, ResolveDisjunction};
pub use structural::{DedupeEdges, InferTokensFromTerms, RecomputeCounts};

use crate::{Artifact, CanonError};

// =============================================================================
// CANON RULE TRAIT
// =============================================================================

/// A pure, idempotent artifact transform.
pub trait CanonRule: Send + Sync {
    /// Stable rule name, also recorded in provenance.
    fn name(&self) -> &'static str;

    /// Produce a new artifact. The input is never modified.
    fn apply(&self, artifact: &Artifact) -> Artifact;
}

/// Left-fold `rules` over `artifact`.
#[must_use]
pub fn apply_canon_rules(artifact: &Artifact, rules: &[&dyn CanonRule]) -> Artifact {
    rules.iter().fold(artifact.clone(), |current, rule| {
        tracing::debug!(rule = rule.name(), "applying canon rule");
        rule.apply(&current)
    })
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Names of the structural rules, in default order.
pub const DEFAULT_RULE_NAMES: [&str; 3] = [
    DedupeEdges::NAME,
    InferTokensFromTerms::NAME,
    RecomputeCounts::NAME,
];

/// Names of the logical-inference rules.
pub const LOGICAL_RULE_NAMES: [&str; 3] = [
    RelatedFromLinkToLabel::NAME,
    HypothesizeFromConjunction::NAME,
    ResolveDisjunction::NAME,
];

/// Look up a rule by name.
///
/// Returns `CanonError::UnknownRule` naming the identifier otherwise.
pub fn rule_by_name(name: &str) -> Result<Box<dyn CanonRule>, CanonError> {
    let rule: Box<dyn CanonRule> = match name {
        DedupeEdges::NAME => Box::new(DedupeEdges),
        InferTokensFromTerms::NAME => Box::new(InferTokensFromTerms),
        RecomputeCounts::NAME => Box::new(RecomputeCounts),
        RelatedFromLinkToLabel::NAME => Box::new(RelatedFromLinkToLabel),
        HypothesizeFromConjunction::NAME => Box::new(HypothesizeFromConjunction),
        ResolveDisjunction::NAME => Box::new(ResolveDisjunction),
        other => return Err(CanonError::UnknownRule(other.to_string())),
    };
    Ok(rule)
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Node and edge deltas produced by one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    /// Rule name.
    pub rule: &'static str,
    /// Node count before the stage.
    pub nodes_before: usize,
    /// Node count after the stage.
    pub nodes_after: usize,
    /// Edge count before the stage.
    pub edges_before: usize,
    /// Edge count after the stage.
    pub edges_after: usize,
}

/// An owned, ordered list of canon rules.
#[derive(Default)]
pub struct CanonPipeline {
    rules: Vec<Box<dyn CanonRule>>,
}

impl CanonPipeline {
    /// Create an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The structural rules: dedupe, infer tokens, recompute counts.
    #[must_use]
    pub fn structural() -> Self {
        Self::new()
            .with_rule(DedupeEdges)
            .with_rule(InferTokensFromTerms)
            .with_rule(RecomputeCounts)
    }

    /// Structural cleanup, then the logical rules, then counts.
    ///
    /// Hypothesis runs before resolution so a single pass realizes the
    /// conjunction → disjunction → acceptance chain.
    #[must_use]
    pub fn with_inference() -> Self {
        Self::new()
            .with_rule(DedupeEdges)
            .with_rule(InferTokensFromTerms)
            .with_rule(RelatedFromLinkToLabel)
            .with_rule(HypothesizeFromConjunction)
            .with_rule(ResolveDisjunction)
            .with_rule(RecomputeCounts)
    }

    /// Build a pipeline from rule names, in order.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, CanonError> {
        let rules = names
            .iter()
            .map(|name| rule_by_name(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Append a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: impl CanonRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Rule names, in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the pipeline has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule in order.
    #[must_use]
    pub fn run(&self, artifact: &Artifact) -> Artifact {
        let rules: Vec<&dyn CanonRule> = self.rules.iter().map(|r| r.as_ref()).collect();
        apply_canon_rules(artifact, &rules)
    }

    /// Run every rule in order, recording per-stage deltas.
    #[must_use]
    pub fn run_traced(&self, artifact: &Artifact) -> (Artifact, Vec<StageReport>) {
        let mut reports = Vec::with_capacity(self.rules.len());
        let mut current = artifact.clone();
        for rule in &self.rules {
            let next = rule.apply(&current);
            reports.push(StageReport {
                rule: rule.name(),
                nodes_before: current.nodes.len(),
                nodes_after: next.nodes.len(),
                edges_before: current.edges.len(),
                edges_after: next.edges.len(),
            });
            tracing::debug!(
                rule = rule.name(),
                edges_before = current.edges.len(),
                edges_after = next.edges.len(),
                "canon stage applied"
            );
            current = next;
        }
        (current, reports)
    }
}

impl std::fmt::Debug for CanonPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanonPipeline")
            .field("rules", &self.names())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
