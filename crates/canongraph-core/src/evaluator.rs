//! # Rule Evaluator
//!
//! A minimal Datalog: bounded forward chaining over an artifact's edges.
//!
//! - Rule bodies are evaluated left-to-right as nested-loop joins
//! - A rule short-circuits as soon as one literal yields no bindings
//! - Each round re-runs every rule over base + derived edges
//! - Evaluation stops at a fixpoint or after `max_iterations` rounds
//!
//! Derived edges are returned to the caller and never written back into
//! the artifact. No negation, stratification or aggregation.

use crate::binding::{Binding, Bound, edge_binding_key, join_bindings};
use crate::primitives::{DEFAULT_RULE_NAME, PROP_DERIVED_BY};
use crate::{Artifact, CanonError, Edge, EdgeKey, Node};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// RULE TYPES
// =============================================================================

/// A typed body predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Pred {
    /// `edge(type?, from, to)`: binds both endpoints and the matched edge.
    Edge {
        /// Edge type filter; any type when absent.
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        edge_type: Option<String>,
        /// Variable bound to the source node.
        from: String,
        /// Variable bound to the target node.
        to: String,
    },
    /// `label(v, label)`: binds `v` to every node carrying `label`.
    Label {
        /// Variable.
        v: String,
        /// Required label.
        label: String,
    },
    /// `propContains(v, path, value)`: case-insensitive substring match
    /// on the stringified value found at `path`.
    PropContains {
        /// Variable.
        v: String,
        /// Path walked through the node, e.g. `["props", "label"]`.
        path: Vec<String>,
        /// Needle.
        value: String,
    },
}

impl Pred {
    /// Variables this predicate binds.
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        match self {
            Self::Edge { from, to, .. } => vec![from.as_str(), to.as_str()],
            Self::Label { v, .. } | Self::PropContains { v, .. } => vec![v.as_str()],
        }
    }
}

/// A body literal. `negated` is reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Literal {
    /// The predicate.
    pub pred: Pred,
    /// Reserved; negated literals are skipped during evaluation.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub negated: bool,
}

impl Literal {
    /// A positive literal.
    #[must_use]
    pub fn new(pred: Pred) -> Self {
        Self {
            pred,
            negated: false,
        }
    }

    /// A negated literal.
    #[must_use]
    pub fn negated(pred: Pred) -> Self {
        Self {
            pred,
            negated: true,
        }
    }
}

/// The edge a rule derives: `type(from, to)` over body variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleHead {
    /// Type of the derived edge.
    #[serde(rename = "type")]
    pub edge_type: String,
    /// Variable naming the source node.
    pub from: String,
    /// Variable naming the target node.
    pub to: String,
}

/// A Datalog-lite rule: `head :- body`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule name, stamped as `derivedBy` on derived edges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Derived edge pattern.
    pub head: RuleHead,
    /// Body literals, evaluated in order.
    pub body: Vec<Literal>,
}

impl Rule {
    /// Create a rule deriving `edge_type(from, to)`.
    #[must_use]
    pub fn new(edge_type: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            name: None,
            head: RuleHead {
                edge_type: edge_type.into(),
                from: from.into(),
                to: to.into(),
            },
            body: Vec::new(),
        }
    }

    /// Name the rule.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append `edge(type?, from, to)`.
    #[must_use]
    pub fn edge(mut self, edge_type: Option<&str>, from: &str, to: &str) -> Self {
        self.body.push(Literal::new(Pred::Edge {
            edge_type: edge_type.map(str::to_string),
            from: from.to_string(),
            to: to.to_string(),
        }));
        self
    }

    /// Append `label(v, label)`.
    #[must_use]
    pub fn label(mut self, v: &str, label: &str) -> Self {
        self.body.push(Literal::new(Pred::Label {
            v: v.to_string(),
            label: label.to_string(),
        }));
        self
    }

    /// Append `propContains(v, path, value)`.
    #[must_use]
    pub fn prop_contains(mut self, v: &str, path: &[&str], value: &str) -> Self {
        self.body.push(Literal::new(Pred::PropContains {
            v: v.to_string(),
            path: path.iter().map(|s| s.to_string()).collect(),
            value: value.to_string(),
        }));
        self
    }

    /// Append an arbitrary literal.
    #[must_use]
    pub fn literal(mut self, literal: Literal) -> Self {
        self.body.push(literal);
        self
    }

    /// The name stamped on derived edges.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_RULE_NAME)
    }

    /// Validate a rule before it is evaluated on behalf of a caller.
    ///
    /// Rejects empty types/variables, head variables no positive literal
    /// binds, and negated literals (negation is not implemented).
    pub fn validate(&self) -> Result<(), CanonError> {
        let name = self.display_name();
        if self.head.edge_type.is_empty() || self.head.from.is_empty() || self.head.to.is_empty() {
            return Err(CanonError::InvalidRule(format!(
                "rule '{}' has an incomplete head",
                name
            )));
        }

        let mut bound = BTreeSet::new();
        for literal in &self.body {
            if literal.negated {
                return Err(CanonError::UnsupportedFeature(format!(
                    "negated literal in rule '{}'",
                    name
                )));
            }
            for var in literal.pred.variables() {
                if var.is_empty() {
                    return Err(CanonError::InvalidRule(format!(
                        "rule '{}' has an empty variable name",
                        name
                    )));
                }
                bound.insert(var);
            }
        }

        for var in [self.head.from.as_str(), self.head.to.as_str()] {
            if !bound.contains(var) {
                return Err(CanonError::InvalidRule(format!(
                    "head variable '{}' of rule '{}' is not bound by the body",
                    var, name
                )));
            }
        }

        Ok(())
    }
}

// =============================================================================
// EVALUATION
// =============================================================================

/// Outcome of one evaluator run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Evaluation {
    /// Derived edges, in derivation order.
    pub edges: Vec<Edge>,
    /// Rounds executed.
    pub iterations: usize,
    /// Whether a round added nothing before the cap was reached.
    pub converged: bool,
}

/// Derive edges from `rules` over `artifact`, up to `max_iterations` rounds.
///
/// Returns only the derived edges.
#[must_use]
pub fn evaluate_rules(artifact: &Artifact, rules: &[Rule], max_iterations: usize) -> Vec<Edge> {
    evaluate_rules_report(artifact, rules, max_iterations).edges
}

/// Like [`evaluate_rules`], but also reports rounds and convergence.
///
/// Hitting the cap stops evaluation and logs a warning.
#[must_use]
pub fn evaluate_rules_report(
    artifact: &Artifact,
    rules: &[Rule],
    max_iterations: usize,
) -> Evaluation {
    if rules.is_empty() {
        return Evaluation {
            converged: true,
            ..Evaluation::default()
        };
    }

    let mut nodes: BTreeMap<&str, &Node> = BTreeMap::new();
    for node in &artifact.nodes {
        nodes.entry(node.id.as_str()).or_insert(node);
    }

    let mut known: BTreeSet<EdgeKey> = artifact.edge_keys();
    let mut derived: Vec<Edge> = Vec::new();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iterations {
        iterations += 1;
        let mut added = 0usize;

        for rule in rules {
            let heads = {
                let view = EvalView {
                    nodes: &nodes,
                    artifact,
                    derived: &derived,
                };
                view.project(rule)
            };
            for key in heads {
                if known.insert(key.clone()) {
                    derived.push(Edge::from_key(key).with_prop(PROP_DERIVED_BY, rule.display_name()));
                    added += 1;
                }
            }
        }

        if added == 0 {
            converged = true;
            break;
        }
    }

    if !converged {
        tracing::warn!(
            iterations,
            derived = derived.len(),
            "rule evaluation stopped at the iteration cap without reaching a fixpoint"
        );
    }

    Evaluation {
        edges: derived,
        iterations,
        converged,
    }
}

/// Read-only view of nodes plus base and derived edges for one rule pass.
struct EvalView<'a> {
    nodes: &'a BTreeMap<&'a str, &'a Node>,
    artifact: &'a Artifact,
    derived: &'a [Edge],
}

impl<'a> EvalView<'a> {
    fn edges(&self) -> impl Iterator<Item = &'a Edge> + 'a {
        self.artifact.edges.iter().chain(self.derived.iter())
    }

    /// Evaluate the body and project the head for every surviving binding.
    fn project(&self, rule: &Rule) -> Vec<EdgeKey> {
        let mut bindings: Vec<Binding<'a>> = vec![Binding::new()];
        for literal in &rule.body {
            if literal.negated {
                tracing::debug!(rule = rule.display_name(), "skipping negated literal");
                continue;
            }
            let matches = self.bind(&literal.pred);
            bindings = join_bindings(&bindings, &matches);
            if bindings.is_empty() {
                return Vec::new();
            }
        }

        bindings
            .iter()
            .filter_map(|binding| {
                let from = binding.get(&rule.head.from)?.as_node()?;
                let to = binding.get(&rule.head.to)?.as_node()?;
                Some(EdgeKey::new(&rule.head.edge_type, &from.id, &to.id))
            })
            .collect()
    }

    fn bind(&self, pred: &Pred) -> Vec<Binding<'a>> {
        match pred {
            Pred::Edge {
                edge_type,
                from,
                to,
            } => self
                .edges()
                .filter(|e| edge_type.as_deref().is_none_or(|t| e.is_type(t)))
                .filter_map(|edge| {
                    let source = *self.nodes.get(edge.from.as_str())?;
                    let target = *self.nodes.get(edge.to.as_str())?;
                    if from == to && source.id != target.id {
                        return None;
                    }
                    let mut binding = Binding::new();
                    binding.insert(from.clone(), Bound::Node(source));
                    binding.insert(to.clone(), Bound::Node(target));
                    binding.insert(edge_binding_key(from, to), Bound::Edge(edge));
                    Some(binding)
                })
                .collect(),
            Pred::Label { v, label } => self
                .artifact
                .nodes
                .iter()
                .filter(|n| n.has_label(label))
                .map(|n| Binding::from([(v.clone(), Bound::Node(n))]))
                .collect(),
            Pred::PropContains { v, path, value } => {
                let needle = value.to_lowercase();
                self.artifact
                    .nodes
                    .iter()
                    .filter(|n| {
                        Bound::Node(*n).resolve(path.as_slice()).is_some_and(|found| {
                            crate::binding::stringify(&found)
                                .to_lowercase()
                                .contains(&needle)
                        })
                    })
                    .map(|n| Binding::from([(v.clone(), Bound::Node(n))]))
                    .collect()
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(len: usize) -> Artifact {
        let mut artifact = Artifact::new("chain");
        for i in 0..len {
            artifact = artifact.with_node(Node::new(format!("n{}", i)));
        }
        for i in 1..len {
            artifact = artifact.with_edge(Edge::new("NEXT", format!("n{}", i - 1), format!("n{}", i)));
        }
        artifact
    }

    fn transitive() -> Vec<Rule> {
        vec![
            Rule::new("REACH", "x", "y").named("base").edge(Some("NEXT"), "x", "y"),
            Rule::new("REACH", "x", "z")
                .named("step")
                .edge(Some("REACH"), "x", "y")
                .edge(Some("NEXT"), "y", "z"),
        ]
    }

    #[test]
    fn transitive_closure_reaches_fixpoint() {
        let artifact = chain(4);
        let report = evaluate_rules_report(&artifact, &transitive(), 8);

        assert!(report.converged);
        // 3 + 2 + 1 reachability pairs
        assert_eq!(report.edges.len(), 6);
        assert!(report.edges.iter().any(|e| e.has_key("REACH", "n0", "n3")));
        assert_eq!(report.edges[0].props[PROP_DERIVED_BY], "base");
    }

    #[test]
    fn iteration_cap_truncates_silently() {
        let artifact = chain(12);
        let report = evaluate_rules_report(&artifact, &transitive(), 2);

        assert!(!report.converged);
        assert_eq!(report.iterations, 2);
        assert!(!report.edges.iter().any(|e| e.has_key("REACH", "n0", "n11")));
    }

    #[test]
    fn derived_edges_are_not_written_back() {
        let artifact = chain(3);
        let before = artifact.clone();
        let edges = evaluate_rules(&artifact, &transitive(), 8);

        assert!(!edges.is_empty());
        assert_eq!(artifact, before);
    }

    #[test]
    fn existing_edges_are_not_rederived() {
        let artifact = chain(2).with_edge(Edge::new("REACH", "n0", "n1"));
        let edges = evaluate_rules(&artifact, &transitive(), 8);
        assert!(edges.is_empty());
    }

    #[test]
    fn unnamed_rule_tags_default_name() {
        let artifact = chain(2);
        let rules = vec![Rule::new("COPY", "a", "b").edge(None, "a", "b")];
        let edges = evaluate_rules(&artifact, &rules, 8);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].props[PROP_DERIVED_BY], DEFAULT_RULE_NAME);
    }

    #[test]
    fn dangling_edges_do_not_bind() {
        let artifact = chain(2).with_edge(Edge::new("NEXT", "n1", "ghost"));
        let rules = vec![Rule::new("COPY", "a", "b").edge(Some("NEXT"), "a", "b")];
        let edges = evaluate_rules(&artifact, &rules, 8);
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn prop_contains_is_case_insensitive() {
        let artifact = Artifact::new("ds")
            .with_node(Node::new("a").with_label("A"))
            .with_node(Node::new("b").with_prop("label", "Beta ONE"))
            .with_edge(Edge::new("LINK", "a", "b"));
        let rules = vec![Rule::new("HIT", "x", "y")
            .edge(Some("LINK"), "x", "y")
            .prop_contains("y", &["props", "label"], "one")];
        assert_eq!(evaluate_rules(&artifact, &rules, 8).len(), 1);
    }

    #[test]
    fn negated_literal_is_skipped_in_raw_evaluation() {
        let artifact = Artifact::new("ds")
            .with_node(Node::new("a").with_label("A"))
            .with_node(Node::new("b"))
            .with_edge(Edge::new("LINK", "a", "b"));
        let rules = vec![Rule::new("HIT", "x", "y")
            .edge(Some("LINK"), "x", "y")
            .literal(Literal::negated(Pred::Label {
                v: "x".into(),
                label: "A".into(),
            }))];

        assert_eq!(evaluate_rules(&artifact, &rules, 8).len(), 1);
        assert!(matches!(
            rules[0].validate(),
            Err(CanonError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn validate_rejects_unbound_head() {
        let rule = Rule::new("X", "a", "z").edge(None, "a", "b");
        assert!(matches!(rule.validate(), Err(CanonError::InvalidRule(_))));
    }

    #[test]
    fn rule_deserializes_from_json() {
        let rule: Rule = serde_json::from_value(serde_json::json!({
            "name": "r",
            "head": {"type": "RELATED", "from": "a", "to": "b"},
            "body": [
                {"pred": {"kind": "edge", "type": "LINK", "from": "a", "to": "b"}},
                {"pred": {"kind": "propContains", "v": "b", "path": ["props", "label"], "value": "One"}}
            ]
        }))
        .expect("rule");
        assert_eq!(rule.body.len(), 2);
        assert!(rule.validate().is_ok());
    }
}
