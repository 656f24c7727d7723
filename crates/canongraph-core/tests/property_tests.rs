//! # Property-Based Tests
//!
//! Invariants of the canon pipeline, provenance replay and query engine,
//! checked over generated artifacts.

use canongraph_core::provenance::derived_edges;
use canongraph_core::{
    Artifact, CanonPipeline, CanonRule, DedupeEdges, Edge, EdgeKey, Node, NodeVar, Pattern,
    QueryAst, Rule, canonical_checksum, evaluate_rules, replays, rule_by_name,
};
use canongraph_core::canon::{DEFAULT_RULE_NAMES, LOGICAL_RULE_NAMES};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

const TYPES: [&str; 5] = ["LINK", "HAS", "IMPLIES", "ONE_OF", "NEGATED"];

/// Six nodes, some labeled `B`, and up to 40 edges over the rule vocabulary.
/// Every edge carries its generation index as `seq`.
fn arb_artifact() -> impl Strategy<Value = Artifact> {
    (
        vec(any::<bool>(), 6),
        vec((0usize..TYPES.len(), 0usize..6, 0usize..6), 0..40),
    )
        .prop_map(|(labels, edges)| {
            let mut artifact = Artifact::new("generated");
            for (i, is_b) in labels.iter().enumerate() {
                let mut node = Node::new(format!("n{}", i));
                if *is_b {
                    node = node.with_label("B");
                }
                artifact.nodes.push(node);
            }
            for (seq, (t, from, to)) in edges.into_iter().enumerate() {
                artifact.edges.push(
                    Edge::new(TYPES[t], format!("n{}", from), format!("n{}", to))
                        .with_prop("seq", seq),
                );
            }
            artifact
        })
}

fn keys(artifact: &Artifact) -> BTreeSet<EdgeKey> {
    artifact.edge_keys()
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Every registered rule is idempotent on edges and nodes.
    #[test]
    fn every_rule_is_idempotent(artifact in arb_artifact()) {
        for name in DEFAULT_RULE_NAMES.iter().chain(LOGICAL_RULE_NAMES.iter()) {
            let rule = rule_by_name(name).expect("registered");
            let once = rule.apply(&artifact);
            let twice = rule.apply(&once);

            prop_assert_eq!(once.edges.len(), twice.edges.len(), "rule {}", name);
            prop_assert_eq!(keys(&once), keys(&twice), "rule {}", name);
            prop_assert_eq!(&once.nodes, &twice.nodes, "rule {}", name);
        }
    }

    /// The full inference pipeline reaches its fixpoint in one pass.
    #[test]
    fn inference_pipeline_is_idempotent(artifact in arb_artifact()) {
        let pipeline = CanonPipeline::with_inference();
        let once = pipeline.run(&artifact);
        let twice = pipeline.run(&once);

        prop_assert_eq!(&once.edges, &twice.edges);
        prop_assert_eq!(&once.counts, &twice.counts);
    }

    /// After dedupe no two edges share a key, and each survivor is the
    /// first occurrence of its key.
    #[test]
    fn dedupe_keeps_first_occurrences(artifact in arb_artifact()) {
        let out = DedupeEdges.apply(&artifact);

        let mut first_seq: BTreeMap<EdgeKey, u64> = BTreeMap::new();
        for edge in &artifact.edges {
            let seq = edge.props["seq"].as_u64().expect("seq");
            first_seq.entry(edge.key()).or_insert(seq);
        }

        prop_assert_eq!(out.edges.len(), first_seq.len());
        for edge in &out.edges {
            prop_assert_eq!(edge.props["seq"].as_u64(), first_seq.get(&edge.key()).copied());
        }
    }

    /// Every derived edge re-derives from its recorded sources.
    #[test]
    fn derived_edges_replay_from_sources(artifact in arb_artifact()) {
        for name in LOGICAL_RULE_NAMES {
            let rule = rule_by_name(name).expect("registered");
            let out = rule.apply(&artifact);
            for (edge, provenance) in derived_edges(&out) {
                prop_assert_eq!(provenance.rule.as_str(), name);
                prop_assert!(
                    replays(rule.as_ref(), edge, &out),
                    "{}({}, {}) did not replay",
                    edge.edge_type,
                    edge.from,
                    edge.to
                );
            }
        }
    }

    /// Canon rules never touch their input.
    #[test]
    fn rules_are_pure(artifact in arb_artifact()) {
        let before = artifact.clone();
        let _ = CanonPipeline::with_inference().run(&artifact);
        prop_assert_eq!(artifact, before);
    }

    /// A limited query returns a prefix of the unlimited result.
    #[test]
    fn limit_returns_prefix(artifact in arb_artifact(), limit in 0usize..12) {
        let ast = QueryAst::new()
            .matching(Pattern::edge(NodeVar::new("a"), None, NodeVar::new("b")))
            .returning("a.id", Some("from"))
            .returning("a__edge__b.props.seq", Some("seq"));

        let all = ast.run(&artifact).expect("execute");
        let limited = ast.clone().limit(limit).run(&artifact).expect("execute");

        prop_assert_eq!(limited.len(), limit.min(all.len()));
        prop_assert_eq!(limited.as_slice(), &all[..limited.len()]);
    }

    /// Evaluator output is new, unique and never written back.
    #[test]
    fn evaluator_only_adds_new_edges(artifact in arb_artifact()) {
        let rules = vec![
            Rule::new("REACH", "x", "y").edge(Some("LINK"), "x", "y"),
            Rule::new("REACH", "x", "z")
                .edge(Some("REACH"), "x", "y")
                .edge(Some("LINK"), "y", "z"),
        ];
        let before = artifact.clone();
        let derived = evaluate_rules(&artifact, &rules, 8);

        let base = keys(&artifact);
        let mut seen = BTreeSet::new();
        for edge in &derived {
            prop_assert!(!base.contains(&edge.key()));
            prop_assert!(seen.insert(edge.key()));
        }
        prop_assert_eq!(artifact, before);
    }

    /// The canonical checksum ignores element order.
    #[test]
    fn checksum_is_order_independent(artifact in arb_artifact()) {
        let mut reversed = artifact.clone();
        reversed.nodes.reverse();
        reversed.edges.reverse();
        prop_assert_eq!(canonical_checksum(&artifact), canonical_checksum(&reversed));
    }
}
