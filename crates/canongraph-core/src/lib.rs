//! # canongraph-core
//!
//! The graph inference-and-query core for canongraph.
//!
//! This crate turns a dataset artifact (nodes, typed edges, clauses, terms)
//! into a canonical graph and answers pattern queries over it:
//! - `canon`: ordered, pure, idempotent `Artifact → Artifact` rules,
//!   including provenance-tagged logical inference
//! - `evaluator`: bounded Datalog-lite forward chaining
//! - `query`: MATCH / WHERE / RETURN / LIMIT over base plus derived edges
//! - `provenance`: explain and replay derived edges
//!
//! ## Architectural Constraints
//!
//! The core:
//! - Is synchronous and single-threaded; no async, no network dependencies
//! - Never mutates its input; every transform returns a new value
//! - Never writes query-time derived edges back into an artifact
//! - Bounds every derivation loop by an iteration cap

// =============================================================================
// MODULES
// =============================================================================

pub mod binding;
pub mod canon;
pub mod evaluator;
pub mod export;
pub mod formats;
pub mod ingestor;
pub mod primitives;
pub mod provenance;
pub mod query;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Artifact, CanonError, Clause, ClauseKind, Edge, EdgeKey, Node, Props, Provenance,
    ProvenanceKind, Term, WeightedToken,
};

// =============================================================================
// RE-EXPORTS: Engines
// =============================================================================

pub use binding::{Binding, Bound};
pub use canon::{
    CanonPipeline, CanonRule, DedupeEdges, HypothesizeFromConjunction, InferTokensFromTerms,
    RecomputeCounts, RelatedFromLinkToLabel, ResolveDisjunction, StageReport, apply_canon_rules,
    rule_by_name,
};
pub use evaluator::{Evaluation, Literal, Pred, Rule, RuleHead, evaluate_rules, evaluate_rules_report};
pub use export::{canonical_checksum, export_canonical, import_canonical, verify_canonical};
pub use ingestor::{HloRecord, Ingestor, Manifest, Relation};
pub use provenance::{
    artifact_from_sources, artifact_from_sources_with_nodes, explain_derived_edge, replays,
    verify_derivation,
};
pub use query::{
    Filter, NodeVar, Pattern, QueryAst, QueryEngine, ReturnItem, Row, WhereClause, WhereOp,
};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{artifact_from_json, artifact_to_json};
