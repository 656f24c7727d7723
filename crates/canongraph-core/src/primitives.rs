//! # Innate Primitives
//!
//! Hardcoded names and limits for the canongraph core.
//!
//! The core starts with zero data but fixed vocabulary.
//! These primitives are compiled into the binary and are immutable at runtime.
//!
//! ## Primitives
//!
//! 1. **Vocabulary**: labels and edge types the logical canon rules read and write.
//! 2. **Derivation markers**: the prop keys and values stamped on derived edges.
//! 3. **Bounds**: iteration caps and input validation limits.

// =============================================================================
// LABELS
// =============================================================================

/// Label carried by high-level operation (HLO) nodes.
pub const LABEL_HLO: &str = "HLO";

/// Label carried by clause nodes.
pub const LABEL_CLAUSE: &str = "Clause";

/// Label carried by relation endpoint nodes created during ingestion.
pub const LABEL_CONCEPT: &str = "Concept";

/// Label carried by term nodes created during ingestion.
pub const LABEL_TERM: &str = "Term";

/// Label the hypothetical syllogism rule requires on the target of a `LINK`.
pub const LABEL_SYLLOGISM_TARGET: &str = "B";

// =============================================================================
// EDGE TYPES
// =============================================================================

/// Premise edge of the hypothetical syllogism.
pub const EDGE_LINK: &str = "LINK";

/// Conclusion edge of the hypothetical syllogism.
pub const EDGE_RELATED: &str = "RELATED";

/// Subject → feature.
pub const EDGE_HAS: &str = "HAS";

/// Feature → consequence.
pub const EDGE_IMPLIES: &str = "IMPLIES";

/// Subject → candidate option.
pub const EDGE_ONE_OF: &str = "ONE_OF";

/// Subject → eliminated option.
pub const EDGE_NEGATED: &str = "NEGATED";

/// Subject → the single surviving option.
pub const EDGE_ACCEPT: &str = "ACCEPT";

/// HLO → clause edge written by the ingestor.
pub const EDGE_HAS_CLAUSE: &str = "HAS_CLAUSE";

/// Id prefix of relation endpoint nodes created during ingestion.
pub const CONCEPT_ID_PREFIX: &str = "concept:";

/// Id prefix of term nodes created during ingestion.
pub const TERM_ID_PREFIX: &str = "term:";

// =============================================================================
// DERIVATION MARKERS
// =============================================================================

/// Prop key holding the provenance record of a canon-derived edge.
pub const PROP_PROVENANCE: &str = "provenance";

/// Prop key holding the modality of a derived edge.
pub const PROP_MODALITY: &str = "modality";

/// Modality value stamped on every canon-derived edge.
pub const MODALITY_INFERRED: &str = "inferred";

/// Prop key naming the evaluator rule that produced an ephemeral edge.
pub const PROP_DERIVED_BY: &str = "derivedBy";

/// Fallback for `derivedBy` when a rule has no name.
pub const DEFAULT_RULE_NAME: &str = "rule";

/// Infix of the synthetic binding key for a matched edge: `<from>__edge__<to>`.
pub const EDGE_BINDING_INFIX: &str = "__edge__";

// =============================================================================
// BOUNDS
// =============================================================================

/// Default round cap for the rule evaluator fixpoint loop.
///
/// Exceeding it stops evaluation; the partial result is reported as
/// not converged.
pub const DEFAULT_MAX_ITERATIONS: usize = 8;

/// Maximum length for node ids, edge types and endpoints.
pub const MAX_ID_LENGTH: usize = 512;

/// Maximum length of a raw clause string.
pub const MAX_CLAUSE_LENGTH: usize = 65536;

/// Maximum number of HLO records in one manifest.
pub const MAX_MANIFEST_RECORDS: usize = 100_000;
