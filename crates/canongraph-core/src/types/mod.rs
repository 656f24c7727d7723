//! # Core Type Definitions
//!
//! This module contains the data model of the canongraph core:
//! - Graph elements (`Node`, `Edge`, `EdgeKey`)
//! - Source text records (`Clause`, `ClauseKind`, `Term`)
//! - Derivation records (`Provenance`, `ProvenanceKind`)
//! - The aggregate root (`Artifact`)
//! - Error types (`CanonError`)
//!
//! ## Identity
//!
//! Nodes are identified by `id`. Edges are not unique by themselves; the
//! canonical identity of an edge is its `(type, from, to)` triple, exposed
//! as [`EdgeKey`].

use crate::primitives::{
    MAX_ID_LENGTH, MODALITY_INFERRED, PROP_MODALITY, PROP_PROVENANCE,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Free-form property bag on nodes and edges. Insertion ordered.
pub type Props = Map<String, Value>;

// =============================================================================
// NODE
// =============================================================================

/// A Node in the artifact graph.
///
/// `labels` behaves like a set for membership; its first entry is the
/// primary label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Identifier, unique within an artifact.
    pub id: String,
    /// Labels in insertion order.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Arbitrary properties.
    #[serde(default)]
    pub props: Props,
}

impl Node {
    /// Create an unlabeled node without properties.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            labels: Vec::new(),
            props: Props::new(),
        }
    }

    /// Add a label unless already present.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
        self
    }

    /// Set a property.
    #[must_use]
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Check label membership.
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// The first label, if any.
    #[must_use]
    pub fn primary_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    /// Resolve a top-level field (`id`, `labels`, `props`) as a JSON value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::String(self.id.clone())),
            "labels" => Some(Value::Array(
                self.labels.iter().cloned().map(Value::String).collect(),
            )),
            "props" => Some(Value::Object(self.props.clone())),
            _ => None,
        }
    }

    /// The whole node as a JSON object: `{id, labels, props}`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        to_json(self)
    }
}

/// Serialize a value whose fields are plain strings and JSON values.
///
/// Such types cannot fail to serialize; `Null` is unreachable.
fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

// =============================================================================
// EDGE
// =============================================================================

/// The canonical identity of an edge: `(type, from, to)`.
///
/// Also the shape of a provenance source reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    /// Edge type.
    #[serde(rename = "type")]
    pub edge_type: String,
    /// Source node id.
    pub from: String,
    /// Target node id.
    pub to: String,
}

impl EdgeKey {
    /// Create a new edge key.
    #[must_use]
    pub fn new(edge_type: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            edge_type: edge_type.into(),
            from: from.into(),
            to: to.into(),
        }
    }
}

/// A directed, typed edge between two node ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Edge type.
    #[serde(rename = "type")]
    pub edge_type: String,
    /// Source node id.
    pub from: String,
    /// Target node id.
    pub to: String,
    /// Arbitrary properties.
    #[serde(default)]
    pub props: Props,
}

impl Edge {
    /// Create an edge without properties.
    #[must_use]
    pub fn new(edge_type: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            edge_type: edge_type.into(),
            from: from.into(),
            to: to.into(),
            props: Props::new(),
        }
    }

    /// Create a property-less edge from its key.
    #[must_use]
    pub fn from_key(key: EdgeKey) -> Self {
        Self {
            edge_type: key.edge_type,
            from: key.from,
            to: key.to,
            props: Props::new(),
        }
    }

    /// Create a canon-derived edge carrying provenance and `modality = "inferred"`.
    #[must_use]
    pub fn derived(key: EdgeKey, provenance: &Provenance) -> Self {
        Self::from_key(key)
            .with_prop(PROP_PROVENANCE, provenance.to_value())
            .with_prop(PROP_MODALITY, MODALITY_INFERRED)
    }

    /// Set a property.
    #[must_use]
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// The `(type, from, to)` identity of this edge.
    #[must_use]
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(&self.edge_type, &self.from, &self.to)
    }

    /// Check the `(type, from, to)` identity without allocating.
    #[must_use]
    pub fn has_key(&self, edge_type: &str, from: &str, to: &str) -> bool {
        self.edge_type == edge_type && self.from == from && self.to == to
    }

    /// Check whether the edge is of the given type.
    #[must_use]
    pub fn is_type(&self, edge_type: &str) -> bool {
        self.edge_type == edge_type
    }

    /// Whether the edge carries the inferred modality marker.
    #[must_use]
    pub fn is_inferred(&self) -> bool {
        self.props.get(PROP_MODALITY).and_then(Value::as_str) == Some(MODALITY_INFERRED)
    }

    /// Resolve a top-level field (`type`, `from`, `to`, `props`) as a JSON value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "type" => Some(Value::String(self.edge_type.clone())),
            "from" => Some(Value::String(self.from.clone())),
            "to" => Some(Value::String(self.to.clone())),
            "props" => Some(Value::Object(self.props.clone())),
            _ => None,
        }
    }

    /// The whole edge as a JSON object: `{type, from, to, props}`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        to_json(self)
    }
}

// =============================================================================
// CLAUSES & TERMS
// =============================================================================

/// Classification of a raw clause by its leading token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClauseKind {
    /// `assert(...)`
    Assert,
    /// `tag(...)`
    Tag,
    /// `annotate(...)`
    Annotate,
    /// Anything else.
    Unknown,
}

impl ClauseKind {
    /// Classify a raw clause. Leading whitespace is ignored; matching is
    /// case-sensitive and requires the opening parenthesis.
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        let head = raw.trim_start();
        let token = head.split('(').next().unwrap_or_default().trim_end();
        if token.len() == head.len() {
            return Self::Unknown;
        }
        match token {
            "assert" => Self::Assert,
            "tag" => Self::Tag,
            "annotate" => Self::Annotate,
            _ => Self::Unknown,
        }
    }

    /// Lowercase name as stored in artifacts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assert => "assert",
            Self::Tag => "tag",
            Self::Annotate => "annotate",
            Self::Unknown => "unknown",
        }
    }
}

/// A clause parsed from HLO source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// Clause identifier.
    pub id: String,
    /// Owning HLO id.
    #[serde(rename = "hloId")]
    pub hlo_id: String,
    /// Raw source text.
    pub raw: String,
    /// Classification of `raw`.
    pub kind: ClauseKind,
}

impl Clause {
    /// Create a clause, classifying the raw text.
    #[must_use]
    pub fn new(id: impl Into<String>, hlo_id: impl Into<String>, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let kind = ClauseKind::classify(&raw);
        Self {
            id: id.into(),
            hlo_id: hlo_id.into(),
            raw,
            kind,
        }
    }
}

/// A vocabulary term record. Unknown fields are preserved.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    /// Term identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Surface tokens.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<String>,
    /// Tokens from the term's signature.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signature_tokens: Vec<String>,
    /// Alternative names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Tag key/value pairs.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub tags: Props,
    /// Everything else.
    #[serde(flatten)]
    pub extra: Props,
}

/// One token of an entity signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedToken {
    /// Token text.
    pub token: String,
    /// Token weight.
    pub weight: f64,
}

// =============================================================================
// PROVENANCE
// =============================================================================

/// The inference pattern that justified a derived edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvenanceKind {
    /// Derived from premises that imply the conclusion.
    Hypothetical,
    /// Derived by eliminating all but one option of a disjunction.
    Disjunctive,
}

/// Source facts behind a derived edge, stored under `props.provenance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Inference pattern.
    pub kind: ProvenanceKind,
    /// Name of the canon rule that produced the edge.
    pub rule: String,
    /// Source edges, in the order the rule consulted them.
    pub sources: Vec<EdgeKey>,
}

impl Provenance {
    /// Create a provenance record.
    #[must_use]
    pub fn new(kind: ProvenanceKind, rule: impl Into<String>, sources: Vec<EdgeKey>) -> Self {
        Self {
            kind,
            rule: rule.into(),
            sources,
        }
    }

    /// Serialize to the JSON stored on the edge.
    #[must_use]
    pub fn to_value(&self) -> Value {
        to_json(self)
    }
}

// =============================================================================
// ARTIFACT
// =============================================================================

/// The canonical graph document: the aggregate root of the core.
///
/// Built once per dataset, threaded through the canon pipeline, then
/// treated as read-only by the query engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Artifact {
    /// Dataset name.
    pub dataset: String,
    /// Nodes in encounter order.
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Edges in encounter order.
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Flat token vocabulary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<String>>,
    /// Term records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<Vec<Term>>,
    /// Parsed clauses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clauses: Option<Vec<Clause>>,
    /// Derived counters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts: Option<BTreeMap<String, u64>>,
    /// Per-entity weighted token signatures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signatures: Option<BTreeMap<String, Vec<WeightedToken>>>,
}

impl Artifact {
    /// Create an empty artifact for a dataset.
    #[must_use]
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            ..Self::default()
        }
    }

    /// Add a node.
    #[must_use]
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add an edge.
    #[must_use]
    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Find a node by id (first occurrence).
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Check for an edge with the given identity.
    #[must_use]
    pub fn has_edge(&self, edge_type: &str, from: &str, to: &str) -> bool {
        self.edges.iter().any(|e| e.has_key(edge_type, from, to))
    }

    /// Distinct edge identities.
    #[must_use]
    pub fn edge_keys(&self) -> BTreeSet<EdgeKey> {
        self.edges.iter().map(Edge::key).collect()
    }

    /// Edges of one type, in encounter order.
    pub fn edges_of_type<'a>(&'a self, edge_type: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.is_type(edge_type))
    }

    /// Validate the artifact at the boundary where it enters the core.
    ///
    /// Checks:
    /// - `dataset` is non-empty
    /// - node ids are non-empty, bounded and unique
    /// - edge types and endpoints are non-empty and bounded
    ///
    /// Edges pointing at missing nodes are accepted; the query engine
    /// treats them as non-matching.
    pub fn validate(&self) -> Result<(), CanonError> {
        if self.dataset.trim().is_empty() {
            return Err(CanonError::InvalidArtifact("dataset name is empty".to_string()));
        }

        let mut seen = BTreeSet::new();
        for node in &self.nodes {
            check_identifier("node id", &node.id)?;
            if !seen.insert(node.id.as_str()) {
                return Err(CanonError::InvalidArtifact(format!(
                    "duplicate node id '{}'",
                    node.id
                )));
            }
        }

        for edge in &self.edges {
            check_identifier("edge type", &edge.edge_type)?;
            check_identifier("edge source", &edge.from)?;
            check_identifier("edge target", &edge.to)?;
        }

        Ok(())
    }
}

fn check_identifier(what: &str, value: &str) -> Result<(), CanonError> {
    if value.is_empty() {
        return Err(CanonError::InvalidArtifact(format!("{} is empty", what)));
    }
    if value.len() > MAX_ID_LENGTH {
        return Err(CanonError::InvalidArtifact(format!(
            "{} exceeds {} bytes",
            what, MAX_ID_LENGTH
        )));
    }
    Ok(())
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the canongraph core.
///
/// - Validation failures surface once, where data enters the core
/// - Query-time data-shape mismatches are never errors
/// - Caller misuse names the offending identifier
#[derive(Debug, Error)]
pub enum CanonError {
    /// The artifact does not conform to the data model.
    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    /// The manifest handed to the ingestor is malformed.
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// A Datalog-lite rule is malformed.
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// A canon rule name is not registered.
    #[error("Unknown canon rule: {0}")]
    UnknownRule(String),

    /// A feature that is reserved but not implemented was requested.
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
