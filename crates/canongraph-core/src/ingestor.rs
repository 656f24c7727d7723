//! # Ingestor Module
//!
//! Manifest validation and conversion into an [`Artifact`].
//!
//! - Validate the manifest before building anything
//! - Reject malformed input with the offending record named
//! - One node per HLO record, clause, relation endpoint and identified term
//! - No inference: canon rules run afterwards

use crate::primitives::{
    CONCEPT_ID_PREFIX, EDGE_HAS_CLAUSE, LABEL_CLAUSE, LABEL_CONCEPT, LABEL_HLO, LABEL_TERM,
    MAX_CLAUSE_LENGTH, MAX_ID_LENGTH, MAX_MANIFEST_RECORDS, TERM_ID_PREFIX,
};
use crate::{Artifact, CanonError, Clause, Edge, Node, Term};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// A typed relation between two concepts, stated by an HLO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Edge type of the relation.
    pub predicate: String,
    /// Source concept.
    pub from: String,
    /// Target concept.
    pub to: String,
}

/// A named predicate an HLO declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateRef {
    /// Predicate name.
    pub name: String,
    /// Arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

/// A high-level operation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HloRecord {
    /// Record id.
    pub id: String,
    /// Source chunk the record was distilled from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
    /// Human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_summary: Option<String>,
    /// Raw clause strings.
    #[serde(default)]
    pub clauses: Vec<String>,
    /// Declared predicates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predicates: Vec<PredicateRef>,
    /// Stated relations.
    #[serde(default)]
    pub relations: Vec<Relation>,
}

/// A dataset manifest: HLO records plus optional term records.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Dataset name.
    pub dataset: String,
    /// HLO records, in order.
    #[serde(default, alias = "operations")]
    pub hlos: Vec<HloRecord>,
    /// Term records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<Vec<Term>>,
}

/// The Ingestor validates manifests and builds artifacts from them.
pub struct Ingestor;

impl Ingestor {
    /// Validate a manifest.
    ///
    /// A manifest is valid if:
    /// - The dataset name is non-empty
    /// - It holds at most `MAX_MANIFEST_RECORDS` records
    /// - Record ids are non-empty, bounded and unique
    /// - Clauses are within `MAX_CLAUSE_LENGTH`
    /// - Relation predicates and endpoints are non-empty and bounded
    pub fn validate(manifest: &Manifest) -> Result<(), CanonError> {
        if manifest.dataset.trim().is_empty() {
            return Err(invalid("dataset name is empty"));
        }
        if manifest.hlos.len() > MAX_MANIFEST_RECORDS {
            return Err(invalid(format!(
                "{} records exceed the limit of {}",
                manifest.hlos.len(),
                MAX_MANIFEST_RECORDS
            )));
        }

        let mut ids = BTreeSet::new();
        for record in &manifest.hlos {
            check_field("record id", &record.id, &record.id)?;
            if !ids.insert(record.id.as_str()) {
                return Err(invalid(format!("duplicate record id '{}'", record.id)));
            }
            for (i, clause) in record.clauses.iter().enumerate() {
                if clause.len() > MAX_CLAUSE_LENGTH {
                    return Err(invalid(format!(
                        "clause {} of '{}' exceeds {} bytes",
                        i, record.id, MAX_CLAUSE_LENGTH
                    )));
                }
            }
            for relation in &record.relations {
                check_field("relation predicate", &relation.predicate, &record.id)?;
                check_field("relation source", &relation.from, &record.id)?;
                check_field("relation target", &relation.to, &record.id)?;
            }
        }

        Ok(())
    }

    /// Build an artifact from a manifest.
    ///
    /// Produces, in order: per record an `HLO` node, its `Clause` nodes
    /// (`<hloId>:c<index>`) with `HAS_CLAUSE` edges, the `Concept` nodes of
    /// its relation endpoints and one edge per relation; then a `Term` node
    /// for every term with an id.
    pub fn ingest(manifest: &Manifest) -> Result<Artifact, CanonError> {
        Self::validate(manifest)?;

        let mut artifact = Artifact::new(manifest.dataset.clone());
        let mut clauses = Vec::new();
        let mut concepts = BTreeSet::new();

        for record in &manifest.hlos {
            artifact.nodes.push(hlo_node(record));

            for (i, raw) in record.clauses.iter().enumerate() {
                let clause = Clause::new(format!("{}:c{}", record.id, i), &record.id, raw.as_str());
                artifact.nodes.push(
                    Node::new(clause.id.clone())
                        .with_label(LABEL_CLAUSE)
                        .with_prop("raw", clause.raw.clone())
                        .with_prop("kind", clause.kind.as_str())
                        .with_prop("hloId", record.id.clone()),
                );
                artifact
                    .edges
                    .push(Edge::new(EDGE_HAS_CLAUSE, &record.id, &clause.id));
                clauses.push(clause);
            }

            for relation in &record.relations {
                for name in [&relation.from, &relation.to] {
                    if concepts.insert(name.clone()) {
                        artifact.nodes.push(
                            Node::new(format!("{}{}", CONCEPT_ID_PREFIX, name))
                                .with_label(LABEL_CONCEPT)
                                .with_prop("name", name.clone()),
                        );
                    }
                }
                artifact.edges.push(
                    Edge::new(
                        &relation.predicate,
                        format!("{}{}", CONCEPT_ID_PREFIX, relation.from),
                        format!("{}{}", CONCEPT_ID_PREFIX, relation.to),
                    )
                    .with_prop("hloId", record.id.clone()),
                );
            }
        }

        if let Some(terms) = &manifest.terms {
            let mut seen = BTreeSet::new();
            for term in terms {
                let Some(id) = term.id.as_deref().filter(|id| !id.is_empty()) else {
                    continue;
                };
                if !seen.insert(id) {
                    continue;
                }
                let mut node = Node::new(format!("{}{}", TERM_ID_PREFIX, id)).with_label(LABEL_TERM);
                if let Some(label) = &term.label {
                    node = node.with_prop("label", label.clone());
                }
                artifact.nodes.push(node);
            }
            artifact.terms = Some(terms.clone());
        }

        artifact.clauses = Some(clauses);
        artifact.validate()?;

        tracing::debug!(
            dataset = %artifact.dataset,
            nodes = artifact.nodes.len(),
            edges = artifact.edges.len(),
            "manifest ingested"
        );
        Ok(artifact)
    }
}

fn hlo_node(record: &HloRecord) -> Node {
    let mut node = Node::new(record.id.clone()).with_label(LABEL_HLO);
    if let Some(chunk) = &record.chunk_id {
        node = node.with_prop("chunkId", chunk.clone());
    }
    if let Some(label) = &record.label {
        node = node.with_prop("label", label.clone());
    }
    if let Some(summary) = &record.candidate_summary {
        node = node.with_prop("summary", summary.clone());
    }
    if !record.predicates.is_empty() {
        let names: Vec<Value> = record
            .predicates
            .iter()
            .map(|p| Value::String(p.name.clone()))
            .collect();
        node = node.with_prop("predicates", names);
    }
    node
}

fn check_field(what: &str, value: &str, record: &str) -> Result<(), CanonError> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{} is empty in record '{}'", what, record)));
    }
    if value.len() > MAX_ID_LENGTH {
        return Err(invalid(format!(
            "{} exceeds {} bytes in record '{}'",
            what, MAX_ID_LENGTH, record
        )));
    }
    Ok(())
}

fn invalid(msg: impl Into<String>) -> CanonError {
    CanonError::InvalidManifest(msg.into())
}

// =============================================================================
// TESTS
// =============================================================================
