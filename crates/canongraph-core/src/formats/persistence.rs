//! # Persistence Format
//!
//! JSON serialization for artifacts, manifests and queries.
//!
//! File I/O lives in the app layer; this module only maps between text
//! and core types.
//!
//! ## Limits
//!
//! Every parser checks the payload size before deserializing, and
//! artifacts are validated after parsing so a malformed document is
//! rejected where it enters the core.

use crate::ingestor::Manifest;
use crate::query::QueryAst;
use crate::{Artifact, CanonError};
use serde::de::DeserializeOwned;

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum accepted payload size for any parsed document.
///
/// Checked before deserialization. 256 MB.
pub const MAX_ARTIFACT_PAYLOAD_SIZE: usize = 256 * 1024 * 1024;

/// Reject payloads over [`MAX_ARTIFACT_PAYLOAD_SIZE`].
pub fn check_payload_size(text: &str) -> Result<(), CanonError> {
    check_size(text, MAX_ARTIFACT_PAYLOAD_SIZE)
}

fn check_size(text: &str, limit: usize) -> Result<(), CanonError> {
    if text.len() > limit {
        return Err(CanonError::DeserializationError(format!(
            "payload of {} bytes exceeds maximum allowed {} bytes",
            text.len(),
            limit
        )));
    }
    Ok(())
}

fn parse<T: DeserializeOwned>(text: &str, limit: usize, what: &str) -> Result<T, CanonError> {
    check_size(text, limit)?;
    serde_json::from_str(text)
        .map_err(|e| CanonError::DeserializationError(format!("failed to parse {}: {}", what, e)))
}

// =============================================================================
// ARTIFACTS
// =============================================================================

/// Serialize an artifact to pretty-printed JSON.
pub fn artifact_to_json(artifact: &Artifact) -> Result<String, CanonError> {
    serde_json::to_string_pretty(artifact).map_err(|e| CanonError::SerializationError(e.to_string()))
}

/// Parse and validate an artifact, with the default size limit.
pub fn artifact_from_json(text: &str) -> Result<Artifact, CanonError> {
    artifact_from_json_limited(text, MAX_ARTIFACT_PAYLOAD_SIZE)
}

/// Parse and validate an artifact, rejecting payloads over `limit` bytes.
pub fn artifact_from_json_limited(text: &str, limit: usize) -> Result<Artifact, CanonError> {
    let artifact: Artifact = parse(text, limit, "artifact")?;
    artifact.validate()?;
    Ok(artifact)
}

// =============================================================================
// MANIFESTS & QUERIES
// =============================================================================

/// Parse a dataset manifest. Validation happens in [`crate::Ingestor`].
pub fn manifest_from_json(text: &str, limit: usize) -> Result<Manifest, CanonError> {
    parse(text, limit, "manifest")
}

/// Parse a query AST.
///
/// Only structured WHERE clauses can be expressed in JSON.
pub fn query_from_json(text: &str) -> Result<QueryAst, CanonError> {
    parse(text, MAX_ARTIFACT_PAYLOAD_SIZE, "query")
}

/// Serialize query rows to pretty-printed JSON.
pub fn rows_to_json(rows: &[crate::query::Row]) -> Result<String, CanonError> {
    serde_json::to_string_pretty(rows).map_err(|e| CanonError::SerializationError(e.to_string()))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Edge, Node};

    #[test]
    fn json_roundtrip_is_stable() {
        let artifact = Artifact::new("ds")
            .with_node(Node::new("a").with_label("A").with_prop("label", "Alpha"))
            .with_node(Node::new("b"))
            .with_edge(Edge::new("LINK", "a", "b").with_prop("w", 2));

        let first = artifact_to_json(&artifact).expect("serialize");
        let restored = artifact_from_json(&first).expect("parse");
        let second = artifact_to_json(&restored).expect("serialize");

        assert_eq!(restored, artifact);
        assert_eq!(first, second);
    }

    #[test]
    fn oversized_payload_rejected_before_parsing() {
        let err = artifact_from_json_limited("{ not even json", 4).err().expect("rejected");
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn invalid_artifact_rejected_after_parsing() {
        let text = r#"{"dataset": "ds", "nodes": [{"id": "a"}, {"id": "a"}]}"#;
        assert!(matches!(
            artifact_from_json(text),
            Err(CanonError::InvalidArtifact(_))
        ));
    }

    #[test]
    fn malformed_json_is_a_deserialization_error() {
        assert!(matches!(
            artifact_from_json("[1, 2"),
            Err(CanonError::DeserializationError(_))
        ));
    }

    #[test]
    fn query_parses_without_rules() {
        let ast = query_from_json(r#"{"match": [{"vars": [{"name": "n"}]}], "return": [{"expr": "n.id"}]}"#)
            .expect("query");
        assert!(ast.rules.is_empty());
        assert!(ast.filter.is_none());
    }
}
