//! # Canonical Export Module
//!
//! Deterministic serialization for artifact verification.
//!
//! Artifacts built from the same facts in a different order export to the
//! same bytes: nodes are sorted by id, edges by `(type, from, to)` and then
//! by their serialized props, tokens and clauses by value and id. The
//! canonical export is the source of truth when comparing two artifacts.

use crate::{Artifact, CanonError, Edge, Node};
use serde::{Deserialize, Serialize};

// =============================================================================
// CANONICAL FORMAT
// =============================================================================

/// Format tag of canonical exports.
pub const CANONICAL_FORMAT: &str = "canongraph-canonical";

/// Current canonical format version.
pub const CANONICAL_VERSION: u8 = 1;

/// Maximum node count accepted on import.
pub const MAX_IMPORT_NODE_COUNT: u64 = 1_000_000;

/// Maximum edge count accepted on import.
pub const MAX_IMPORT_EDGE_COUNT: u64 = 10_000_000;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Header of a canonical export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalHeader {
    /// Format tag.
    pub format: String,
    /// Format version.
    pub version: u8,
    /// Number of nodes.
    pub node_count: u64,
    /// Number of edges.
    pub edge_count: u64,
    /// [`canonical_checksum`] of the artifact.
    pub checksum: u64,
}

impl CanonicalHeader {
    /// Create a header for the current format.
    #[must_use]
    pub fn new(node_count: u64, edge_count: u64, checksum: u64) -> Self {
        Self {
            format: CANONICAL_FORMAT.to_string(),
            version: CANONICAL_VERSION,
            node_count,
            edge_count,
            checksum,
        }
    }

    /// Validate format, version and count limits.
    pub fn validate(&self) -> Result<(), CanonError> {
        if self.format != CANONICAL_FORMAT {
            return Err(CanonError::DeserializationError(format!(
                "unknown canonical format '{}'",
                self.format
            )));
        }
        if self.version != CANONICAL_VERSION {
            return Err(CanonError::DeserializationError(format!(
                "unsupported canonical version: {} (expected {})",
                self.version, CANONICAL_VERSION
            )));
        }
        if self.node_count > MAX_IMPORT_NODE_COUNT {
            return Err(CanonError::DeserializationError(format!(
                "node count {} exceeds maximum {}",
                self.node_count, MAX_IMPORT_NODE_COUNT
            )));
        }
        if self.edge_count > MAX_IMPORT_EDGE_COUNT {
            return Err(CanonError::DeserializationError(format!(
                "edge count {} exceeds maximum {}",
                self.edge_count, MAX_IMPORT_EDGE_COUNT
            )));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct CanonicalDocument {
    header: CanonicalHeader,
    artifact: Artifact,
}

/// Reorder an artifact into canonical form.
#[must_use]
pub fn canonicalize(artifact: &Artifact) -> Artifact {
    let mut out = artifact.clone();
    out.nodes.sort_by(|a, b| a.id.cmp(&b.id));
    out.edges
        .sort_by_cached_key(|e| (e.key(), serde_json::Value::Object(e.props.clone()).to_string()));
    if let Some(tokens) = out.tokens.as_mut() {
        tokens.sort();
        tokens.dedup();
    }
    if let Some(clauses) = out.clauses.as_mut() {
        clauses.sort_by(|a, b| a.id.cmp(&b.id));
    }
    out
}

// =============================================================================
// CHECKSUM
// =============================================================================

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

fn node_hash(node: &Node) -> u64 {
    fnv1a(node.to_value().to_string().as_bytes()).rotate_left(13)
}

fn edge_hash(edge: &Edge) -> u64 {
    fnv1a(edge.to_value().to_string().as_bytes()).rotate_left(17)
}

/// Order-independent checksum over dataset, nodes and edges.
///
/// Each element hashes on its own and the hashes are summed, so
/// reordering never changes the result while duplicates do. Not
/// collision resistant; see `canonical_crypto_hash` for that.
#[must_use]
pub fn canonical_checksum(artifact: &Artifact) -> u64 {
    let mut sum = fnv1a(artifact.dataset.as_bytes()).rotate_left(3);
    for node in &artifact.nodes {
        sum = sum.wrapping_add(node_hash(node));
    }
    for edge in &artifact.edges {
        sum = sum.wrapping_add(edge_hash(edge));
    }
    sum
}

// =============================================================================
// EXPORT / IMPORT
// =============================================================================

/// Export an artifact as canonical JSON: header plus canonicalized artifact.
pub fn export_canonical(artifact: &Artifact) -> Result<String, CanonError> {
    let canonical = canonicalize(artifact);
    let document = CanonicalDocument {
        header: CanonicalHeader::new(
            canonical.nodes.len() as u64,
            canonical.edges.len() as u64,
            canonical_checksum(&canonical),
        ),
        artifact: canonical,
    };
    serde_json::to_string(&document).map_err(|e| CanonError::SerializationError(e.to_string()))
}

/// Import a canonical export, checking header, counts and checksum.
pub fn import_canonical(text: &str) -> Result<Artifact, CanonError> {
    crate::formats::persistence::check_payload_size(text)?;
    let document: CanonicalDocument = serde_json::from_str(text)
        .map_err(|e| CanonError::DeserializationError(format!("invalid canonical export: {}", e)))?;
    document.header.validate()?;

    let artifact = document.artifact;
    if artifact.nodes.len() as u64 != document.header.node_count {
        return Err(CanonError::DeserializationError(format!(
            "node count mismatch: header {} vs data {}",
            document.header.node_count,
            artifact.nodes.len()
        )));
    }
    if artifact.edges.len() as u64 != document.header.edge_count {
        return Err(CanonError::DeserializationError(format!(
            "edge count mismatch: header {} vs data {}",
            document.header.edge_count,
            artifact.edges.len()
        )));
    }
    let checksum = canonical_checksum(&artifact);
    if checksum != document.header.checksum {
        return Err(CanonError::DeserializationError(format!(
            "checksum mismatch: header {} vs data {}",
            document.header.checksum, checksum
        )));
    }
    artifact.validate()?;
    Ok(artifact)
}

/// Whether `artifact` exports to exactly `canonical`.
pub fn verify_canonical(artifact: &Artifact, canonical: &str) -> Result<bool, CanonError> {
    Ok(export_canonical(artifact)? == canonical)
}

// =============================================================================
// CRYPTOGRAPHIC HASH
// =============================================================================

/// BLAKE3 digest of the canonical export, as 64 hex characters.
///
/// Only available with the `crypto-hash` feature.
#[cfg(feature = "crypto-hash")]
pub fn canonical_crypto_hash(artifact: &Artifact) -> Result<String, CanonError> {
    let data = export_canonical(artifact)?;
    Ok(blake3::hash(data.as_bytes()).to_hex().to_string())
}

/// Check an artifact against a BLAKE3 digest.
///
/// Only available with the `crypto-hash` feature.
#[cfg(feature = "crypto-hash")]
pub fn verify_crypto_hash(artifact: &Artifact, expected: &str) -> Result<bool, CanonError> {
    Ok(canonical_crypto_hash(artifact)? == expected)
}

// =============================================================================
// TESTS
// =============================================================================
