//! # CLI Tests
//!
//! Commands run against real files in a temporary directory.

use canongraph::cli::{
    RuleSelection, cmd_canon, cmd_explain, cmd_export, cmd_import, cmd_ingest, cmd_query,
    cmd_status, cmd_validate, cmd_verify, load_artifact, write_artifact,
};
use canongraph::config::Config;
use canongraph_core::{CanonError, artifact_to_json};
use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, value: &serde_json::Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(value).expect("json")).expect("write");
    path
}

fn manifest() -> serde_json::Value {
    json!({
        "dataset": "being",
        "hlos": [{
            "id": "op-being",
            "clauses": ["assert(pure(Being))", "tag(Being,\"indeterminate\")"],
            "relations": [
                {"predicate": "HAS", "from": "Being", "to": "Indeterminacy"},
                {"predicate": "HAS", "from": "Being", "to": "Immediacy"},
                {"predicate": "IMPLIES", "from": "Indeterminacy", "to": "Nothing"},
                {"predicate": "IMPLIES", "from": "Immediacy", "to": "Becoming"},
                {"predicate": "NEGATED", "from": "Being", "to": "Nothing"}
            ]
        }],
        "terms": [{"id": "being", "tokens": ["being", "pure"]}]
    })
}

/// Ingest the sample manifest and run the inference pipeline over it.
fn canonicalized(dir: &Path, config: &Config) -> PathBuf {
    let manifest = write(dir, "manifest.json", &manifest());
    let raw = dir.join("raw.json");
    let canon = dir.join("canon.json");
    cmd_ingest(config, &manifest, &raw, true).expect("ingest");
    cmd_canon(config, &raw, &canon, &RuleSelection::Inference, true, true).expect("canon");
    canon
}

// =============================================================================
// INGEST / CANON
// =============================================================================

#[test]
fn ingest_writes_loadable_artifact() {
    let dir = TempDir::new().expect("tempdir");
    let config = Config::default();
    let manifest = write(dir.path(), "manifest.json", &manifest());
    let output = dir.path().join("artifact.json");

    let artifact = cmd_ingest(&config, &manifest, &output, false).expect("ingest");
    let loaded = load_artifact(&output, &config).expect("load");

    assert_eq!(loaded, artifact);
    assert_eq!(loaded.dataset, "being");
    assert!(loaded.has_edge("HAS", "concept:Being", "concept:Indeterminacy"));
}

#[test]
fn canon_with_inference_accepts_becoming() {
    let dir = TempDir::new().expect("tempdir");
    let config = Config::default();
    let canon = canonicalized(dir.path(), &config);

    let artifact = load_artifact(&canon, &config).expect("load");
    assert!(artifact.has_edge("ACCEPT", "concept:Being", "concept:Becoming"));
    assert_eq!(artifact.tokens, Some(vec!["being".to_string(), "pure".to_string()]));
    assert!(artifact.counts.is_some());
}

#[test]
fn configured_structural_pipeline_infers_nothing() {
    let dir = TempDir::new().expect("tempdir");
    let config = Config::default();
    let manifest = write(dir.path(), "manifest.json", &manifest());
    let raw = dir.path().join("raw.json");
    let out = dir.path().join("out.json");
    cmd_ingest(&config, &manifest, &raw, true).expect("ingest");

    let artifact =
        cmd_canon(&config, &raw, &out, &RuleSelection::Configured, false, true).expect("canon");
    assert!(artifact.edges.iter().all(|e| !e.is_inferred()));
    assert!(artifact.counts.is_some());
}

#[test]
fn unknown_rule_name_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let config = Config::default();
    let manifest = write(dir.path(), "manifest.json", &manifest());
    let raw = dir.path().join("raw.json");
    cmd_ingest(&config, &manifest, &raw, true).expect("ingest");

    let selection = RuleSelection::Named(vec!["dedupe-edges".into(), "nope".into()]);
    let result = cmd_canon(&config, &raw, &dir.path().join("out.json"), &selection, false, true);
    assert!(matches!(result, Err(CanonError::UnknownRule(ref n)) if n == "nope"));
}

#[test]
fn config_file_drives_pipeline() {
    let dir = TempDir::new().expect("tempdir");
    let config_path = dir.path().join("canongraph.toml");
    std::fs::write(
        &config_path,
        "[pipeline]\nrules = [\"dedupe-edges\", \"hypothesize-from-conjunction\"]\n",
    )
    .expect("write");
    let config = Config::load(Some(&config_path)).expect("config");

    let manifest = write(dir.path(), "manifest.json", &manifest());
    let raw = dir.path().join("raw.json");
    let out = dir.path().join("out.json");
    cmd_ingest(&config, &manifest, &raw, true).expect("ingest");
    let artifact =
        cmd_canon(&config, &raw, &out, &RuleSelection::Configured, false, true).expect("canon");

    assert!(artifact.has_edge("ONE_OF", "concept:Being", "concept:Nothing"));
    assert!(!artifact.edges.iter().any(|e| e.is_type("ACCEPT")));
    assert!(artifact.counts.is_none());
}

// =============================================================================
// QUERY / EXPLAIN / STATUS
// =============================================================================

#[test]
fn query_file_returns_rows() {
    let dir = TempDir::new().expect("tempdir");
    let config = Config::default();
    let canon = canonicalized(dir.path(), &config);
    let query = write(
        dir.path(),
        "query.json",
        &json!({
            "match": [{
                "vars": [{"name": "s"}, {"name": "o"}],
                "edge": {"type": "ACCEPT"}
            }],
            "return": [{"expr": "s.id", "as": "subject"}, {"expr": "o.id", "as": "accepted"}]
        }),
    );

    let rows = cmd_query(&config, &canon, &query, None).expect("query");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["subject"], "concept:Being");
    assert_eq!(rows[0]["accepted"], "concept:Becoming");
}

#[test]
fn explain_verifies_every_derived_edge() {
    let dir = TempDir::new().expect("tempdir");
    let config = Config::default();
    let canon = canonicalized(dir.path(), &config);

    let entries = cmd_explain(&config, &canon, true, true).expect("explain");
    // two ONE_OF hypotheses plus one ACCEPT
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e["replays"] == json!(true)));
}

#[test]
fn status_reports_stable_checksum() {
    let dir = TempDir::new().expect("tempdir");
    let config = Config::default();
    let canon = canonicalized(dir.path(), &config);

    let first = cmd_status(&config, &canon, true).expect("status");
    let second = cmd_status(&config, &canon, true).expect("status");
    assert_eq!(first["checksum"], second["checksum"]);
    assert_eq!(first["inferred_edges"], 3);
    assert_eq!(first["blake3"].as_str().map(str::len), Some(64));
}

// =============================================================================
// EXPORT / IMPORT / VERIFY
// =============================================================================

#[test]
fn export_import_restores_artifact() {
    let dir = TempDir::new().expect("tempdir");
    let config = Config::default();
    let canon = canonicalized(dir.path(), &config);
    let exported = dir.path().join("canonical.json");
    let restored = dir.path().join("restored.json");

    cmd_export(&config, &canon, &exported, true).expect("export");
    let artifact = cmd_import(&config, &exported, &restored, true).expect("import");

    let original = load_artifact(&canon, &config).expect("load");
    assert_eq!(artifact.nodes.len(), original.nodes.len());
    assert_eq!(artifact.edges.len(), original.edges.len());
    assert_eq!(
        canongraph_core::canonical_checksum(&artifact),
        canongraph_core::canonical_checksum(&original)
    );
    assert_eq!(load_artifact(&restored, &config).expect("load"), artifact);
}

#[test]
fn verify_accepts_matching_export_and_digest() {
    let dir = TempDir::new().expect("tempdir");
    let config = Config::default();
    let canon = canonicalized(dir.path(), &config);
    let exported = dir.path().join("canonical.json");
    cmd_export(&config, &canon, &exported, true).expect("export");
    let status = cmd_status(&config, &canon, true).expect("status");
    let digest = status["blake3"].as_str().expect("digest").to_string();

    cmd_verify(&config, &canon, Some(exported.as_path()), Some(digest.as_str()), true).expect("verify");
}

#[test]
fn verify_rejects_changed_artifact() {
    let dir = TempDir::new().expect("tempdir");
    let config = Config::default();
    let canon = canonicalized(dir.path(), &config);
    let exported = dir.path().join("canonical.json");
    cmd_export(&config, &canon, &exported, true).expect("export");

    let mut changed = load_artifact(&canon, &config).expect("load");
    changed.nodes.push(canongraph_core::Node::new("extra"));
    write_artifact(&canon, &changed).expect("write");

    let result = cmd_verify(&config, &canon, Some(exported.as_path()), None, true);
    assert!(matches!(result, Err(CanonError::InvalidArtifact(_))));

    let result = cmd_verify(&config, &canon, None, Some("0".repeat(64).as_str()), true);
    assert!(matches!(result, Err(CanonError::InvalidArtifact(_))));
}

#[test]
fn import_rejects_tampered_export() {
    let dir = TempDir::new().expect("tempdir");
    let config = Config::default();
    let canon = canonicalized(dir.path(), &config);
    let exported = dir.path().join("canonical.json");
    cmd_export(&config, &canon, &exported, true).expect("export");

    let mut document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&exported).expect("read")).expect("json");
    document["artifact"]["dataset"] = json!("other");
    std::fs::write(&exported, document.to_string()).expect("write");

    let result = cmd_import(&config, &exported, &dir.path().join("restored.json"), true);
    assert!(matches!(result, Err(CanonError::DeserializationError(_))));
}

// =============================================================================
// VALIDATION & LIMITS
// =============================================================================

#[test]
fn validate_rejects_duplicate_node_ids() {
    let dir = TempDir::new().expect("tempdir");
    let config = Config::default();
    let path = write(
        dir.path(),
        "bad.json",
        &json!({"dataset": "bad", "nodes": [{"id": "a"}, {"id": "a"}], "edges": []}),
    );

    let result = cmd_validate(&config, &path, true);
    assert!(matches!(result, Err(CanonError::InvalidArtifact(_))));
}

#[test]
fn oversized_input_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let mut config = Config::default();
    config.limits.max_file_size = 16;
    let path = dir.path().join("artifact.json");
    let artifact = canongraph_core::Artifact::new("tiny")
        .with_node(canongraph_core::Node::new("a-node-with-a-long-id"));
    std::fs::write(&path, artifact_to_json(&artifact).expect("json")).expect("write");

    assert!(matches!(
        load_artifact(&path, &config),
        Err(CanonError::IoError(_))
    ));
}

#[test]
fn missing_input_is_an_io_error() {
    let dir = TempDir::new().expect("tempdir");
    let config = Config::default();
    let result = load_artifact(&dir.path().join("missing.json"), &config);
    assert!(matches!(result, Err(CanonError::IoError(_))));
}
