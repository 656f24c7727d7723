//! # CLI Command Implementations
//!
//! Every command reads its inputs from files, runs the core, and either
//! writes an artifact file or prints a report (text or JSON).

use crate::config::Config;
use canongraph_core::export::{
    canonical_checksum, canonical_crypto_hash, export_canonical, import_canonical,
    verify_canonical, verify_crypto_hash,
};
use canongraph_core::formats::{
    artifact_from_json_limited, artifact_to_json, manifest_from_json, query_from_json, rows_to_json,
};
use canongraph_core::provenance::derived_edges;
use canongraph_core::{
    Artifact, CanonError, CanonPipeline, Ingestor, QueryEngine, Row, StageReport,
    verify_derivation,
};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), CanonError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| CanonError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(CanonError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, CanonError> {
    let canonical = path.canonicalize().map_err(|e| {
        CanonError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(CanonError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path whose parent directory must already exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, CanonError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        CanonError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(CanonError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| CanonError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Read a size-checked input file to a string.
fn read_input(path: &Path, config: &Config) -> Result<String, CanonError> {
    let path = validate_file_path(path)?;
    validate_file_size(&path, config.limits.max_file_size)?;
    std::fs::read_to_string(&path)
        .map_err(|e| CanonError::IoError(format!("Cannot read '{}': {}", path.display(), e)))
}

fn payload_limit(config: &Config) -> usize {
    usize::try_from(config.limits.max_file_size).unwrap_or(usize::MAX)
}

/// Load and validate an artifact file.
pub fn load_artifact(path: &Path, config: &Config) -> Result<Artifact, CanonError> {
    let text = read_input(path, config)?;
    artifact_from_json_limited(&text, payload_limit(config))
}

/// Write an artifact file as pretty JSON.
pub fn write_artifact(path: &Path, artifact: &Artifact) -> Result<(), CanonError> {
    let path = validate_output_path(path)?;
    let text = artifact_to_json(artifact)?;
    std::fs::write(&path, text)
        .map_err(|e| CanonError::IoError(format!("Cannot write '{}': {}", path.display(), e)))
}

fn print_json(value: &Value) -> Result<(), CanonError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CanonError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// INGEST COMMAND
// =============================================================================

/// Ingest a manifest file into an artifact file.
pub fn cmd_ingest(
    config: &Config,
    manifest_path: &Path,
    output: &Path,
    json_mode: bool,
) -> Result<Artifact, CanonError> {
    let text = read_input(manifest_path, config)?;
    let manifest = manifest_from_json(&text, payload_limit(config))?;
    let artifact = Ingestor::ingest(&manifest)?;
    write_artifact(output, &artifact)?;

    tracing::info!(
        dataset = %artifact.dataset,
        nodes = artifact.nodes.len(),
        edges = artifact.edges.len(),
        "manifest ingested"
    );

    if json_mode {
        print_json(&json!({
            "dataset": artifact.dataset,
            "output": output.to_string_lossy(),
            "nodes": artifact.nodes.len(),
            "edges": artifact.edges.len(),
        }))?;
    } else {
        println!("Ingested '{}'", artifact.dataset);
        println!("  Nodes:  {}", artifact.nodes.len());
        println!("  Edges:  {}", artifact.edges.len());
        println!("  Output: {}", output.display());
    }

    Ok(artifact)
}

// =============================================================================
// CANON COMMAND
// =============================================================================

/// How `canon` picks its rules.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RuleSelection {
    /// The `[pipeline] rules` of the configuration.
    #[default]
    Configured,
    /// Structural cleanup plus every logical-inference rule.
    Inference,
    /// An explicit ordered list of rule names.
    Named(Vec<String>),
}

impl RuleSelection {
    /// Build the pipeline this selection describes.
    pub fn pipeline(&self, config: &Config) -> Result<CanonPipeline, CanonError> {
        match self {
            Self::Configured => config.pipeline(),
            Self::Inference => Ok(CanonPipeline::with_inference()),
            Self::Named(names) => CanonPipeline::from_names(names),
        }
    }
}

/// Run the canon pipeline over an artifact file.
pub fn cmd_canon(
    config: &Config,
    input: &Path,
    output: &Path,
    selection: &RuleSelection,
    trace: bool,
    json_mode: bool,
) -> Result<Artifact, CanonError> {
    let pipeline = selection.pipeline(config)?;
    let artifact = load_artifact(input, config)?;
    let (out, stages) = pipeline.run_traced(&artifact);
    write_artifact(output, &out)?;

    let inferred = out.edges.iter().filter(|e| e.is_inferred()).count();
    tracing::info!(
        rules = pipeline.len(),
        edges = out.edges.len(),
        inferred,
        "canon pipeline applied"
    );

    if json_mode {
        let mut report = json!({
            "rules": pipeline.names(),
            "nodes": out.nodes.len(),
            "edges": out.edges.len(),
            "inferred": inferred,
        });
        if trace {
            report["stages"] = stages.iter().map(stage_to_json).collect();
        }
        print_json(&report)?;
    } else {
        println!("Canonicalized '{}'", out.dataset);
        println!("  Rules:    {}", pipeline.names().join(", "));
        println!("  Nodes:    {}", out.nodes.len());
        println!("  Edges:    {}", out.edges.len());
        println!("  Inferred: {}", inferred);
        if trace {
            println!();
            for stage in &stages {
                println!(
                    "  {:<30} nodes {} -> {}  edges {} -> {}",
                    stage.rule,
                    stage.nodes_before,
                    stage.nodes_after,
                    stage.edges_before,
                    stage.edges_after
                );
            }
        }
    }

    Ok(out)
}

fn stage_to_json(stage: &StageReport) -> Value {
    json!({
        "rule": stage.rule,
        "nodes_before": stage.nodes_before,
        "nodes_after": stage.nodes_after,
        "edges_before": stage.edges_before,
        "edges_after": stage.edges_after,
    })
}

// =============================================================================
// QUERY COMMAND
// =============================================================================

/// Execute a query file against an artifact file and print the rows.
///
/// Rows are always printed as JSON.
pub fn cmd_query(
    config: &Config,
    artifact_path: &Path,
    query_path: &Path,
    max_iterations: Option<usize>,
) -> Result<Vec<Row>, CanonError> {
    let artifact = load_artifact(artifact_path, config)?;
    let ast = query_from_json(&read_input(query_path, config)?)?;

    let engine = QueryEngine::new(&artifact)
        .with_max_iterations(max_iterations.unwrap_or(config.pipeline.max_iterations));
    let rows = engine.execute(&ast)?;

    println!("{}", rows_to_json(&rows)?);
    Ok(rows)
}

// =============================================================================
// EXPLAIN COMMAND
// =============================================================================

/// List every derived edge with its provenance, optionally replaying each.
pub fn cmd_explain(
    config: &Config,
    artifact_path: &Path,
    verify: bool,
    json_mode: bool,
) -> Result<Vec<Value>, CanonError> {
    let artifact = load_artifact(artifact_path, config)?;

    let mut entries = Vec::new();
    for (edge, provenance) in derived_edges(&artifact) {
        let mut entry = json!({
            "edge": edge.key(),
            "provenance": provenance.to_value(),
        });
        if verify {
            entry["replays"] = Value::Bool(verify_derivation(edge, &artifact)?);
        }
        entries.push(entry);
    }

    if json_mode {
        print_json(&Value::Array(entries.clone()))?;
    } else if entries.is_empty() {
        println!("No derived edges.");
    } else {
        for (edge, provenance) in derived_edges(&artifact) {
            println!(
                "{}({}, {})  by {}",
                edge.edge_type, edge.from, edge.to, provenance.rule
            );
            for source in &provenance.sources {
                println!("    <- {}({}, {})", source.edge_type, source.from, source.to);
            }
        }
        if verify {
            let failed = entries
                .iter()
                .filter(|e| e["replays"] == Value::Bool(false))
                .count();
            println!();
            println!("Replayed: {} ok, {} failed", entries.len() - failed, failed);
        }
    }

    Ok(entries)
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Summarize an artifact file: sizes, counters and checksums.
pub fn cmd_status(
    config: &Config,
    artifact_path: &Path,
    json_mode: bool,
) -> Result<Value, CanonError> {
    let artifact = load_artifact(artifact_path, config)?;
    let checksum = canonical_checksum(&artifact);
    let hash = canonical_crypto_hash(&artifact)?;
    let inferred = artifact.edges.iter().filter(|e| e.is_inferred()).count();

    let status = json!({
        "dataset": artifact.dataset,
        "nodes": artifact.nodes.len(),
        "edges": artifact.edges.len(),
        "inferred_edges": inferred,
        "tokens": artifact.tokens.as_ref().map_or(0, Vec::len),
        "counts": artifact.counts,
        "checksum": checksum,
        "blake3": hash,
    });

    if json_mode {
        print_json(&status)?;
    } else {
        println!("Artifact Status");
        println!("===============");
        println!("Dataset:  {}", artifact.dataset);
        println!("Nodes:    {}", artifact.nodes.len());
        println!("Edges:    {} ({} inferred)", artifact.edges.len(), inferred);
        if let Some(counts) = &artifact.counts {
            for (name, value) in counts {
                println!("  {:<10} {}", name, value);
            }
        }
        println!("Checksum: {:016x}", checksum);
        println!("BLAKE3:   {}", hash);
    }

    Ok(status)
}

// =============================================================================
// EXPORT / IMPORT / VERIFY COMMANDS
// =============================================================================

/// Write the canonical export of an artifact file.
pub fn cmd_export(
    config: &Config,
    input: &Path,
    output: &Path,
    json_mode: bool,
) -> Result<String, CanonError> {
    let artifact = load_artifact(input, config)?;
    let canonical = export_canonical(&artifact)?;
    let path = validate_output_path(output)?;
    std::fs::write(&path, &canonical)
        .map_err(|e| CanonError::IoError(format!("Cannot write '{}': {}", path.display(), e)))?;

    let checksum = canonical_checksum(&artifact);
    if json_mode {
        print_json(&json!({
            "output": output.to_string_lossy(),
            "bytes": canonical.len(),
            "checksum": checksum,
        }))?;
    } else {
        println!("Exported '{}' ({} bytes)", artifact.dataset, canonical.len());
        println!("  Checksum: {:016x}", checksum);
    }
    Ok(canonical)
}

/// Read a canonical export, check it, and write it back as an artifact file.
pub fn cmd_import(
    config: &Config,
    input: &Path,
    output: &Path,
    json_mode: bool,
) -> Result<Artifact, CanonError> {
    let artifact = import_canonical(&read_input(input, config)?)?;
    write_artifact(output, &artifact)?;

    if json_mode {
        print_json(&json!({
            "dataset": artifact.dataset,
            "nodes": artifact.nodes.len(),
            "edges": artifact.edges.len(),
        }))?;
    } else {
        println!(
            "Imported '{}': {} nodes, {} edges",
            artifact.dataset,
            artifact.nodes.len(),
            artifact.edges.len()
        );
    }
    Ok(artifact)
}

/// Check an artifact against a canonical export and/or a BLAKE3 digest.
///
/// A mismatch is an `InvalidArtifact` error.
pub fn cmd_verify(
    config: &Config,
    artifact_path: &Path,
    canonical: Option<&Path>,
    blake3: Option<&str>,
    json_mode: bool,
) -> Result<(), CanonError> {
    let artifact = load_artifact(artifact_path, config)?;

    let canonical_ok = match canonical {
        Some(path) => Some(verify_canonical(&artifact, &read_input(path, config)?)?),
        None => None,
    };
    let hash_ok = match blake3 {
        Some(expected) => Some(verify_crypto_hash(&artifact, expected)?),
        None => None,
    };

    if json_mode {
        print_json(&json!({
            "dataset": artifact.dataset,
            "canonical": canonical_ok,
            "blake3": hash_ok,
        }))?;
    } else {
        if let Some(ok) = canonical_ok {
            println!("Canonical export: {}", if ok { "match" } else { "MISMATCH" });
        }
        if let Some(ok) = hash_ok {
            println!("BLAKE3 digest:    {}", if ok { "match" } else { "MISMATCH" });
        }
    }

    if canonical_ok == Some(false) || hash_ok == Some(false) {
        return Err(CanonError::InvalidArtifact(format!(
            "'{}' does not match its expected canonical form",
            artifact_path.display()
        )));
    }
    Ok(())
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Validate an artifact file. Loading already validates; this reports it.
pub fn cmd_validate(
    config: &Config,
    artifact_path: &Path,
    json_mode: bool,
) -> Result<(), CanonError> {
    let artifact = load_artifact(artifact_path, config)?;

    if json_mode {
        print_json(&json!({
            "dataset": artifact.dataset,
            "valid": true,
        }))?;
    } else {
        println!("'{}' is a valid artifact", artifact.dataset);
    }
    Ok(())
}
