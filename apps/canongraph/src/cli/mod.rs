//! # canongraph CLI Module
//!
//! ## Available Commands
//!
//! - `ingest` - Turn a dataset manifest into an artifact file
//! - `canon` - Run the canon pipeline over an artifact file
//! - `query` - Execute a query file against an artifact
//! - `explain` - List derived edges with their provenance
//! - `status` - Show artifact sizes, counters and checksums
//! - `validate` - Check an artifact file against the data model
//! - `export` - Write the canonical export of an artifact
//! - `import` - Turn a canonical export back into an artifact file
//! - `verify` - Check an artifact against a canonical export or BLAKE3 digest

mod commands;

use crate::config::Config;
use canongraph_core::CanonError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// canongraph - canonicalize, infer, query and explain graph artifacts
#[derive(Parser, Debug)]
#[command(name = "canongraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a dataset manifest into an artifact file
    Ingest {
        /// Manifest file (JSON)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Artifact file to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run the canon pipeline over an artifact
    Canon {
        /// Artifact file to read
        #[arg(short, long)]
        input: PathBuf,

        /// Artifact file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Comma-separated rule names, overriding the configuration
        #[arg(short, long, value_delimiter = ',', conflicts_with = "inference")]
        rules: Option<Vec<String>>,

        /// Run structural cleanup plus every logical-inference rule
        #[arg(long)]
        inference: bool,

        /// Print per-stage node and edge deltas
        #[arg(short, long)]
        trace: bool,
    },

    /// Execute a query against an artifact
    Query {
        /// Artifact file to read
        #[arg(short, long)]
        artifact: PathBuf,

        /// Query file (JSON QueryAST)
        #[arg(short = 'f', long)]
        query: PathBuf,

        /// Round cap for the query's rules
        #[arg(long)]
        max_iterations: Option<usize>,
    },

    /// List derived edges and their provenance
    Explain {
        /// Artifact file to read
        #[arg(short, long)]
        artifact: PathBuf,

        /// Replay each derived edge from its sources
        #[arg(long)]
        verify: bool,
    },

    /// Show artifact status
    Status {
        /// Artifact file to read
        #[arg(short, long)]
        artifact: PathBuf,
    },

    /// Validate an artifact file
    Validate {
        /// Artifact file to read
        #[arg(short, long)]
        artifact: PathBuf,
    },

    /// Export an artifact in canonical form
    Export {
        /// Artifact file to read
        #[arg(short, long)]
        input: PathBuf,

        /// Canonical export file to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import a canonical export as an artifact file
    Import {
        /// Canonical export file to read
        #[arg(short, long)]
        input: PathBuf,

        /// Artifact file to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Verify an artifact against a canonical export or BLAKE3 digest
    Verify {
        /// Artifact file to read
        #[arg(short, long)]
        artifact: PathBuf,

        /// Canonical export to compare against
        #[arg(long, required_unless_present = "blake3")]
        canonical: Option<PathBuf>,

        /// Expected BLAKE3 digest (64 hex characters)
        #[arg(long)]
        blake3: Option<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), CanonError> {
    let config = Config::load(cli.config.as_deref())?;
    let json_mode = cli.json_mode;

    if cli.verbose {
        tracing::info!(
            rules = ?config.pipeline.rules,
            max_iterations = config.pipeline.max_iterations,
            max_file_size = config.limits.max_file_size,
            "configuration loaded"
        );
    }

    match cli.command {
        Commands::Ingest { manifest, output } => {
            cmd_ingest(&config, &manifest, &output, json_mode).map(|_| ())
        }
        Commands::Canon {
            input,
            output,
            rules,
            inference,
            trace,
        } => {
            let selection = match rules {
                Some(names) => RuleSelection::Named(names),
                None if inference => RuleSelection::Inference,
                None => RuleSelection::Configured,
            };
            cmd_canon(&config, &input, &output, &selection, trace, json_mode).map(|_| ())
        }
        Commands::Query {
            artifact,
            query,
            max_iterations,
        } => cmd_query(&config, &artifact, &query, max_iterations).map(|_| ()),
        Commands::Explain { artifact, verify } => {
            cmd_explain(&config, &artifact, verify, json_mode).map(|_| ())
        }
        Commands::Status { artifact } => cmd_status(&config, &artifact, json_mode).map(|_| ()),
        Commands::Validate { artifact } => cmd_validate(&config, &artifact, json_mode),
        Commands::Export { input, output } => {
            cmd_export(&config, &input, &output, json_mode).map(|_| ())
        }
        Commands::Import { input, output } => {
            cmd_import(&config, &input, &output, json_mode).map(|_| ())
        }
        Commands::Verify {
            artifact,
            canonical,
            blake3,
        } => cmd_verify(
            &config,
            &artifact,
            canonical.as_deref(),
            blake3.as_deref(),
            json_mode,
        ),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canon_rule_list() {
        let cli = Cli::try_parse_from([
            "canongraph",
            "canon",
            "-i",
            "in.json",
            "-o",
            "out.json",
            "--rules",
            "dedupe-edges,resolve-disjunction",
        ])
        .expect("parse");

        match cli.command {
            Commands::Canon { rules, inference, .. } => {
                assert_eq!(
                    rules,
                    Some(vec!["dedupe-edges".to_string(), "resolve-disjunction".to_string()])
                );
                assert!(!inference);
            }
            other => unreachable!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn rules_and_inference_conflict() {
        let result = Cli::try_parse_from([
            "canongraph",
            "canon",
            "-i",
            "in.json",
            "-o",
            "out.json",
            "--rules",
            "dedupe-edges",
            "--inference",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn verify_needs_a_reference() {
        assert!(Cli::try_parse_from(["canongraph", "verify", "-a", "x.json"]).is_err());
        assert!(
            Cli::try_parse_from(["canongraph", "verify", "-a", "x.json", "--blake3", "00"]).is_ok()
        );
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from(["canongraph", "status", "-a", "x.json", "--json-mode", "-q"])
            .expect("parse");
        assert!(cli.json_mode);
        assert!(cli.quiet);
        assert!(cli.config.is_none());
    }
}
