//! # canongraph
//!
//! The canongraph command line binary.
//!
//! ## Usage
//!
//! ```bash
//! canongraph ingest -m manifest.json -o artifact.json
//! canongraph canon -i artifact.json -o canon.json --inference --trace
//! canongraph query -a canon.json -f query.json
//! canongraph explain -a canon.json --verify
//! canongraph status -a canon.json --json-mode
//! ```

use canongraph::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // CANONGRAPH_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("CANONGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "canongraph=info,canongraph_core=warn".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        eprintln!("canongraph v{}", env!("CARGO_PKG_VERSION"));
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
