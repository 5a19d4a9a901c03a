//! # tenderkit - Tender Criteria Composer
//!
//! The main binary for composing tender documents.
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │               apps/tenderkit (THE BINARY)          │
//! │                                                    │
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────┐ │
//! │  │   CLI       │   │   Config    │   │  Draft   │ │
//! │  │  (clap)     │   │   (toml)    │   │  (json)  │ │
//! │  └──────┬──────┘   └──────┬──────┘   └────┬─────┘ │
//! │         └─────────────────┼───────────────┘       │
//! │                           ▼                       │
//! │                  ┌────────────────┐               │
//! │                  │ tenderkit-core │               │
//! │                  │  (THE LOGIC)   │               │
//! │                  └────────────────┘               │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! tenderkit new --sector it --title "Data centre"
//! tenderkit toggle C1 0 2
//! tenderkit move-category C1 0
//! tenderkit export -t pdf
//! tenderkit save --draft
//! ```

use clap::Parser;
use tenderkit::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // TENDERKIT_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("TENDERKIT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tenderkit=info,tenderkit_core=info".into());

    // Logs go to stderr; stdout is reserved for command output.
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
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the tenderkit startup banner.
fn print_banner() {
    eprintln!("tenderkit v{} - tender criteria composer", env!("CARGO_PKG_VERSION"));
}
