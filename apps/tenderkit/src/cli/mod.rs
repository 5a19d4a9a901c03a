//! # tenderkit CLI Module
//!
//! This module implements the CLI interface for tenderkit.
//!
//! ## Available Commands
//!
//! - `sectors` - List catalog sectors
//! - `catalog` - List the categories a sector offers
//! - `new` - Start a new draft composition
//! - `toggle` / `move-category` / `move-sub` / `remove` / `clear` / `arrange` - Edit the draft
//! - `show` - Preview the draft
//! - `export` - Export the draft to PDF, word, spreadsheet or JSON
//! - `verify` - Check that all export formats carry the same content
//! - `save` / `history` / `open` / `delete` / `stats` - Saved snapshots
//! - `init` - Initialize a new snapshot database

mod commands;

use crate::config::{FileConfig, Overrides, Settings};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tenderkit_core::TenderError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// tenderkit - tender criteria composer
///
/// Pick sub-criteria from the catalog, put them in order, and export the
/// result to PDF, word-processor, spreadsheet and JSON documents.
#[derive(Parser, Debug)]
#[command(name = "tenderkit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the config file [default: tenderkit.toml if present]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the snapshot database [default: tenderkit.db]
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Path to the working draft [default: tender.draft.json]
    #[arg(long, global = true)]
    pub draft: Option<PathBuf>,

    /// Catalog TOML file [default: built-in catalog]
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Owner of saved snapshots [default: local]
    #[arg(long, global = true)]
    pub owner: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List catalog sectors
    Sectors,

    /// List the categories and sub-criteria a sector offers
    Catalog {
        /// Sector id [default: the draft's sector, else the catalog default]
        #[arg(short, long)]
        sector: Option<String>,
    },

    /// Start a new, empty draft
    New {
        /// Sector id
        #[arg(short, long)]
        sector: String,

        /// Tender title
        #[arg(short, long)]
        title: Option<String>,

        /// Overwrite an existing draft
        #[arg(short, long)]
        force: bool,
    },

    /// Select or deselect sub-criteria of one category
    Toggle {
        /// Category id
        category: String,

        /// Sub-criterion indices, as listed by `catalog`
        #[arg(required = true)]
        indices: Vec<usize>,
    },

    /// Move a category to a new position
    MoveCategory {
        /// Category id
        category: String,

        /// Target position (0-based, clamped)
        position: usize,
    },

    /// Move a sub-criterion within its category
    MoveSub {
        /// Category id
        category: String,

        /// Sub-criterion index
        index: usize,

        /// Target position (0-based, clamped)
        position: usize,
    },

    /// Remove a category and all its sub-criteria
    Remove {
        /// Category id
        category: String,
    },

    /// Remove every category
    Clear,

    /// Order categories by the sector's priority template
    Arrange,

    /// Preview the draft
    Show,

    /// Export the draft
    Export {
        /// Export format (pdf, word, spreadsheet, json)
        #[arg(short = 't', long)]
        format: String,

        /// Output file path [default: tender_criteria.<ext>]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that every export format carries the same entries
    Verify {
        /// Canonical JSON export to check instead of the draft
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Save the draft as a snapshot
    Save {
        /// Snapshot title [default: the draft's title, else "Tender YYYY-MM-DD"]
        #[arg(short, long)]
        title: Option<String>,

        /// Mark the snapshot as a draft
        #[arg(long)]
        draft: bool,
    },

    /// List saved snapshots, newest first
    History,

    /// Replace the draft with a saved snapshot
    Open {
        /// Snapshot id
        id: u64,
    },

    /// Delete a saved snapshot
    Delete {
        /// Snapshot id
        id: u64,
    },

    /// Show history statistics
    Stats,

    /// Initialize a new empty snapshot database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Resolve effective settings from flags and the config file.
    pub fn settings(&self) -> Result<Settings, TenderError> {
        let file = FileConfig::load(self.config.as_deref())?;
        let overrides = Overrides {
            database: self.database.clone(),
            draft: self.draft.clone(),
            catalog: self.catalog.clone(),
            owner: self.owner.clone(),
        };
        Ok(Settings::merge(file, overrides))
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), TenderError> {
    let settings = cli.settings()?;
    let json_mode = cli.json_mode;
    if cli.verbose {
        tracing::info!(
            database = %settings.database.display(),
            draft = %settings.draft.display(),
            owner = settings.owner.as_str(),
            "Effective settings"
        );
    }

    match cli.command {
        Some(Commands::Sectors) => cmd_sectors(&settings, json_mode),
        Some(Commands::Catalog { sector }) => cmd_catalog(&settings, json_mode, sector.as_deref()),
        Some(Commands::New {
            sector,
            title,
            force,
        }) => cmd_new(&settings, &sector, title.as_deref(), force),
        Some(Commands::Toggle { category, indices }) => {
            cmd_toggle(&settings, json_mode, &category, &indices)
        }
        Some(Commands::MoveCategory { category, position }) => {
            cmd_move_category(&settings, &category, position)
        }
        Some(Commands::MoveSub {
            category,
            index,
            position,
        }) => cmd_move_sub(&settings, &category, index, position),
        Some(Commands::Remove { category }) => cmd_remove(&settings, &category),
        Some(Commands::Clear) => cmd_clear(&settings),
        Some(Commands::Arrange) => cmd_arrange(&settings),
        Some(Commands::Show) => cmd_show(&settings, json_mode),
        Some(Commands::Export { format, output }) => {
            cmd_export(&settings, json_mode, &format, output.as_deref())
        }
        Some(Commands::Verify { input }) => cmd_verify(&settings, json_mode, input.as_deref()),
        Some(Commands::Save { title, draft }) => {
            cmd_save(&settings, json_mode, title.as_deref(), draft)
        }
        Some(Commands::History) => cmd_history(&settings, json_mode),
        Some(Commands::Open { id }) => cmd_open(&settings, id),
        Some(Commands::Delete { id }) => cmd_delete(&settings, id),
        Some(Commands::Stats) => cmd_stats(&settings, json_mode),
        Some(Commands::Init { force }) => cmd_init(&settings, force),
        None => {
            // No subcommand - preview the draft by default
            cmd_show(&settings, json_mode)
        }
    }
}
