//! # tenderkit
//!
//! Library target of the `tenderkit` binary, so integration tests can
//! drive the CLI and configuration directly.
//!
//! ## Modules
//!
//! - `cli`: clap command tree and command implementations
//! - `config`: `tenderkit.toml` loading and flag precedence

pub mod cli;
pub mod config;
