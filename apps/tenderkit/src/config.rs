//! # Configuration
//!
//! Optional `tenderkit.toml` settings, merged with command-line flags.
//!
//! Precedence: CLI flag > config file > built-in default. A missing default
//! config file is ignored; a missing file named with `--config` is an error.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tenderkit_core::{Catalog, OwnerId, TenderError};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "tenderkit.toml";

/// Default redb snapshot store.
pub const DEFAULT_DATABASE: &str = "tenderkit.db";

/// Default working composition file.
pub const DEFAULT_DRAFT: &str = "tender.draft.json";

/// Default snapshot owner.
pub const DEFAULT_OWNER: &str = "local";

/// Maximum config file size (64 KB).
const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

/// On-disk shape of `tenderkit.toml`. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub database: Option<PathBuf>,
    pub draft: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub owner: Option<String>,
}

impl FileConfig {
    /// Parse config from TOML text.
    pub fn from_toml_str(source: &str) -> Result<Self, TenderError> {
        toml::from_str(source).map_err(|e| TenderError::ConfigError(e.to_string()))
    }

    /// Load the config file.
    ///
    /// With `explicit = None` the default file is read if it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self, TenderError> {
        let path = match explicit {
            Some(path) => path,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let metadata = std::fs::metadata(path).map_err(|e| {
            TenderError::ConfigError(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(TenderError::ConfigError(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let source = std::fs::read_to_string(path).map_err(|e| {
            TenderError::ConfigError(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Self::from_toml_str(&source)
    }
}

/// Values given on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub draft: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub owner: Option<String>,
}

/// Effective settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database: PathBuf,
    pub draft: PathBuf,
    /// `None` selects the built-in catalog.
    pub catalog: Option<PathBuf>,
    pub owner: OwnerId,
}

impl Default for Settings {
    fn default() -> Self {
        Self::merge(FileConfig::default(), Overrides::default())
    }
}

impl Settings {
    /// Merge flags over the file over the defaults.
    #[must_use]
    pub fn merge(file: FileConfig, cli: Overrides) -> Self {
        Self {
            database: cli
                .database
                .or(file.database)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE)),
            draft: cli
                .draft
                .or(file.draft)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DRAFT)),
            catalog: cli.catalog.or(file.catalog),
            owner: OwnerId::new(
                cli.owner
                    .or(file.owner)
                    .unwrap_or_else(|| DEFAULT_OWNER.to_string()),
            ),
        }
    }

    /// Load the configured catalog, or the built-in one.
    pub fn load_catalog(&self) -> Result<Catalog, TenderError> {
        match &self.catalog {
            Some(path) => Catalog::from_file(path),
            None => Catalog::builtin(),
        }
    }
}
