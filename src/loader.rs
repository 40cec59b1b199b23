//! # Configuration Loader
//!
//! Reads the static extension file once and compiles it into rules.
//!
//! Read and parse failures are logged and degrade to an empty rule set; they never
//! reach the caller of `load_rules`.

use crate::extension::{ExtensionParser, ParseError};
use crate::rule::{CompileReport, RuleCompiler};
use log::{error, info};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default location of the extension file
pub const DEFAULT_EXTENSIONS_PATH: &str = "/extensions/instance_type_extensions.json";

/// Environment variable that overrides the extension file location
pub const EXTENSIONS_PATH_ENV: &str = "INSTANCE_TYPE_EXTENSIONS_PATH";

// ================================================================================================
// CONFIGURATION
// ================================================================================================

/// Configuration for loading extension rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtenderConfig {
    /// Path to the JSON extension file
    pub extensions_path: PathBuf,
}

impl Default for ExtenderConfig {
    fn default() -> Self {
        Self {
            extensions_path: PathBuf::from(DEFAULT_EXTENSIONS_PATH),
        }
    }
}

impl ExtenderConfig {
    pub fn new(extensions_path: impl Into<PathBuf>) -> Self {
        Self {
            extensions_path: extensions_path.into(),
        }
    }

    /// Default configuration, with the path taken from the environment when set.
    pub fn from_env() -> Self {
        match std::env::var(EXTENSIONS_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::new(path),
            _ => Self::default(),
        }
    }
}

// ================================================================================================
// LOADING
// ================================================================================================

/// Load-time failures that discard the whole file
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed reading extensions from {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed parsing extensions from {path}: {source}")]
    Unparseable {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Reads, parses and compiles the extension file, reporting why it failed.
///
/// Individually invalid patterns are not an error; they end up in `CompileReport::skipped`.
pub fn try_load_rules(path: &Path) -> Result<CompileReport, LoadError> {
    let data = std::fs::read(path).map_err(|source| LoadError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let specs = ExtensionParser::from_json_bytes(&data).map_err(|source| LoadError::Unparseable {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(RuleCompiler::compile(&specs))
}

/// Loads rules for `config`. Any failure is logged and yields zero rules.
pub fn load_rules(config: &ExtenderConfig) -> CompileReport {
    match try_load_rules(&config.extensions_path) {
        Ok(report) => {
            info!(
                "Loaded {} instance type extension rules from {} ({} skipped)",
                report.rules.len(),
                config.extensions_path.display(),
                report.skipped.len()
            );
            report
        }
        Err(e) => {
            error!("{}", e);
            CompileReport::default()
        }
    }
}
