//! Loading pipeline: finds the `pipes` data file, deserializes it and
//! resolves overrides into validated configs.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers.

use crate::schema::PipesData;
use conduit_core::config::{ConfigError, PipeConfig};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Base name of the pipe configuration file.
pub const PIPES_FILE: &str = "pipes";

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A config was requested for a network the file does not define.
    #[error("no network override named '{name}'")]
    UnknownNetwork { name: String },

    /// A resolved config failed validation.
    #[error("invalid config for {network}: {source}")]
    InvalidConfig {
        network: String,
        #[source]
        source: ConfigError,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for `{base_name}.ron`, `.toml` or `.json`.
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if !candidate.exists() {
            continue;
        }
        if let Some(existing) = found {
            return Err(DataLoadError::ConflictingFormats {
                a: existing,
                b: candidate,
            });
        }
        found = Some(candidate);
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its format (detected from
/// the extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    let parse_error = |detail: String| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    };

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
    }
}

// ===========================================================================
// Resolution
// ===========================================================================

/// Validated configs: one default plus named per-network overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeConfigSet {
    pub default: PipeConfig,
    pub networks: BTreeMap<String, PipeConfig>,
}

impl Default for PipeConfigSet {
    fn default() -> Self {
        Self {
            default: PipeConfig::default(),
            networks: BTreeMap::new(),
        }
    }
}

impl PipeConfigSet {
    /// Apply every override to the default and validate the results.
    pub fn resolve(data: &PipesData) -> Result<Self, DataLoadError> {
        data.default
            .validate()
            .map_err(|source| DataLoadError::InvalidConfig {
                network: "default".to_string(),
                source,
            })?;

        let mut networks = BTreeMap::new();
        for (name, over) in &data.networks {
            let config = over.apply(&data.default);
            config
                .validate()
                .map_err(|source| DataLoadError::InvalidConfig {
                    network: format!("network '{name}'"),
                    source,
                })?;
            networks.insert(name.clone(), config);
        }

        Ok(Self {
            default: data.default,
            networks,
        })
    }

    pub fn get(&self, name: &str) -> Option<&PipeConfig> {
        self.networks.get(name)
    }

    /// Config for a named network, failing if the file does not define it.
    pub fn require(&self, name: &str) -> Result<&PipeConfig, DataLoadError> {
        self.get(name).ok_or_else(|| DataLoadError::UnknownNetwork {
            name: name.to_string(),
        })
    }

    /// Config for a named network, or the default.
    pub fn for_network(&self, name: &str) -> &PipeConfig {
        self.get(name).unwrap_or(&self.default)
    }
}

/// Load and resolve a single pipes file.
pub fn load_pipe_config_file(path: &Path) -> Result<PipeConfigSet, DataLoadError> {
    let data: PipesData = deserialize_file(path)?;
    let set = PipeConfigSet::resolve(&data)?;
    log::debug!(
        "loaded pipe config from {} with {} network overrides",
        path.display(),
        set.networks.len()
    );
    Ok(set)
}

/// Load `pipes.{ron,toml,json}` from `dir`.
pub fn load_pipe_config(dir: &Path) -> Result<PipeConfigSet, DataLoadError> {
    let path = require_data_file(dir, PIPES_FILE)?;
    load_pipe_config_file(&path)
}

// ===========================================================================
// Tests
// ===========================================================================
