//! Engine configuration from data files.
//!
//! Feature-gated behind `data-loader`. Reads an [`EngineConfig`] (or just the
//! [`EconomyConstants`]) from RON, TOML or JSON, picked by file extension.
//! Omitted fields take their defaults; unknown constant names are errors.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::economy::{EconomyConstants, EngineConfig};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported config format: {file}")]
    UnsupportedFormat { file: PathBuf },
    #[error("failed to read {file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error in {origin}: {detail}")]
    Parse { origin: String, detail: String },
}

// ---------------------------------------------------------------------------
// Format detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

pub fn detect_format(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(ConfigError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn parse<T: DeserializeOwned>(text: &str, format: Format, origin: &str) -> Result<T, ConfigError> {
    let parsed = match format {
        Format::Ron => ron::from_str(text).map_err(|e| e.to_string()),
        Format::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
    };
    parsed.map_err(|detail| ConfigError::Parse {
        origin: origin.to_string(),
        detail,
    })
}

fn read(path: &Path) -> Result<(String, Format), ConfigError> {
    let format = detect_format(path)?;
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        file: path.to_path_buf(),
        source,
    })?;
    Ok((text, format))
}

pub fn parse_constants(text: &str, format: Format) -> Result<EconomyConstants, ConfigError> {
    parse(text, format, "<constants>")
}

pub fn parse_config(text: &str, format: Format) -> Result<EngineConfig, ConfigError> {
    parse(text, format, "<config>")
}

/// Load economy constants from a `.ron`, `.toml` or `.json` file.
pub fn load_constants(path: &Path) -> Result<EconomyConstants, ConfigError> {
    let (text, format) = read(path)?;
    parse(&text, format, &path.display().to_string())
}

/// Load a full engine configuration from a `.ron`, `.toml` or `.json` file.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let (text, format) = read(path)?;
    parse(&text, format, &path.display().to_string())
}
