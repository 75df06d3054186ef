//! Resampler options files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use avkit_audio::{ResamplerError, ResamplerOptions};
use thiserror::Error;

/// Error type for options file loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read options file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed YAML options: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("malformed JSON options: {0}")]
    Json(#[from] serde_json::Error),
    #[error("options file is neither a YAML nor a JSON mapping")]
    Unrecognized,
    #[error("unusable resampler options: {0}")]
    Invalid(#[from] ResamplerError),
}

/// Syntax of an options file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Syntax {
    Yaml,
    Json,
}

impl Syntax {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(Syntax::Yaml),
            "json" => Some(Syntax::Json),
            _ => None,
        }
    }
}

/// Reads and validates resampler options, so that a bad file is reported
/// before any audio is touched.
pub fn load_options(path: impl AsRef<Path>) -> Result<ResamplerOptions, ConfigError> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_options(&data, path)
}

/// Parses options from `data`. Files without a known extension are tried as
/// YAML, then JSON.
pub fn parse_options(data: &[u8], path: impl AsRef<Path>) -> Result<ResamplerOptions, ConfigError> {
    let options: ResamplerOptions = match Syntax::from_path(path.as_ref()) {
        Some(Syntax::Yaml) => serde_yaml::from_slice(data)?,
        Some(Syntax::Json) => serde_json::from_slice(data)?,
        None => serde_yaml::from_slice(data)
            .ok()
            .or_else(|| serde_json::from_slice(data).ok())
            .ok_or(ConfigError::Unrecognized)?,
    };
    options.validate()?;
    Ok(options)
}
