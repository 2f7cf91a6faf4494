//! Concrete [`ConfigSource`](super::ConfigSource) implementations.
//!
//! [`env::EnvSource`] reads `domain->targets` entries from prefixed
//! environment variables. [`file_source::FileSource`] reads a structured
//! YAML, JSON or TOML file; the formats are gated by feature flags and
//! picked by file extension in [`file_source_for`].

pub mod env;
pub mod file_source;

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::config::model::Config;
use crate::error::RedirectorError;
use file_source::FileSource;

/// File names probed in the working directory when `--config` is absent.
pub const AUTO_DETECT_CANDIDATES: &[&str] = &[
    "redirector.yaml",
    "redirector.yml",
    "redirector.json",
    "redirector.toml",
];

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type Deserialize = fn(&str) -> Result<Config, BoxError>;

#[cfg(feature = "yaml")]
fn from_yaml(content: &str) -> Result<Config, BoxError> {
    serde_yml::from_str(content).map_err(Into::into)
}

#[cfg(feature = "json")]
fn from_json(content: &str) -> Result<Config, BoxError> {
    serde_json::from_str(content).map_err(Into::into)
}

#[cfg(feature = "toml")]
fn from_toml(content: &str) -> Result<Config, BoxError> {
    toml::from_str(content).map_err(Into::into)
}

fn deserializer_for(ext: &str) -> Option<(&'static str, Deserialize)> {
    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => Some(("yaml", from_yaml as Deserialize)),

        #[cfg(feature = "json")]
        "json" => Some(("json", from_json as Deserialize)),

        #[cfg(feature = "toml")]
        "toml" => Some(("toml", from_toml as Deserialize)),

        _ => None,
    }
}

/// Parse a config string based on file extension.
pub fn parse_config_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<Config, RedirectorError> {
    let (_, deserialize) =
        deserializer_for(ext).ok_or_else(|| RedirectorError::UnsupportedFormat(ext.to_string()))?;
    deserialize(content).map_err(|source| RedirectorError::ConfigParse {
        path: path_display.to_string(),
        source,
    })
}

/// Whether this build has a deserializer for the extension of `path`.
#[must_use]
pub fn is_supported(path: &Path) -> bool {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    deserializer_for(ext).is_some()
}

/// Build a [`FileSource`] for `path`, choosing the format by extension.
pub fn file_source_for(path: &Path) -> Result<FileSource, RedirectorError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let (name, deserialize) =
        deserializer_for(ext).ok_or_else(|| RedirectorError::UnsupportedFormat(ext.to_string()))?;
    Ok(FileSource::new(path.to_path_buf(), name, deserialize))
}

/// Compute a lowercase hex-encoded SHA-256 digest.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
