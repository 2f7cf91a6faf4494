//! `redirector init` — write a starter mappings file.
//!
//! Serializes an example [`Config`] in the chosen format. Refuses to
//! overwrite an existing file.

use std::path::PathBuf;

use crate::cli::{ConfigFormat, InitArgs};
use crate::config::model::{Config, DomainMapping};
use crate::error::RedirectorError;

const HEADER: &str = "Each mapping redirects requests whose Host header equals `domain`\n\
                      (optionally with `:<listen port>`) to its targets in turn.";

#[must_use]
pub fn starter_config() -> Config {
    Config {
        mappings: vec![DomainMapping::new(
            "example.com",
            ["http://a.example.net", "http://b.example.net"],
        )],
    }
}

/// Serialize a `Config` to a formatted string in the given format.
pub fn serialize_config(config: &Config, format: &ConfigFormat) -> Result<String, RedirectorError> {
    let commented = |body: String| {
        let header: String = HEADER.lines().map(|l| format!("# {l}\n")).collect();
        format!("{header}\n{body}")
    };

    match format {
        #[cfg(feature = "yaml")]
        ConfigFormat::Yaml => serde_yml::to_string(config)
            .map(commented)
            .map_err(|e| RedirectorError::Io(std::io::Error::other(e.to_string()))),

        #[cfg(not(feature = "yaml"))]
        ConfigFormat::Yaml => Err(RedirectorError::UnsupportedFormat("yaml".into())),

        #[cfg(feature = "json")]
        ConfigFormat::Json => serde_json::to_string_pretty(config)
            .map(|s| s + "\n")
            .map_err(|e| RedirectorError::Io(std::io::Error::other(e.to_string()))),

        #[cfg(not(feature = "json"))]
        ConfigFormat::Json => Err(RedirectorError::UnsupportedFormat("json".into())),

        #[cfg(feature = "toml")]
        ConfigFormat::Toml => toml::to_string_pretty(config)
            .map(commented)
            .map_err(|e| RedirectorError::Io(std::io::Error::other(e.to_string()))),

        #[cfg(not(feature = "toml"))]
        ConfigFormat::Toml => Err(RedirectorError::UnsupportedFormat("toml".into())),
    }
}

pub fn execute(args: &InitArgs) -> Result<(), RedirectorError> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("redirector.{}", args.format.extension())));

    if output.exists() {
        return Err(RedirectorError::FileExists { path: output });
    }

    let content = serialize_config(&starter_config(), &args.format)?;
    std::fs::write(&output, content)?;
    println!("Created {}", output.display());
    Ok(())
}
