//! Async file-based config source with SHA-256 change detection.
//!
//! [`FileSource`] reads a structured mapping file through Tokio, runs
//! the deserializer chosen for its extension, validates the result and
//! hashes the raw content for version tracking.

use std::path::PathBuf;

use async_trait::async_trait;

use super::{sha256_hex, Deserialize};
use crate::config::model::Config;
use crate::config::validation::{validate, warnings};
use crate::config::{ConfigSource, ConfigVersion};
use crate::error::RedirectorError;

pub struct FileSource {
    path: PathBuf,
    name: &'static str,
    deserialize: Deserialize,
}

impl FileSource {
    #[must_use]
    pub(super) fn new(path: PathBuf, name: &'static str, deserialize: Deserialize) -> Self {
        Self {
            path,
            name,
            deserialize,
        }
    }

    async fn read_content(&self) -> Result<String, RedirectorError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RedirectorError::ConfigFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                RedirectorError::Io(e)
            }
        })
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn load(&self) -> Result<(Config, ConfigVersion), RedirectorError> {
        let content = self.read_content().await?;

        let config = (self.deserialize)(&content).map_err(|e| RedirectorError::ConfigParse {
            path: self.path.display().to_string(),
            source: e,
        })?;

        if let Err(errors) = validate(&config) {
            return Err(RedirectorError::ConfigValidation { errors });
        }
        for warning in warnings(&config) {
            tracing::warn!(path = %self.path.display(), "{}", warning.to_string().trim());
        }

        let hash = sha256_hex(content.as_bytes());
        Ok((config, ConfigVersion::Hash(hash)))
    }

    async fn has_changed(&self, current: &ConfigVersion) -> Result<bool, RedirectorError> {
        let content = self.read_content().await?;
        let hash = sha256_hex(content.as_bytes());
        Ok(*current != ConfigVersion::Hash(hash))
    }
}
