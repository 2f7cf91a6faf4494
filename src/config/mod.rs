//! Domain mapping configuration: sources, validation, and reloading.
//!
//! Defines the [`ConfigSource`] trait that supplies the mapping list to
//! the dispatcher, the [`ConfigResolver`] that pairs a primary source
//! with an optional fallback, and [`ConfigVersion`] for change
//! detection. The redirect core never touches the environment or the
//! filesystem itself; it only sees the [`Config`] a source produced.

pub mod model;
pub mod sources;
pub mod validation;

use async_trait::async_trait;

use crate::error::RedirectorError;
use model::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigVersion {
    Hash(String),
}

impl ConfigVersion {
    /// Short form for logs and the health report.
    #[must_use]
    pub fn short(&self) -> &str {
        match self {
            Self::Hash(h) => h.get(..8).unwrap_or(h),
        }
    }
}

/// A config load result, tagged with the source that produced it.
#[derive(Debug)]
pub struct Loaded {
    pub config: Config,
    pub version: ConfigVersion,
    pub source_name: &'static str,
}

// async_trait is required here because ConfigSource is used as Box<dyn ConfigSource>
// and native async fn in traits does not support dyn dispatch.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn load(&self) -> Result<(Config, ConfigVersion), RedirectorError>;
    async fn has_changed(&self, current: &ConfigVersion) -> Result<bool, RedirectorError>;
}

pub struct ConfigResolver {
    primary: Box<dyn ConfigSource>,
    fallback: Option<Box<dyn ConfigSource>>,
}

impl ConfigResolver {
    #[must_use]
    pub fn new(primary: Box<dyn ConfigSource>, fallback: Option<Box<dyn ConfigSource>>) -> Self {
        Self { primary, fallback }
    }

    pub async fn load_with_fallback(&self) -> Result<Loaded, RedirectorError> {
        let primary_err = match self.primary.load().await {
            Ok((config, version)) => {
                return Ok(Loaded {
                    config,
                    version,
                    source_name: self.primary.name(),
                })
            }
            Err(e) => e,
        };

        let Some(ref fallback) = self.fallback else {
            return Err(primary_err);
        };

        tracing::warn!(
            primary = self.primary.name(),
            fallback = fallback.name(),
            error = %primary_err,
            "primary config source failed, using fallback"
        );
        let (config, version) = fallback.load().await?;
        Ok(Loaded {
            config,
            version,
            source_name: fallback.name(),
        })
    }

    /// Reload for a running service whose config came from `current_source`
    /// at `current_version`.
    ///
    /// Never switches to the fallback because the primary broke: a failing
    /// primary is an error and the caller keeps what it has. A service that
    /// started on the fallback moves back to the primary once it loads, and
    /// otherwise follows changes of the fallback itself. `Ok(None)` means
    /// nothing changed.
    pub async fn reload(
        &self,
        current_source: &str,
        current_version: &ConfigVersion,
    ) -> Result<Option<Loaded>, RedirectorError> {
        if current_source == self.primary.name() {
            if !self.primary.has_changed(current_version).await? {
                return Ok(None);
            }
            let (config, version) = self.primary.load().await?;
            return Ok(Some(Loaded {
                config,
                version,
                source_name: self.primary.name(),
            }));
        }

        match self.primary.load().await {
            Ok((config, version)) => {
                tracing::info!(
                    primary = self.primary.name(),
                    "primary config source recovered"
                );
                return Ok(Some(Loaded {
                    config,
                    version,
                    source_name: self.primary.name(),
                }));
            }
            Err(e) => {
                tracing::debug!(
                    primary = self.primary.name(),
                    error = %e,
                    "primary config source still failing"
                );
            }
        }

        let Some(ref fallback) = self.fallback else {
            return Ok(None);
        };
        if current_source != fallback.name() || !fallback.has_changed(current_version).await? {
            return Ok(None);
        }
        let (config, version) = fallback.load().await?;
        Ok(Some(Loaded {
            config,
            version,
            source_name: fallback.name(),
        }))
    }
}
