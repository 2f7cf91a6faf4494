//! Environment-variable config source.
//!
//! Every variable whose name starts with the mapping prefix
//! (`DOMAIN_MAPPING_` by default) holds one mapping in the text form
//! `domain->target1,target2`. Variables are taken in lexical order of
//! their names, so the enumeration is the same on every load and the
//! first-match rule of the domain matcher is predictable.

use async_trait::async_trait;

use super::sha256_hex;
use crate::config::model::{Config, DomainMapping};
use crate::config::validation::{validate, warnings};
use crate::config::{ConfigSource, ConfigVersion};
use crate::error::RedirectorError;

pub const DEFAULT_PREFIX: &str = "DOMAIN_MAPPING_";

pub struct EnvSource {
    prefix: String,
}

impl EnvSource {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn snapshot(&self) -> Vec<(String, String)> {
        prefixed_vars(&self.prefix)
    }
}

/// Variables from the process environment whose names start with
/// `prefix`, sorted by name. Variables that are not valid UTF-8 are
/// skipped.
#[must_use]
pub fn prefixed_vars(prefix: &str) -> Vec<(String, String)> {
    let mut vars: Vec<(String, String)> = std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .filter(|(k, _)| k.starts_with(prefix))
        .collect();
    vars.sort();
    vars
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

/// Parse prefixed `(name, value)` pairs into a [`Config`].
///
/// Pairs whose name lacks `prefix` are ignored. Mapping order follows the
/// order of `vars`.
pub fn parse_vars<I, K, V>(prefix: &str, vars: I) -> Result<Config, RedirectorError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut mappings = Vec::new();
    for (name, value) in vars {
        let (name, value) = (name.as_ref(), value.as_ref());
        if !name.starts_with(prefix) {
            continue;
        }
        let mapping: DomainMapping = value.parse().map_err(|_| RedirectorError::MalformedMapping {
            name: name.to_string(),
            value: value.to_string(),
        })?;
        mappings.push(mapping);
    }
    Ok(Config { mappings })
}

fn fingerprint(vars: &[(String, String)]) -> String {
    let joined: String = vars.iter().map(|(k, v)| format!("{k}={v}\n")).collect();
    sha256_hex(joined.as_bytes())
}

#[async_trait]
impl ConfigSource for EnvSource {
    fn name(&self) -> &'static str {
        "env"
    }

    async fn load(&self) -> Result<(Config, ConfigVersion), RedirectorError> {
        let vars = self.snapshot();
        let config = parse_vars(&self.prefix, vars.iter().map(|(k, v)| (k, v)))?;

        if let Err(errors) = validate(&config) {
            return Err(RedirectorError::ConfigValidation { errors });
        }
        for warning in warnings(&config) {
            tracing::warn!(source = "env", "{}", warning.to_string().trim());
        }

        Ok((config, ConfigVersion::Hash(fingerprint(&vars))))
    }

    async fn has_changed(&self, current: &ConfigVersion) -> Result<bool, RedirectorError> {
        Ok(*current != ConfigVersion::Hash(fingerprint(&self.snapshot())))
    }
}
