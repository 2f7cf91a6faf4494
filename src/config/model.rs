//! Data structures for redirector configuration.
//!
//! Contains [`Config`] (the root), [`DomainMapping`] and
//! [`RedirectOptions`]. `Config` and `DomainMapping` derive `Serialize`
//! and `Deserialize` with `deny_unknown_fields` for strict file parsing;
//! mappings also round-trip through the `domain->t1,t2` text form used by
//! environment variables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Separator between the domain and its targets in the text form.
pub const MAPPING_ARROW: &str = "->";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub mappings: Vec<DomainMapping>,
}

impl Config {
    #[must_use]
    pub fn total_targets(&self) -> usize {
        self.mappings.iter().map(|m| m.targets.len()).sum()
    }
}

/// One host name and the ordered list of base URLs it rotates through.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DomainMapping {
    pub domain: String,
    pub targets: Vec<String>,
}

impl DomainMapping {
    #[must_use]
    pub fn new(domain: impl Into<String>, targets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            domain: domain.into(),
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }
}

/// Returned when a mapping string has no `->` separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingArrow;

impl fmt::Display for MissingArrow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing '{MAPPING_ARROW}' separator")
    }
}

impl std::error::Error for MissingArrow {}

impl FromStr for DomainMapping {
    type Err = MissingArrow;

    /// Parse `domain->target1,target2`. Whitespace around the domain and
    /// each target is trimmed and empty target entries are dropped, so
    /// `example.com->` yields a mapping with no targets.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (domain, targets) = s.split_once(MAPPING_ARROW).ok_or(MissingArrow)?;
        Ok(Self {
            domain: domain.trim().to_string(),
            targets: targets
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
        })
    }
}

impl fmt::Display for DomainMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{MAPPING_ARROW}{}", self.domain, self.targets.join(","))
    }
}

/// Per-redirect URL rewriting switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedirectOptions {
    /// Replace the target path with the request path.
    pub preserve_path: bool,
    /// Append a `_t` cache-busting timestamp.
    pub add_timestamp: bool,
    /// Append `ref=<request host>`.
    pub add_referral: bool,
}
