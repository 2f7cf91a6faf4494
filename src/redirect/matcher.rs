//! Host header matching against configured domains.
//!
//! A mapping matches when the Host header equals its domain, or equals
//! the domain followed by `:<listen port>`. Any other port suffix does
//! not match. Mappings are scanned in order and the first match wins.

use crate::config::model::DomainMapping;

#[derive(Debug, Clone)]
pub struct HostMatcher {
    port_suffix: String,
}

impl HostMatcher {
    #[must_use]
    pub fn new(listen_port: u16) -> Self {
        Self {
            port_suffix: format!(":{listen_port}"),
        }
    }

    #[must_use]
    pub fn matches(&self, host: &str, domain: &str) -> bool {
        host.strip_prefix(domain)
            .is_some_and(|rest| rest.is_empty() || rest == self.port_suffix)
    }

    /// First mapping whose domain matches `host`, if any.
    #[must_use]
    pub fn find<'a>(&self, host: &str, mappings: &'a [DomainMapping]) -> Option<&'a DomainMapping> {
        mappings.iter().find(|m| self.matches(host, &m.domain))
    }
}
