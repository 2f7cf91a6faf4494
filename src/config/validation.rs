//! Configuration validation with detailed error reporting.
//!
//! [`validate`] checks a parsed [`Config`] for structural errors that
//! make a mapping unusable for host matching (empty domains, domains
//! written as URLs). [`warnings`] reports problems that only surface when
//! a request is dispatched: empty target lists, unparseable target URLs,
//! and domains shadowed by an earlier mapping. Warnings never reject a
//! config, so a bad target still yields a 500 for its own requests while
//! the other mappings keep working.

use std::collections::HashSet;

use url::Url;

use super::model::{Config, DomainMapping};
use crate::error::ValidationError;

/// Validate a mapping domain. Returns `Ok(())` or a human-readable error.
pub fn validate_domain(domain: &str) -> Result<(), String> {
    if domain.is_empty() {
        return Err("domain cannot be empty".into());
    }
    if domain.contains("://") || domain.contains('/') {
        return Err(format!("'{domain}' must be a bare host name, not a URL"));
    }
    if domain.chars().any(char::is_whitespace) {
        return Err(format!("'{domain}' contains whitespace"));
    }
    Ok(())
}

/// Validate a single target URL. Returns `Ok(())` or a human-readable error.
pub fn validate_target_url(url: &str) -> Result<(), String> {
    match Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            if scheme != "http" && scheme != "https" {
                Err(format!(
                    "unsupported scheme '{scheme}' (expected http or https)"
                ))
            } else {
                Ok(())
            }
        }
        Err(_) => Err(format!("'{url}' is not a valid URL")),
    }
}

/// Strip a scheme and path from something that looks like a URL.
fn suggest_host(domain: &str) -> Option<String> {
    let without_scheme = domain.split_once("://").map_or(domain, |(_, rest)| rest);
    let host = without_scheme.split('/').next().unwrap_or_default().trim();
    (!host.is_empty() && host != domain).then(|| format!("did you mean '{host}'?"))
}

fn mapping_id(index: usize, mapping: &DomainMapping) -> String {
    if mapping.domain.is_empty() {
        format!("mappings[{index}]")
    } else {
        mapping.domain.clone()
    }
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (i, mapping) in config.mappings.iter().enumerate() {
        if let Err(msg) = validate_domain(&mapping.domain) {
            errors.push(ValidationError {
                mapping: mapping_id(i, mapping),
                field: "domain".into(),
                message: msg,
                suggestion: suggest_host(&mapping.domain),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[must_use]
pub fn warnings(config: &Config) -> Vec<ValidationError> {
    let mut warnings = Vec::new();
    let mut seen_domains = HashSet::new();

    for (i, mapping) in config.mappings.iter().enumerate() {
        let id = mapping_id(i, mapping);

        if !seen_domains.insert(mapping.domain.as_str()) {
            warnings.push(ValidationError {
                mapping: id.clone(),
                field: "domain".into(),
                message: "duplicate domain, shadowed by an earlier mapping".into(),
                suggestion: None,
            });
        }

        if mapping.targets.is_empty() {
            warnings.push(ValidationError {
                mapping: id.clone(),
                field: "targets".into(),
                message: "no targets, requests for this domain get the fallback response".into(),
                suggestion: None,
            });
        }

        for target in &mapping.targets {
            if let Err(msg) = validate_target_url(target) {
                warnings.push(ValidationError {
                    mapping: id.clone(),
                    field: "targets".into(),
                    message: msg,
                    suggestion: None,
                });
            }
        }
    }

    warnings
}

#[must_use]
pub fn format_validation_report(source: &str, config: &Config) -> String {
    let mut lines = vec![format!(
        "  {} mappings, {} targets\n",
        config.mappings.len(),
        config.total_targets()
    )];

    for mapping in &config.mappings {
        lines.push(format!(
            "  {}  -> {} targets",
            mapping.domain,
            mapping.targets.len()
        ));
        for target in &mapping.targets {
            lines.push(format!("    {target}"));
        }
    }

    format!("{} is valid\n{}", source, lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mappings: Vec<DomainMapping>) -> Config {
        Config { mappings }
    }

    #[test]
    fn valid_config_passes() {
        let config = config(vec![DomainMapping::new("example.com", ["http://a.local"])]);
        assert!(validate(&config).is_ok());
        assert!(warnings(&config).is_empty());
    }

    #[test]
    fn no_mappings_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn empty_domain_fails() {
        let config = config(vec![DomainMapping::new("", ["http://a.local"])]);
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].mapping, "mappings[0]");
        assert!(errors[0].message.contains("cannot be empty"));
    }

    #[test]
    fn url_as_domain_fails_with_suggestion() {
        let config = config(vec![DomainMapping::new(
            "https://example.com/path",
            ["http://a.local"],
        )]);
        let errors = validate(&config).unwrap_err();
        assert_eq!(
            errors[0].suggestion.as_deref(),
            Some("did you mean 'example.com'?")
        );
    }

    #[test]
    fn domain_with_port_is_allowed() {
        let config = config(vec![DomainMapping::new("example.com:8443", ["http://a.local"])]);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn empty_targets_warns_but_validates() {
        let config = config(vec![DomainMapping::new("example.com", Vec::<String>::new())]);
        assert!(validate(&config).is_ok());
        let warnings = warnings(&config);
        assert!(warnings.iter().any(|w| w.message.contains("no targets")));
    }

    #[test]
    fn invalid_target_warns_but_validates() {
        let config = config(vec![DomainMapping::new("example.com", ["not a url"])]);
        assert!(validate(&config).is_ok());
        assert!(warnings(&config)
            .iter()
            .any(|w| w.message.contains("not a valid URL")));
    }

    #[test]
    fn non_http_scheme_warns() {
        let config = config(vec![DomainMapping::new("example.com", ["ftp://files.local"])]);
        assert!(warnings(&config)
            .iter()
            .any(|w| w.message.contains("unsupported scheme 'ftp'")));
    }

    #[test]
    fn duplicate_domain_warns() {
        let config = config(vec![
            DomainMapping::new("example.com", ["http://a.local"]),
            DomainMapping::new("example.com", ["http://b.local"]),
        ]);
        let warnings = warnings(&config);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("shadowed"));
    }

    #[test]
    fn report_lists_each_mapping() {
        let config = config(vec![DomainMapping::new(
            "example.com",
            ["http://a.local", "http://b.local"],
        )]);
        let report = format_validation_report("redirector.yaml", &config);
        assert!(report.starts_with("redirector.yaml is valid"));
        assert!(report.contains("1 mappings, 2 targets"));
        assert!(report.contains("example.com  -> 2 targets"));
        assert!(report.contains("    http://b.local"));
    }
}
