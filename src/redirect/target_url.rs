//! Redirect `Location` construction.
//!
//! [`build_location`] parses the selected target base URL and applies the
//! [`RedirectOptions`]: path replacement, a `_t` cache-busting timestamp
//! and a `ref` parameter carrying the original Host header. Query
//! parameters already on the target survive unless one of those two
//! keys overwrites them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use url::Url;

use crate::config::model::RedirectOptions;
use crate::error::RedirectError;

pub const TIMESTAMP_PARAM: &str = "_t";
pub const REFERRAL_PARAM: &str = "ref";

static LAST_TIMESTAMP: AtomicU64 = AtomicU64::new(0);

/// Nanoseconds since the Unix epoch, bumped so that no two calls in this
/// process return the same value.
fn cache_buster() -> u64 {
    #[allow(clippy::cast_possible_truncation)]
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos() as u64);
    let prev = LAST_TIMESTAMP
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or(now);
    now.max(prev + 1)
}

/// Build the redirect URL for `target`.
///
/// `request_path` replaces the target's path verbatim when
/// `preserve_path` is set; `request_host` is the raw Host header used for
/// the referral parameter.
pub fn build_location(
    target: &str,
    request_path: &str,
    request_host: &str,
    options: RedirectOptions,
) -> Result<String, RedirectError> {
    let mut url = Url::parse(target).map_err(|source| RedirectError::InvalidTarget {
        target: target.to_string(),
        source,
    })?;

    if options.preserve_path {
        url.set_path(request_path);
    }

    let mut overrides: Vec<(&str, String)> = Vec::with_capacity(2);
    if options.add_timestamp {
        overrides.push((TIMESTAMP_PARAM, cache_buster().to_string()));
    }
    if options.add_referral {
        overrides.push((REFERRAL_PARAM, request_host.to_string()));
    }

    if !overrides.is_empty() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !overrides.iter().any(|(key, _)| k == key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(&kept)
            .extend_pairs(&overrides);
    }

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: RedirectOptions = RedirectOptions {
        preserve_path: false,
        add_timestamp: false,
        add_referral: false,
    };

    fn query_value(location: &str, key: &str) -> Option<String> {
        Url::parse(location)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn no_options_keeps_target() {
        let location = build_location("http://a.local/landing?x=1", "/ignored", "h", NONE).unwrap();
        assert_eq!(location, "http://a.local/landing?x=1");
    }

    #[test]
    fn invalid_target_is_an_error() {
        let err = build_location("not a url", "/", "h", NONE).unwrap_err();
        assert!(matches!(err, RedirectError::InvalidTarget { ref target, .. } if target == "not a url"));
    }

    #[test]
    fn preserve_path_overwrites_target_path() {
        let options = RedirectOptions {
            preserve_path: true,
            ..NONE
        };
        let location = build_location("http://a.local/base/path", "/docs/page", "h", options).unwrap();
        assert_eq!(location, "http://a.local/docs/page");
    }

    #[test]
    fn preserve_path_keeps_target_query() {
        let options = RedirectOptions {
            preserve_path: true,
            ..NONE
        };
        let location = build_location("http://a.local/base?campaign=x", "/p", "h", options).unwrap();
        assert_eq!(location, "http://a.local/p?campaign=x");
    }

    #[test]
    fn referral_carries_host() {
        let options = RedirectOptions {
            add_referral: true,
            ..NONE
        };
        let location = build_location("http://a.local/", "/", "example.com:8080", options).unwrap();
        assert_eq!(query_value(&location, "ref").as_deref(), Some("example.com:8080"));
    }

    #[test]
    fn referral_overwrites_existing_key_and_keeps_others() {
        let options = RedirectOptions {
            add_referral: true,
            ..NONE
        };
        let location =
            build_location("http://a.local/?ref=old&ref=older&utm=1", "/", "example.com", options)
                .unwrap();
        let url = Url::parse(&location).unwrap();
        let refs: Vec<_> = url.query_pairs().filter(|(k, _)| k == "ref").collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].1, "example.com");
        assert_eq!(query_value(&location, "utm").as_deref(), Some("1"));
    }

    #[test]
    fn timestamp_differs_between_calls() {
        let options = RedirectOptions {
            add_timestamp: true,
            ..NONE
        };
        let first = build_location("http://a.local/", "/", "h", options).unwrap();
        let second = build_location("http://a.local/", "/", "h", options).unwrap();
        let t1: u64 = query_value(&first, "_t").unwrap().parse().unwrap();
        let t2: u64 = query_value(&second, "_t").unwrap().parse().unwrap();
        assert!(t2 > t1);
    }

    #[test]
    fn all_options_together() {
        let options = RedirectOptions {
            preserve_path: true,
            add_timestamp: true,
            add_referral: true,
        };
        let location = build_location("https://b.local/x?_t=stale", "/y", "example.com", options).unwrap();
        let url = Url::parse(&location).unwrap();
        assert_eq!(url.path(), "/y");
        assert_ne!(query_value(&location, "_t").as_deref(), Some("stale"));
        assert_eq!(query_value(&location, "ref").as_deref(), Some("example.com"));
    }
}
