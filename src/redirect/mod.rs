//! Host-based redirect dispatch.
//!
//! The [`redirect_handler`] function is the Axum fallback that receives
//! every request on the redirect listener, whatever its method or path.
//! It hands the Host header and path to the [`Dispatcher`], which matches
//! the host against the loaded mappings ([`matcher`]), picks the next
//! target round-robin ([`rotation`]) and builds the `Location`
//! ([`target_url`]).

pub mod matcher;
pub mod rotation;
pub mod target_url;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use crate::config::model::{DomainMapping, RedirectOptions};
use crate::error::RedirectError;
use crate::server::AppState;
use matcher::HostMatcher;
use rotation::RotationState;

/// Body served for hosts with no usable mapping.
pub const FALLBACK_BODY: &str = "Domain redirect service is running";

/// Body served when the selected target is not a valid URL.
pub const INVALID_TARGET_BODY: &str = "Invalid target URL";

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome<'a> {
    Redirect {
        domain: &'a str,
        target: &'a str,
        location: String,
    },
    /// The matched mapping has no targets.
    NoTargets { domain: &'a str },
    Unmatched,
}

/// Owns the rotation state and the per-process redirect settings.
#[derive(Debug)]
pub struct Dispatcher {
    matcher: HostMatcher,
    rotation: RotationState,
    options: RedirectOptions,
}

impl Dispatcher {
    #[must_use]
    pub fn new(listen_port: u16, options: RedirectOptions) -> Self {
        Self {
            matcher: HostMatcher::new(listen_port),
            rotation: RotationState::new(),
            options,
        }
    }

    #[must_use]
    pub const fn options(&self) -> RedirectOptions {
        self.options
    }

    #[must_use]
    pub const fn rotation(&self) -> &RotationState {
        &self.rotation
    }

    /// Resolve one request against `mappings`.
    ///
    /// Advances the rotation cursor of the matched domain even when the
    /// selected target then fails to parse.
    pub fn dispatch<'a>(
        &self,
        mappings: &'a [DomainMapping],
        host: &str,
        path: &str,
    ) -> Result<Outcome<'a>, RedirectError> {
        let Some(mapping) = self.matcher.find(host, mappings) else {
            return Ok(Outcome::Unmatched);
        };

        let Some(target) = self.rotation.next(&mapping.domain, &mapping.targets) else {
            return Ok(Outcome::NoTargets {
                domain: &mapping.domain,
            });
        };

        let location = target_url::build_location(target, path, host, self.options)?;
        Ok(Outcome::Redirect {
            domain: &mapping.domain,
            target,
            location,
        })
    }
}

/// Raw Host header, falling back to the request URI authority.
fn request_host<'a>(headers: &'a HeaderMap, uri: &'a Uri) -> &'a str {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| uri.authority().map(axum::http::uri::Authority::as_str))
        .unwrap_or("")
}

fn with_correlation_id(mut response: Response, correlation_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(correlation_id) {
        response.headers_mut().insert("x-correlation-id", value);
    }
    response
}

pub async fn redirect_handler(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    req_headers: HeaderMap,
) -> Response {
    let path = uri.path();
    let host = request_host(&req_headers, &uri);
    let correlation_id = req_headers
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

    // Clone the Arc<Config> (cheap refcount bump) to release the RwLock right away
    let config = Arc::clone(&state.config.read().await.config);

    let response = match state.dispatcher.dispatch(&config.mappings, host, path) {
        Ok(Outcome::Redirect {
            domain,
            target,
            location,
        }) => match HeaderValue::from_str(&location) {
            Ok(value) => {
                state.stats.redirected.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    correlation_id = %correlation_id,
                    method = %method,
                    host = %host,
                    path = %path,
                    domain = %domain,
                    target = %target,
                    location = %location,
                    "redirecting"
                );
                (StatusCode::FOUND, [(header::LOCATION, value)]).into_response()
            }
            Err(e) => {
                state.stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    correlation_id = %correlation_id,
                    location = %location,
                    error = %e,
                    "location is not a valid header value"
                );
                (StatusCode::INTERNAL_SERVER_ERROR, INVALID_TARGET_BODY).into_response()
            }
        },
        Ok(Outcome::NoTargets { domain }) => {
            state.stats.unmatched.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                correlation_id = %correlation_id,
                host = %host,
                domain = %domain,
                "domain has no targets, serving fallback"
            );
            (StatusCode::OK, FALLBACK_BODY).into_response()
        }
        Ok(Outcome::Unmatched) => {
            state.stats.unmatched.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                correlation_id = %correlation_id,
                host = %host,
                path = %path,
                "no domain matched"
            );
            (StatusCode::OK, FALLBACK_BODY).into_response()
        }
        Err(e) => {
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                correlation_id = %correlation_id,
                host = %host,
                error = %e,
                "redirect failed"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, INVALID_TARGET_BODY).into_response()
        }
    };

    with_correlation_id(response, &correlation_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mappings() -> Vec<DomainMapping> {
        vec![
            DomainMapping::new("example.com", ["http://a.local", "http://b.local"]),
            DomainMapping::new("empty.test", Vec::<String>::new()),
            DomainMapping::new("broken.test", ["not a url"]),
        ]
    }

    fn location(outcome: Outcome<'_>) -> String {
        match outcome {
            Outcome::Redirect { location, .. } => location,
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[test]
    fn rotates_across_requests() {
        let dispatcher = Dispatcher::new(8080, RedirectOptions::default());
        let mappings = mappings();
        let picked: Vec<String> = (0..3)
            .map(|_| location(dispatcher.dispatch(&mappings, "example.com", "/").unwrap()))
            .collect();
        assert_eq!(picked, vec!["http://a.local/", "http://b.local/", "http://a.local/"]);
    }

    #[test]
    fn host_with_port_shares_the_rotation() {
        let dispatcher = Dispatcher::new(8080, RedirectOptions::default());
        let mappings = mappings();
        let first = location(dispatcher.dispatch(&mappings, "example.com", "/").unwrap());
        let second = location(dispatcher.dispatch(&mappings, "example.com:8080", "/").unwrap());
        assert_eq!(first, "http://a.local/");
        assert_eq!(second, "http://b.local/");
    }

    #[test]
    fn unknown_host_is_unmatched() {
        let dispatcher = Dispatcher::new(8080, RedirectOptions::default());
        let mappings = mappings();
        let outcome = dispatcher.dispatch(&mappings, "unknown.test", "/").unwrap();
        assert_eq!(outcome, Outcome::Unmatched);
    }

    #[test]
    fn empty_target_list_is_guarded() {
        let dispatcher = Dispatcher::new(8080, RedirectOptions::default());
        let mappings = mappings();
        let outcome = dispatcher.dispatch(&mappings, "empty.test", "/").unwrap();
        assert_eq!(outcome, Outcome::NoTargets { domain: "empty.test" });
    }

    #[test]
    fn invalid_target_is_an_error() {
        let dispatcher = Dispatcher::new(8080, RedirectOptions::default());
        let err = dispatcher.dispatch(&mappings(), "broken.test", "/").unwrap_err();
        assert!(matches!(err, RedirectError::InvalidTarget { .. }));
    }

    #[test]
    fn options_flow_into_location() {
        let options = RedirectOptions {
            preserve_path: true,
            add_timestamp: false,
            add_referral: true,
        };
        let dispatcher = Dispatcher::new(8080, options);
        let loc = location(dispatcher.dispatch(&mappings(), "example.com", "/docs").unwrap());
        assert_eq!(loc, "http://a.local/docs?ref=example.com");
    }

    #[test]
    fn host_falls_back_to_uri_authority() {
        let headers = HeaderMap::new();
        let uri: Uri = "http://example.com:8080/x".parse().unwrap();
        assert_eq!(request_host(&headers, &uri), "example.com:8080");

        let uri: Uri = "/x".parse().unwrap();
        assert_eq!(request_host(&headers, &uri), "");
    }
}
