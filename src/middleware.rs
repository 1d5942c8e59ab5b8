//! Middlewares for routes.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use regex_lite::Regex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::ServerError;
use crate::config::{CORS_ALLOWED_HEADERS, CORS_ALLOWED_METHODS, Settings};
use crate::error::Result;

static HOST_VALIDATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z0-9.-]+|\[[a-f0-9]*:[a-f0-9.:]+\])(:[0-9]+)?$")
        .expect("host validation pattern is valid")
});

/// Headers sent on every response unless a handler already set them.
const SECURITY_HEADERS: [(&str, &str); 4] = [
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "same-origin"),
    ("cross-origin-opener-policy", "same-origin"),
    ("x-frame-options", "DENY"),
];

/// Seconds a browser may cache a preflight answer.
const CORS_PREFLIGHT_MAX_AGE: u64 = 86400;

/// CORS policy: every origin, fixed methods and headers.
pub fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(CORS_ALLOWED_METHODS)
        .allow_headers(CORS_ALLOWED_HEADERS.map(HeaderName::from_static))
        .max_age(Duration::from_secs(CORS_PREFLIGHT_MAX_AGE))
}

/// One layer per security response header.
pub fn security_headers() -> [SetResponseHeaderLayer<HeaderValue>; 4] {
    SECURITY_HEADERS.map(|(name, value)| {
        SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        )
    })
}

/// Reject requests whose host is not in the allowed hosts.
pub async fn allowed_hosts(
    State(settings): State<Arc<Settings>>,
    req: Request,
    next: Next,
) -> Result<Response> {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|host| host.to_str().ok())
        .map(str::to_owned)
        .or_else(|| req.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default();

    if is_allowed_host(&host, &settings.effective_allowed_hosts()) {
        Ok(next.run(req).await)
    } else {
        Err(ServerError::DisallowedHost(host))
    }
}

/// Whether `host` (optionally with a port) matches one of `patterns`.
pub fn is_allowed_host(host: &str, patterns: &[String]) -> bool {
    let Some((domain, _port)) = split_domain_port(host) else {
        return false;
    };

    !domain.is_empty()
        && patterns
            .iter()
            .any(|pattern| is_same_domain(&domain, pattern))
}

/// Split a host header into lower-cased domain and port.
///
/// Returns `None` for syntactically invalid hosts.
pub fn split_domain_port(host: &str) -> Option<(String, String)> {
    let host = host.to_lowercase();

    if !HOST_VALIDATION.is_match(&host) {
        return None;
    }

    if host.ends_with(']') {
        return Some((host, String::new()));
    }

    let (domain, port) = match host.rsplit_once(':') {
        Some((domain, port)) => (domain.to_owned(), port.to_owned()),
        None => (host, String::new()),
    };
    let domain = domain.strip_suffix('.').unwrap_or(&domain).to_owned();

    Some((domain, port))
}

fn is_same_domain(host: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }

    let pattern = pattern.to_lowercase();
    if pattern == "*" {
        return true;
    }

    match pattern.strip_prefix('.') {
        Some(parent) => host == parent || host.ends_with(pattern.as_str()),
        None => host == pattern,
    }
}
