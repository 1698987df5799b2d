//! Client identification utilities
//!
//! Common functions for identifying clients via HTTP headers.

use axum::http::HeaderMap;
use std::fmt;
use std::net::IpAddr;

use crate::cookie::extract_cookie_ignore_case;

/// Cookie carrying the per-browser CSRF token
pub const XSRF_COOKIE_NAME: &str = "x-xsrf-token";

/// Key identifying the client behind a request, independent of any session
///
/// Used to serialize requests from one client before the session they
/// reference has been looked up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientKey {
    /// CSRF cookie value
    Xsrf(String),
    /// Client IP (X-Forwarded-For or direct connection)
    Ip(IpAddr),
    /// Nothing usable in the request
    Unknown,
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientKey::Xsrf(token) => write!(f, "xsrf:{token}"),
            ClientKey::Ip(ip) => write!(f, "ip:{ip}"),
            ClientKey::Unknown => f.write_str("unknown"),
        }
    }
}

/// Extract client IP address from headers
///
/// Checks X-Forwarded-For header first (for reverse proxy setups),
/// then falls back to direct connection IP.
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|xff| xff.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
        .or(direct_ip)
}

/// Resolve the lock key for a request: CSRF cookie if present, else client IP
pub fn resolve_client_key(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> ClientKey {
    if let Some(token) = extract_cookie_ignore_case(headers, XSRF_COOKIE_NAME) {
        if !token.is_empty() {
            return ClientKey::Xsrf(token);
        }
    }
    match extract_client_ip(headers, direct_ip) {
        Some(ip) => ClientKey::Ip(ip),
        None => ClientKey::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, header};

    #[test]
    fn test_extract_client_ip_xff() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("192.168.1.1, 10.0.0.1"),
        );

        let ip = extract_client_ip(&headers, None);
        assert_eq!(ip, Some("192.168.1.1".parse().unwrap()));
    }

    #[test]
    fn test_extract_client_ip_bad_xff_falls_back() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        let direct: IpAddr = "127.0.0.1".parse().unwrap();

        assert_eq!(extract_client_ip(&headers, Some(direct)), Some(direct));
    }

    #[test]
    fn test_client_key_prefers_xsrf_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("X-XSRF-TOKEN=abc; lang=en"),
        );
        let direct: IpAddr = "10.1.2.3".parse().unwrap();

        let key = resolve_client_key(&headers, Some(direct));
        assert_eq!(key, ClientKey::Xsrf("abc".to_string()));
        assert_eq!(key.to_string(), "xsrf:abc");
    }

    #[test]
    fn test_client_key_empty_cookie_uses_ip() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("x-xsrf-token="));
        let direct: IpAddr = "10.1.2.3".parse().unwrap();

        assert_eq!(
            resolve_client_key(&headers, Some(direct)),
            ClientKey::Ip(direct)
        );
        assert_eq!(resolve_client_key(&HeaderMap::new(), None), ClientKey::Unknown);
    }
}
