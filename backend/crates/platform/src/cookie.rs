//! Cookie lookup helpers

use axum::http::{HeaderMap, header};

/// Extract a cookie value from headers (exact name match)
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    find_cookie(headers, |key| key == name)
}

/// Extract a cookie value, matching the name case-insensitively
///
/// Frameworks disagree on the casing of CSRF cookies (`XSRF-TOKEN` vs
/// `x-xsrf-token`), so lookups for those go through this variant.
pub fn extract_cookie_ignore_case(headers: &HeaderMap, name: &str) -> Option<String> {
    find_cookie(headers, |key| key.eq_ignore_ascii_case(name))
}

fn find_cookie(headers: &HeaderMap, matches: impl Fn(&str) -> bool) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            matches(key.trim()).then(|| value.trim().to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; session=abc123; other=xyz"),
        );

        assert_eq!(
            extract_cookie(&headers, "session"),
            Some("abc123".to_string())
        );
        assert_eq!(extract_cookie(&headers, "Session"), None);
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_extract_cookie_ignore_case() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::COOKIE, HeaderValue::from_static("XSRF-TOKEN=t0k"));

        assert_eq!(
            extract_cookie_ignore_case(&headers, "xsrf-token"),
            Some("t0k".to_string())
        );
    }
}
