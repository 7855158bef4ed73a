//! Common API utilities and shared types
//!
//! Cookie helpers and request-body helpers used by several endpoints.

use axum::http::{header, HeaderMap, HeaderValue};
use serde::{Deserialize, Deserializer};

use crate::api::middleware::ApiError;

// ============================================================================
// Cookies
// ============================================================================

/// Read a cookie value from the `Cookie` request headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Build an HttpOnly, `SameSite=Lax` cookie scoped to `path`
pub fn build_cookie(name: &str, value: &str, path: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path={}; HttpOnly; SameSite=Lax; Max-Age={}",
        name, value, path, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// A cookie that makes the browser forget `name`
pub fn expired_cookie(name: &str, path: &str) -> String {
    build_cookie(name, "", path, 0, false)
}

/// Append `Set-Cookie` headers for each cookie
pub fn set_cookie_headers(cookies: &[String]) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    for cookie in cookies {
        let value = HeaderValue::from_str(cookie)
            .map_err(|e| ApiError::internal_error(format!("Invalid cookie: {}", e)))?;
        headers.append(header::SET_COOKIE, value);
    }
    Ok(headers)
}

// ============================================================================
// Request bodies
// ============================================================================

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
///
/// Use together with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
