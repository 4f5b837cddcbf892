use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use bogbon_core::AppConfig;
use uuid::Uuid;

/// Longest cookie value accepted as a session id. Longer values are replaced.
const MAX_SESSION_ID_LEN: usize = 128;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Opaque per-browser identifier correlating carts and orders, stored as a
/// request extension by [`session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

/// Session cookie settings used by [`session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    cookie_name: Arc<str>,
    max_age_secs: u64,
    secure: bool,
}

impl SessionConfig {
    #[must_use]
    pub fn new(cookie_name: &str, max_age_secs: u64, secure: bool) -> Self {
        Self {
            cookie_name: Arc::from(cookie_name),
            max_age_secs,
            secure,
        }
    }

    /// Cookie attributes follow the environment: `Secure` is only set in
    /// production.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(
            &config.session_cookie_name,
            config.session_max_age_secs,
            config.is_production(),
        )
    }

    fn set_cookie_value(&self, session_id: &str) -> String {
        let mut value = format!(
            "{}={session_id}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.cookie_name, self.max_age_secs
        );
        if self.secure {
            value.push_str("; Secure");
        }
        value
    }
}

/// Middleware that ensures every request has a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware resolving the caller's [`SessionId`] from the session cookie.
///
/// A missing, empty, or malformed cookie mints a fresh `UUIDv4` and appends a
/// `Set-Cookie` header to the response. Concurrent first requests from one
/// client each mint their own id.
pub async fn session(
    State(config): State<SessionConfig>,
    mut req: Request,
    next: Next,
) -> Response {
    let existing = read_cookie(req.headers(), &config.cookie_name);
    let minted = existing.is_none();
    let id = existing.unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(SessionId(id.clone()));

    let mut res = next.run(req).await;

    if minted {
        match HeaderValue::from_str(&config.set_cookie_value(&id)) {
            Ok(val) => {
                res.headers_mut().append(SET_COOKIE, val);
                tracing::debug!(session_id = %id, "minted session");
            }
            Err(e) => tracing::warn!(error = %e, "session cookie is not a valid header value"),
        }
    }

    res
}

/// Returns the value of cookie `name`, if present and usable as a session id.
fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .find(|value| is_valid_session_id(value))
        .map(String::from)
}

fn is_valid_session_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_SESSION_ID_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_cookie(cookie: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static(cookie));
        headers
    }

    #[test]
    fn read_cookie_finds_named_value_among_others() {
        let headers = headers_with_cookie("theme=dark; session_id=abc-123; lang=uz");
        assert_eq!(
            read_cookie(&headers, "session_id").as_deref(),
            Some("abc-123")
        );
    }

    #[test]
    fn read_cookie_ignores_empty_and_malformed_values() {
        assert_eq!(
            read_cookie(&headers_with_cookie("session_id="), "session_id"),
            None
        );
        assert_eq!(
            read_cookie(&headers_with_cookie("session_id=a b\"c"), "session_id"),
            None
        );
        assert_eq!(read_cookie(&HeaderMap::new(), "session_id"), None);
    }

    #[test]
    fn read_cookie_does_not_match_name_prefixes() {
        let headers = headers_with_cookie("session_id_old=stale");
        assert_eq!(read_cookie(&headers, "session_id"), None);
    }

    #[test]
    fn set_cookie_value_carries_expected_attributes() {
        let dev = SessionConfig::new("session_id", 604_800, false);
        assert_eq!(
            dev.set_cookie_value("abc"),
            "session_id=abc; Path=/; Max-Age=604800; HttpOnly; SameSite=Lax"
        );

        let prod = SessionConfig::new("sid", 60, true);
        assert!(prod.set_cookie_value("abc").ends_with("; Secure"));
    }
}
