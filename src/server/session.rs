use crate::identity::OwnerClaim;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use std::convert::Infallible;
use tracing::debug;

pub const COOKIE_SESSION_TOKEN_KEY: &str = "session_token";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";

fn extract_session_token_from_cookies(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(COOKIE_SESSION_TOKEN_KEY)
        .map(Cookie::value)
        .map(|s| s.to_string())
}

fn extract_session_token_from_headers(parts: &Parts) -> Option<String> {
    let raw = parts
        .headers
        .get(HEADER_SESSION_TOKEN_KEY)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())?;
    let raw = raw.trim();
    let token = match raw.strip_prefix("Bearer ") {
        Some(token) => token,
        None if raw == "Bearer" => "",
        None => raw,
    };
    Some(token.to_string())
}

/// Reads whatever credential the request carries. Validation happens in
/// the services on every call, so extraction never rejects.
impl<S: Send + Sync> FromRequestParts<S> for OwnerClaim {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_session_token_from_cookies(parts)
            .filter(|token| !token.trim().is_empty())
            .or_else(|| extract_session_token_from_headers(parts));
        match token {
            Some(token) => Ok(OwnerClaim::from(token.as_str())),
            None => {
                debug!("No token in cookies nor headers.");
                Ok(OwnerClaim::Anonymous)
            }
        }
    }
}
