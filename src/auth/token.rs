//! Access token extraction
//!
//! The bridge stores nothing: callers present the GitHub token they received
//! from the token endpoint on every profile request.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::CookieJar;

use crate::error::AppError;

/// Cookie a browser client may keep its GitHub token in.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Read a GitHub token from `Authorization: token <t>`, `Authorization:
/// Bearer <t>`, or the `access_token` cookie.
pub fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| {
            h.strip_prefix("token ")
                .or_else(|| h.strip_prefix("Bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToOwned::to_owned)
        .or_else(|| {
            let jar = CookieJar::from_headers(headers);
            jar.get(ACCESS_TOKEN_COOKIE)
                .map(|cookie| cookie.value().to_owned())
                .filter(|token| !token.is_empty())
        })
}

/// Extractor for the caller's GitHub access token
///
/// # Usage
/// ```ignore
/// async fn handler(AccessToken(token): AccessToken) -> impl IntoResponse {
///     format!("token has {} chars", token.len())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AccessToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AccessToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extract_token_from_headers(&parts.headers)
            .map(AccessToken)
            .ok_or(AppError::Unauthorized)
    }
}
