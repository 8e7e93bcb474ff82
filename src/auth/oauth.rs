//! GitHub oAuth bridge endpoints
//!
//! Mediates the authorization code flow between a client and GitHub.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::Deserialize;

use super::state::{PendingState, STATE_COOKIE, sign_state, verify_state};
use super::token::{ACCESS_TOKEN_COOKIE, AccessToken};
use crate::AppState;
use crate::error::AppError;
use crate::github::{self, JsonObject, Profile, Scopes};

/// Create authentication router
///
/// Routes:
/// - GET /auth/url - Redirect to GitHub
/// - GET /auth/token - Exchange the callback code for a token
/// - GET /auth/profile - Profile for the presented token
/// - POST /auth/logout - Forget the pending login
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/url", get(auth_url))
        .route("/auth/token", get(get_token))
        .route("/auth/profile", get(get_profile))
        .route("/auth/logout", post(logout))
}

/// Mount the authentication routes on `router` under `mount_point`.
///
/// `"/"` (or an empty mount point) places the routes at the root.
pub fn mount(router: Router<AppState>, mount_point: &str) -> Router<AppState> {
    let mount_point = mount_point.trim_end_matches('/');
    if mount_point.is_empty() {
        return router.merge(auth_router());
    }

    if mount_point.starts_with('/') {
        router.nest(mount_point, auth_router())
    } else {
        router.nest(&format!("/{mount_point}"), auth_router())
    }
}

// =============================================================================
// Authorization URL
// =============================================================================

#[derive(Debug, Deserialize)]
struct AuthUrlQuery {
    /// Comma separated scopes; the configured default when absent
    scope: Option<String>,
    /// Where GitHub should send the browser back to
    callback: Option<String>,
}

/// GET /auth/url
///
/// # Steps
/// 1. Build the GitHub authorization URL with a fresh state
/// 2. Store the signed state in a cookie
/// 3. Redirect to GitHub
async fn auth_url(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<AuthUrlQuery>,
) -> Result<impl IntoResponse, AppError> {
    let scopes = match query.scope {
        Some(scope) if !scope.trim().is_empty() => Scopes::from(scope),
        _ => Scopes::from(state.config.auth.default_scope.as_str()),
    };

    let url = state
        .github
        .get_auth_url(scopes, query.callback.as_deref())
        .await?;
    let csrf_state = github::state_from_auth_url(&url).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "authorization URL is missing its state parameter"
        ))
    })?;

    let pending = PendingState::new(csrf_state, state.config.auth.state_max_age);
    let signed = sign_state(&pending, &state.config.auth.state_secret)?;
    let cookie = Cookie::build((STATE_COOKIE, signed))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    tracing::debug!("Redirecting to GitHub authorization");
    Ok((jar.add(cookie), Redirect::to(&url)))
}

// =============================================================================
// Token exchange
// =============================================================================

/// Query parameters from GitHub callback
#[derive(Debug, Deserialize)]
struct TokenQuery {
    /// Authorization code
    code: String,
    /// CSRF state token
    state: String,
}

/// GET /auth/token
///
/// # Steps
/// 1. Verify the state against the signed cookie
/// 2. Exchange code for access token
/// 3. Clear the state cookie and hand GitHub's answer back
async fn get_token(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, AppError> {
    let cookie = jar.get(STATE_COOKIE).ok_or(AppError::Unauthorized)?;
    let pending = verify_state(cookie.value(), &state.config.auth.state_secret)?;
    if pending.state != query.state {
        tracing::warn!("oAuth state mismatch");
        return Err(AppError::Unauthorized);
    }

    let token = state
        .github
        .get_access_token(&query.code, &query.state)
        .await?;

    // GitHub answers 200 with an `error` field for bad or expired codes.
    if let Some(error) = token.get("error") {
        let description = token
            .get("error_description")
            .and_then(|d| d.as_str())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| error.to_string());
        return Err(AppError::Validation(description));
    }

    tracing::info!("oAuth code exchanged for access token");
    Ok((jar.remove(removal(STATE_COOKIE)), Json(token)))
}

// =============================================================================
// Profile
// =============================================================================

/// GET /auth/profile
///
/// Returns the GitHub profile behind the presented token.
async fn get_profile(
    State(state): State<AppState>,
    AccessToken(token): AccessToken,
) -> Result<Json<JsonObject>, AppError> {
    let profile = state.github.get_user_profile(&token).await?;

    match Profile::try_from(&profile) {
        Ok(view) => tracing::info!(login = %view.login, id = view.id, "Fetched GitHub profile"),
        Err(error) => tracing::debug!(%error, "GitHub profile has unexpected shape"),
    }

    Ok(Json(profile))
}

// =============================================================================
// Logout
// =============================================================================

/// POST /auth/logout
///
/// Clears the state and token cookies.
async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar
        .remove(removal(STATE_COOKIE))
        .remove(removal(ACCESS_TOKEN_COOKIE));
    (jar, StatusCode::NO_CONTENT)
}

fn removal(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}
