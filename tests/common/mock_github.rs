//! A stand-in for the GitHub oAuth token and user endpoints
//!
//! Answers are keyed on the code or token the client sends, and every request
//! is recorded for inspection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

/// Code that exchanges for `{"access_token": "xyz"}`
pub const GOOD_CODE: &str = "abc123";
/// Code GitHub reports as incorrect or expired
pub const EXPIRED_CODE: &str = "expired";
/// Code answered with a non-JSON 200 body
pub const BROKEN_CODE: &str = "broken";
/// Code answered with a 503 HTML page
pub const UNAVAILABLE_CODE: &str = "unavailable";

/// Token with a profile
pub const GOOD_TOKEN: &str = "good-token";
/// Token whose profile is served after a two second delay
pub const SLOW_TOKEN: &str = "slow-token";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: &'static str,
    pub accept: Option<String>,
    pub content_type: Option<String>,
    pub form: HashMap<String, String>,
    pub query: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct MockGithub {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockGithub {
    pub fn router(&self) -> Router {
        Router::new()
            .route("/login/oauth/access_token", post(access_token))
            .route("/user", get(user))
            .route("/missing", get(missing))
            .with_state(self.clone())
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, request: RecordedRequest) {
        self.requests.lock().unwrap().push(request);
    }
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned)
}

async fn access_token(
    State(mock): State<MockGithub>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let form: HashMap<String, String> = url::form_urlencoded::parse(&body).into_owned().collect();
    let code = form.get("code").cloned().unwrap_or_default();

    mock.record(RecordedRequest {
        method: "POST",
        path: "/login/oauth/access_token",
        accept: header_value(&headers, header::ACCEPT),
        content_type: header_value(&headers, header::CONTENT_TYPE),
        form,
        query: HashMap::new(),
    });

    match code.as_str() {
        GOOD_CODE => Json(json!({ "access_token": "xyz" })).into_response(),
        EXPIRED_CODE => Json(json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired.",
        }))
        .into_response(),
        BROKEN_CODE => "access_token=xyz&token_type=bearer".into_response(),
        UNAVAILABLE_CODE => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/html")],
            "<html><body>Unicorn!</body></html>",
        )
            .into_response(),
        other => Json(json!({
            "access_token": format!("token-for-{other}"),
            "token_type": "bearer",
            "scope": "read:user",
        }))
        .into_response(),
    }
}

fn profile() -> serde_json::Value {
    json!({
        "id": 583231,
        "login": "octocat",
        "email": "octocat@github.com",
        "name": "The Octocat",
        "html_url": "https://github.com/octocat",
    })
}

async fn user(
    State(mock): State<MockGithub>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let token = query.get("access_token").cloned().unwrap_or_default();

    mock.record(RecordedRequest {
        method: "GET",
        path: "/user",
        accept: header_value(&headers, header::ACCEPT),
        content_type: header_value(&headers, header::CONTENT_TYPE),
        form: HashMap::new(),
        query,
    });

    match token.as_str() {
        GOOD_TOKEN => Json(profile()).into_response(),
        SLOW_TOKEN => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(profile()).into_response()
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "message": "Bad credentials",
                "documentation_url": "https://docs.github.com/rest",
            })),
        )
            .into_response(),
    }
}

async fn missing() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Not Found" })),
    )
        .into_response()
}
