//! GitHub v3 API client
//!
//! Three operations back the oAuth bridge: building the authorization URL,
//! exchanging an authorization code for a token, and fetching the profile
//! behind a token. Transport failures from [`crate::requests`] are translated
//! into a GitHub [`ResponseError`] that carries GitHub's JSON error body.

use std::sync::Arc;

use http::HeaderMap;
use http::header::{ACCEPT, HeaderValue};
use rand::RngCore;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::metrics::GITHUB_ERRORS_TOTAL;
use crate::requests::{self, HttpClient, HttpResponse, Params};

/// A decoded JSON object as returned by the GitHub API.
pub type JsonObject = serde_json::Map<String, Value>;

/// Number of random bytes in an oAuth state token (hex encoded to 48 chars).
pub const STATE_BYTES: usize = 24;

pub const DEFAULT_AUTH_URL: &str = "https://github.com/login/oauth/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
pub const DEFAULT_PROFILE_URL: &str = "https://api.github.com/user";

// =============================================================================
// Configuration
// =============================================================================

/// Invalid GitHub client configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GithubConfigError {
    #[error("github.{0} must not be empty")]
    Empty(&'static str),

    #[error("github.{field} is not a valid http(s) URL: {value}")]
    InvalidUrl { field: &'static str, value: String },
}

/// GitHub application credentials and endpoints
///
/// Validated at construction and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubConfig {
    auth_client_id: String,
    token_client_id: String,
    token_client_secret: String,
    auth_url: String,
    token_url: String,
    profile_url: String,
}

impl GithubConfig {
    /// Start a configuration from the oAuth application credentials.
    ///
    /// The authorize step uses the same client id and all endpoints point at
    /// github.com unless overridden on the builder.
    pub fn builder(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> GithubConfigBuilder {
        let client_id = client_id.into();
        GithubConfigBuilder {
            auth_client_id: client_id.clone(),
            token_client_id: client_id,
            token_client_secret: client_secret.into(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            profile_url: DEFAULT_PROFILE_URL.to_string(),
        }
    }

    pub fn auth_client_id(&self) -> &str {
        &self.auth_client_id
    }

    pub fn token_client_id(&self) -> &str {
        &self.token_client_id
    }

    pub fn token_client_secret(&self) -> &str {
        &self.token_client_secret
    }

    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub fn profile_url(&self) -> &str {
        &self.profile_url
    }
}

/// Builder for [`GithubConfig`]
#[derive(Debug, Clone)]
pub struct GithubConfigBuilder {
    auth_client_id: String,
    token_client_id: String,
    token_client_secret: String,
    auth_url: String,
    token_url: String,
    profile_url: String,
}

impl GithubConfigBuilder {
    pub fn auth_client_id(mut self, value: impl Into<String>) -> Self {
        self.auth_client_id = value.into();
        self
    }

    pub fn auth_url(mut self, value: impl Into<String>) -> Self {
        self.auth_url = value.into();
        self
    }

    pub fn token_url(mut self, value: impl Into<String>) -> Self {
        self.token_url = value.into();
        self
    }

    pub fn profile_url(mut self, value: impl Into<String>) -> Self {
        self.profile_url = value.into();
        self
    }

    pub fn build(self) -> Result<GithubConfig, GithubConfigError> {
        non_empty("auth.client_id", &self.auth_client_id)?;
        non_empty("client_id", &self.token_client_id)?;
        non_empty("client_secret", &self.token_client_secret)?;
        http_url("urls.auth", &self.auth_url)?;
        http_url("urls.token", &self.token_url)?;
        http_url("urls.profile", &self.profile_url)?;

        Ok(GithubConfig {
            auth_client_id: self.auth_client_id,
            token_client_id: self.token_client_id,
            token_client_secret: self.token_client_secret,
            auth_url: self.auth_url,
            token_url: self.token_url,
            profile_url: self.profile_url,
        })
    }
}

fn non_empty(field: &'static str, value: &str) -> Result<(), GithubConfigError> {
    if value.trim().is_empty() {
        return Err(GithubConfigError::Empty(field));
    }
    Ok(())
}

fn http_url(field: &'static str, value: &str) -> Result<(), GithubConfigError> {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        _ => Err(GithubConfigError::InvalidUrl {
            field,
            value: value.to_string(),
        }),
    }
}

impl TryFrom<&crate::config::GitHubConfig> for GithubConfig {
    type Error = GithubConfigError;

    fn try_from(settings: &crate::config::GitHubConfig) -> Result<Self, Self::Error> {
        GithubConfig::builder(&settings.client_id, &settings.client_secret)
            .auth_client_id(settings.auth_client_id())
            .auth_url(&settings.urls.auth)
            .token_url(&settings.urls.token)
            .profile_url(&settings.urls.profile)
            .build()
    }
}

// =============================================================================
// Scopes
// =============================================================================

/// Requested oAuth scopes: one scope string, or an ordered list of scopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scopes {
    Single(String),
    Many(Vec<String>),
}

impl Scopes {
    /// The `scope` query parameter: list entries joined with `,`.
    pub fn joined(&self) -> String {
        match self {
            Scopes::Single(scope) => scope.clone(),
            Scopes::Many(scopes) => scopes.join(","),
        }
    }
}

impl From<&str> for Scopes {
    fn from(scope: &str) -> Self {
        Scopes::Single(scope.to_string())
    }
}

impl From<String> for Scopes {
    fn from(scope: String) -> Self {
        Scopes::Single(scope)
    }
}

impl From<Vec<String>> for Scopes {
    fn from(scopes: Vec<String>) -> Self {
        Scopes::Many(scopes)
    }
}

impl From<Vec<&str>> for Scopes {
    fn from(scopes: Vec<&str>) -> Self {
        Scopes::Many(scopes.into_iter().map(ToOwned::to_owned).collect())
    }
}

impl From<&[&str]> for Scopes {
    fn from(scopes: &[&str]) -> Self {
        Scopes::Many(scopes.iter().map(|s| (*s).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Scopes {
    fn from(scopes: [&str; N]) -> Self {
        Scopes::Many(scopes.iter().map(|s| (*s).to_owned()).collect())
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Error returned for an unsuccessful GitHub API call
///
/// `message` is GitHub's own `message` when the failed response carried a
/// JSON object with one, and the transport message otherwise.
/// `error_body` is only present in the first case.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ResponseError {
    pub code: u16,
    pub message: String,
    pub transport_message: Option<String>,
    pub response: Option<HttpResponse>,
    pub error_body: Option<JsonObject>,
}

impl ResponseError {
    /// True when GitHub never answered (timeout, refused connection).
    pub fn is_no_response(&self) -> bool {
        self.code == requests::NO_RESPONSE
    }

    /// A successful response whose body is not a JSON object.
    fn malformed(response: HttpResponse, cause: &str) -> Self {
        let code = response.status.as_u16();
        Self {
            code,
            message: format!("malformed JSON response from GitHub: {cause}"),
            transport_message: None,
            response: Some(response),
            error_body: None,
        }
    }
}

impl From<requests::ResponseError> for ResponseError {
    fn from(error: requests::ResponseError) -> Self {
        let requests::ResponseError {
            code,
            message: transport_message,
            response,
        } = error;

        let error_body = response
            .as_ref()
            .and_then(|response| parse_error_body(&response.body));

        let message = error_body
            .as_ref()
            .and_then(|body| body.get("message"))
            .map(message_text)
            .or_else(|| transport_message.clone())
            .unwrap_or_else(|| format!("HTTP {code}"));

        Self {
            code,
            message,
            transport_message,
            response,
            error_body,
        }
    }
}

fn parse_error_body(body: &[u8]) -> Option<JsonObject> {
    let text = std::str::from_utf8(body).ok()?;
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(object) if object.contains_key("message") => Some(object),
        _ => None,
    }
}

fn message_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

// =============================================================================
// Profile
// =============================================================================

/// Typed view over the fields of a GitHub user profile the bridge cares about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl TryFrom<&JsonObject> for Profile {
    type Error = serde_json::Error;

    fn try_from(object: &JsonObject) -> Result<Self, Self::Error> {
        Profile::deserialize(Value::Object(object.clone()))
    }
}

// =============================================================================
// Client
// =============================================================================

/// Async GitHub API client
///
/// Cheap to clone; clones share the configuration and connection pool.
#[derive(Debug, Clone)]
pub struct Github {
    config: Arc<GithubConfig>,
    http: HttpClient,
}

impl Github {
    pub fn new(config: GithubConfig) -> Self {
        Self::with_http_client(config, HttpClient::default())
    }

    pub fn with_http_client(config: GithubConfig, http: HttpClient) -> Self {
        Self {
            config: Arc::new(config),
            http,
        }
    }

    pub fn config(&self) -> &GithubConfig {
        &self.config
    }

    /// Build the oAuth authorization URL for signing in with GitHub.
    ///
    /// Every call draws a fresh random `state`. No request is made; the
    /// method is async only so all client operations share one shape.
    /// A `callback_uri` is forwarded as `redirect_uri` when given.
    pub async fn get_auth_url(
        &self,
        scopes: impl Into<Scopes>,
        callback_uri: Option<&str>,
    ) -> Result<String, ResponseError> {
        let mut query = Params::from([
            ("client_id", self.config.auth_client_id()),
            ("scope", scopes.into().joined().as_str()),
            ("state", generate_state().as_str()),
        ]);
        if let Some(callback_uri) = callback_uri {
            query.insert("redirect_uri", callback_uri);
        }

        Ok(format!(
            "{}{}",
            self.config.auth_url(),
            query.to_query_string(true)
        ))
    }

    /// Exchange an oAuth code for an access token.
    ///
    /// Returns GitHub's JSON answer, normally carrying `access_token`.
    pub async fn get_access_token(
        &self,
        code: &str,
        state: &str,
    ) -> Result<JsonObject, ResponseError> {
        let data = Params::from([
            ("client_id", self.config.token_client_id()),
            ("client_secret", self.config.token_client_secret()),
            ("code", code),
            ("state", state),
        ]);

        let response = self
            .http
            .post(self.config.token_url(), json_headers(), data)
            .await;
        decode("get_access_token", response)
    }

    /// Fetch the user profile associated with an oAuth token.
    pub async fn get_user_profile(&self, token: &str) -> Result<JsonObject, ResponseError> {
        let query = Params::from([("access_token", token)]);

        let response = self
            .http
            .get(self.config.profile_url(), json_headers(), query)
            .await;
        decode("get_user_profile", response)
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// Translate the outcome of a GitHub call: transport errors become GitHub
/// errors, successful bodies are decoded as a JSON object.
fn decode(
    operation: &'static str,
    result: Result<HttpResponse, requests::ResponseError>,
) -> Result<JsonObject, ResponseError> {
    let decoded = match result {
        Ok(response) => match response.json::<Value>() {
            Ok(Value::Object(object)) => Ok(object),
            Ok(other) => Err(ResponseError::malformed(
                response,
                &format!("expected an object, got {}", json_kind(&other)),
            )),
            Err(error) => Err(ResponseError::malformed(response, &error.to_string())),
        },
        Err(error) => Err(ResponseError::from(error)),
    };

    decoded.inspect_err(|error| {
        GITHUB_ERRORS_TOTAL
            .with_label_values(&[operation, &error.code.to_string()])
            .inc();
        tracing::warn!(operation, code = error.code, error = %error, "GitHub API call failed");
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Fresh random oAuth state token, hex encoded.
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Extract the `state` parameter from an authorization URL.
pub fn state_from_auth_url(auth_url: &str) -> Option<String> {
    let parsed = url::Url::parse(auth_url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
}
