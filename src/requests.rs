//! Async HTTP requests with a uniform failure type
//!
//! Every call performs exactly one outbound request. Failures of any kind
//! (non-2xx status, connection error, timeout) surface as [`ResponseError`];
//! nothing is retried or cached.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{HeaderMap, StatusCode};
use lazy_static::lazy_static;
use serde::de::DeserializeOwned;

use crate::metrics::{OUTBOUND_REQUEST_DURATION_SECONDS, OUTBOUND_REQUESTS_TOTAL};

/// Status code used when no HTTP response was received (timeout, refused connection).
pub const NO_RESPONSE: u16 = 599;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// =============================================================================
// Query strings
// =============================================================================

/// Build `key=value&key=value` from the given pairs.
///
/// Values are quoted the way HTML forms quote them: ASCII alphanumerics and
/// `_.-~` pass through, a space becomes `+`, and every other byte becomes
/// `%XX` unless its character appears in `safe`. Keys are emitted verbatim.
pub fn make_query_string<'a, I>(params: I, safe: &str) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    params
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, quote_plus(value, safe)))
        .collect::<Vec<_>>()
        .join("&")
}

fn quote_plus(value: &str, safe: &str) -> String {
    let mut quoted = String::with_capacity(value.len());
    let mut buf = [0u8; 4];

    for ch in value.chars() {
        if ch == ' ' {
            quoted.push('+');
        } else if safe.contains(ch) {
            quoted.push(ch);
        } else {
            quoted.push_str(&urlencoding::encode(ch.encode_utf8(&mut buf)));
        }
    }

    quoted
}

/// Request parameters
///
/// A key-ordered mapping that renders itself as a query string, a form body
/// or a JSON object. Inserting an existing key replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pair, returning the previous value for `key` if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) -> Option<String> {
        self.0.insert(key.into(), value.to_string())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Query string representation.
    ///
    /// With `question_prefix`, a non-empty result is prefixed with `?`.
    /// Empty params always yield an empty string.
    pub fn to_query_string(&self, question_prefix: bool) -> String {
        let qs = make_query_string(self.iter(), "");
        if question_prefix && !qs.is_empty() {
            format!("?{qs}")
        } else {
            qs
        }
    }

    /// JSON object representation.
    pub fn to_json(&self) -> String {
        let object: serde_json::Map<String, serde_json::Value> = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::Value::Object(object).to_string()
    }

    /// `application/x-www-form-urlencoded` body, keys and values both encoded.
    pub fn to_form_body(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string(false))
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: ToString,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.to_string()))
                .collect(),
        )
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Params
where
    K: Into<String>,
    V: ToString,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

// =============================================================================
// Responses and errors
// =============================================================================

/// A fully read HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    async fn read(response: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    /// Body as text, replacing invalid UTF-8 sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

/// Error returned for an unsuccessful HTTP request
///
/// `code` is the HTTP status, or [`NO_RESPONSE`] (599) when no response was
/// received at all. `response` carries the failed response when there was one.
#[derive(Debug, Clone)]
pub struct ResponseError {
    pub code: u16,
    pub message: Option<String>,
    pub response: Option<HttpResponse>,
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => f.write_str(message),
            None => write!(f, "HTTP {}", self.code),
        }
    }
}

impl std::error::Error for ResponseError {}

impl ResponseError {
    pub fn new(code: u16, message: Option<String>, response: Option<HttpResponse>) -> Self {
        Self {
            code,
            message,
            response,
        }
    }

    /// True when no response was received.
    pub fn is_no_response(&self) -> bool {
        self.code == NO_RESPONSE
    }

    fn from_status(response: HttpResponse) -> Self {
        let code = response.status.as_u16();
        let reason = response.status.canonical_reason().unwrap_or("Unknown");
        Self::new(code, Some(format!("HTTP {code}: {reason}")), Some(response))
    }

    fn from_transport(error: reqwest::Error) -> Self {
        let message = if error.is_timeout() {
            "Timeout".to_string()
        } else if error.is_connect() {
            format!("Connection failed: {error}")
        } else {
            error.to_string()
        };
        Self::new(NO_RESPONSE, Some(message), None)
    }
}

// =============================================================================
// Client
// =============================================================================

/// Async HTTP client
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    /// Build a client with a request timeout and user agent.
    pub fn with_settings(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let inner = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { inner })
    }

    /// Build a client with only a request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let inner = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { inner })
    }

    pub fn from_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// Issue a GET to `base_url` with `params` appended as a query string.
    pub async fn get(
        &self,
        base_url: &str,
        headers: HeaderMap,
        params: Params,
    ) -> Result<HttpResponse, ResponseError> {
        let url = format!("{}{}", base_url, params.to_query_string(true));
        tracing::debug!(url = %base_url, params = params.len(), "GET");

        let request = self.inner.get(url).headers(headers);
        self.send("GET", request).await
    }

    /// Issue a POST to `url` with `data` as a form-encoded body.
    pub async fn post(
        &self,
        url: &str,
        mut headers: HeaderMap,
        data: Params,
    ) -> Result<HttpResponse, ResponseError> {
        tracing::debug!(url = %url, fields = data.len(), "POST");

        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        }
        let request = self.inner.post(url).headers(headers).body(data.to_form_body());
        self.send("POST", request).await
    }

    async fn send(
        &self,
        method: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<HttpResponse, ResponseError> {
        let timer = OUTBOUND_REQUEST_DURATION_SECONDS
            .with_label_values(&[method])
            .start_timer();

        let result = match request.send().await {
            Ok(response) => HttpResponse::read(response)
                .await
                .map_err(ResponseError::from_transport),
            Err(error) => Err(ResponseError::from_transport(error)),
        };
        timer.observe_duration();

        let result = result.and_then(|response| {
            if response.status.is_success() {
                Ok(response)
            } else {
                Err(ResponseError::from_status(response))
            }
        });

        let status = match &result {
            Ok(response) => response.status.as_u16(),
            Err(error) => error.code,
        };
        OUTBOUND_REQUESTS_TOTAL
            .with_label_values(&[method, &status.to_string()])
            .inc();

        if let Err(error) = &result {
            tracing::warn!(method, code = error.code, error = %error, "HTTP request failed");
        }

        result
    }
}

lazy_static! {
    static ref DEFAULT_CLIENT: HttpClient = HttpClient::default();
}

/// GET through the shared default client.
pub async fn get(
    base_url: &str,
    headers: HeaderMap,
    params: Params,
) -> Result<HttpResponse, ResponseError> {
    DEFAULT_CLIENT.get(base_url, headers, params).await
}

/// POST through the shared default client.
pub async fn post(
    url: &str,
    headers: HeaderMap,
    data: Params,
) -> Result<HttpResponse, ResponseError> {
    DEFAULT_CLIENT.post(url, headers, data).await
}
