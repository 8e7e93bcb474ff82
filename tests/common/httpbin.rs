//! A small echo server modelled after httpbin.org
//!
//! Each endpoint answers with a JSON description of the request it received.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{ConnectInfo, OriginalUri, Path, Query},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    routing::{delete, get, patch, post, put},
};
use serde_json::{Value, json};

pub fn httpbin() -> Router {
    Router::new()
        .route("/get", get(echo_get))
        .route("/post", post(echo_body))
        .route("/put", put(echo_body))
        .route("/patch", patch(echo_body))
        .route("/delete", delete(echo_body))
        .route("/status/:code", get(status).post(status))
        .route("/delay/:millis", get(delay))
}

fn header_map(headers: &HeaderMap) -> Value {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), Value::from(v)))
        })
        .collect::<serde_json::Map<_, _>>()
        .into()
}

async fn echo_get(
    OriginalUri(uri): OriginalUri,
    ConnectInfo(origin): ConnectInfo<SocketAddr>,
    Query(args): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    Json(json!({
        "url": uri.to_string(),
        "args": args,
        "headers": header_map(&headers),
        "origin": origin.ip().to_string(),
    }))
}

async fn echo_body(
    OriginalUri(uri): OriginalUri,
    ConnectInfo(origin): ConnectInfo<SocketAddr>,
    Query(args): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let data: Value = if content_type.starts_with("application/x-www-form-urlencoded") {
        url::form_urlencoded::parse(&body)
            .into_owned()
            .map(|(k, v)| (k, Value::from(v)))
            .collect::<serde_json::Map<_, _>>()
            .into()
    } else {
        Value::from(String::from_utf8_lossy(&body).into_owned())
    };
    let json_body = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);

    Json(json!({
        "url": uri.to_string(),
        "args": args,
        "data": data,
        "json": json_body,
        "files": {},
        "headers": header_map(&headers),
        "origin": origin.ip().to_string(),
    }))
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn delay(Path(millis): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Json(json!({ "delayed_ms": millis }))
}
