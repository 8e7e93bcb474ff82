//! Common test utilities for integration tests

pub mod httpbin;
pub mod mock_github;

use std::net::SocketAddr;

use axum::Router;
use sentinel::{AppState, config};
use tokio::net::TcpListener;

pub use mock_github::MockGithub;

pub const TEST_STATE_SECRET: &str = "test-state-secret-32-bytes-long!!";
pub const TEST_AUTH_URL: &str = "https://github.com/login/oauth/authorize";

/// Serve `app` on a random local port and return its base URL.
pub async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    format!("http://{}", addr)
}

/// A base URL nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Configuration pointing the GitHub token and profile endpoints at `github_base`.
pub fn test_config(github_base: &str) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            mount_point: "/".to_string(),
        },
        github: config::GitHubConfig {
            auth: config::GitHubAuthConfig {
                client_id: Some("test-auth-client-id".to_string()),
            },
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            urls: config::GitHubUrls {
                auth: TEST_AUTH_URL.to_string(),
                token: format!("{github_base}/login/oauth/access_token"),
                profile: format!("{github_base}/user"),
            },
        },
        auth: config::AuthConfig {
            state_secret: TEST_STATE_SECRET.to_string(),
            state_max_age: 600,
            default_scope: "read:user".to_string(),
        },
        http: config::HttpConfig {
            timeout_seconds: 10,
            user_agent: "sentinel-tests".to_string(),
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// Test server instance: the bridge in front of a mock GitHub
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub client: reqwest::Client,
    pub github: MockGithub,
}

impl TestServer {
    /// Create a new test server with the auth routes at the root
    pub async fn new() -> Self {
        Self::with_mount_point("/").await
    }

    pub async fn with_mount_point(mount_point: &str) -> Self {
        let github = MockGithub::default();
        let github_addr = spawn(github.router()).await;

        let mut config = test_config(&github_addr);
        config.server.mount_point = mount_point.to_string();

        let state = AppState::new(config).unwrap();
        let addr = spawn(sentinel::build_router(state.clone())).await;

        // Redirects are asserted on, never followed
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        Self {
            addr,
            state,
            client,
            github,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }
}

/// `name=value` of the first `Set-Cookie` header for `name`.
pub fn set_cookie(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .map(|v| v.split(';').next().unwrap_or(v).to_string())
}

/// Value of query parameter `key` in `url`.
pub fn query_param(url: &str, key: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
