//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/default.yaml, config/local.yaml; any format
//!    the `config` crate recognises by extension)
//! 3. Environment variables (override), e.g. `SENTINEL__GITHUB__CLIENT_ID`

use std::path::Path;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

use crate::error::AppError;
use crate::github::{
    DEFAULT_AUTH_URL, DEFAULT_PROFILE_URL, DEFAULT_TOKEN_URL, GithubConfig,
};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub github: GitHubConfig,
    pub auth: AuthConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Path the oAuth endpoints are mounted under (e.g., "/" or "/sentinel")
    pub mount_point: String,
}

/// GitHub oAuth application
///
/// Mirrors the YAML layout:
///
/// ```yaml
/// github:
///   auth:
///     client_id: <client id used for the authorize redirect>
///   client_id: <Github Application client id>
///   client_secret: <Github Application client secret>
///   urls:
///     auth: https://github.com/login/oauth/authorize
///     token: https://github.com/login/oauth/access_token
///     profile: https://api.github.com/user
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    #[serde(default)]
    pub auth: GitHubAuthConfig,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub urls: GitHubUrls,
}

impl GitHubConfig {
    /// Client id for the authorize step, falling back to `client_id`.
    pub fn auth_client_id(&self) -> &str {
        self.auth
            .client_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(&self.client_id)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubAuthConfig {
    pub client_id: Option<String>,
}

/// GitHub endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUrls {
    pub auth: String,
    pub token: String,
    pub profile: String,
}

impl Default for GitHubUrls {
    fn default() -> Self {
        Self {
            auth: DEFAULT_AUTH_URL.to_string(),
            token: DEFAULT_TOKEN_URL.to_string(),
            profile: DEFAULT_PROFILE_URL.to_string(),
        }
    }
}

/// oAuth bridge settings
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for the state cookie (32+ bytes)
    pub state_secret: String,
    /// State cookie lifetime in seconds (default: 600)
    pub state_max_age: i64,
    /// Scope requested when the client does not ask for one
    pub default_scope: String,
}

/// Outbound HTTP client settings
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds (default: 20)
    pub timeout_seconds: u64,
    pub user_agent: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.* (if exists)
    /// 3. config/local.* (if exists)
    /// 4. Environment variables (SENTINEL__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, AppError> {
        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));
        Self::finish(builder)
    }

    /// Load configuration from an explicit file, then the environment.
    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        let builder = Self::defaults()?.add_source(File::from(path).required(true));
        Self::finish(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.mount_point", "/")?
            .set_default("github.urls.auth", DEFAULT_AUTH_URL)?
            .set_default("github.urls.token", DEFAULT_TOKEN_URL)?
            .set_default("github.urls.profile", DEFAULT_PROFILE_URL)?
            .set_default("auth.state_max_age", 600)?
            .set_default("auth.default_scope", "read:user")?
            .set_default("http.timeout_seconds", 20)?
            .set_default("http.user_agent", concat!("sentinel/", env!("CARGO_PKG_VERSION")))?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self, AppError> {
        let config = builder
            // Load from environment variables (SENTINEL__*)
            .add_source(
                Environment::with_prefix("SENTINEL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Validated GitHub client configuration.
    pub fn github_client_config(&self) -> Result<GithubConfig, AppError> {
        Ok(GithubConfig::try_from(&self.github)?)
    }

    pub(crate) fn validate(&self) -> Result<(), AppError> {
        const MIN_STATE_SECRET_BYTES: usize = 32;
        const MAX_STATE_MAX_AGE_SECONDS: i64 = 24 * 60 * 60;

        if self.auth.state_secret.len() < MIN_STATE_SECRET_BYTES {
            return Err(AppError::Config(format!(
                "auth.state_secret must be at least {} bytes",
                MIN_STATE_SECRET_BYTES
            )));
        }

        if self.auth.state_max_age <= 0 {
            return Err(AppError::Config(
                "auth.state_max_age must be greater than 0".to_string(),
            ));
        }

        if self.auth.state_max_age > MAX_STATE_MAX_AGE_SECONDS {
            return Err(AppError::Config(format!(
                "auth.state_max_age must be at most {} seconds",
                MAX_STATE_MAX_AGE_SECONDS
            )));
        }

        if self.http.timeout_seconds == 0 {
            return Err(AppError::Config(
                "http.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(AppError::Config(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }

        if !self.server.mount_point.starts_with('/') {
            return Err(AppError::Config(
                "server.mount_point must start with '/'".to_string(),
            ));
        }

        self.github_client_config()?;
        Ok(())
    }
}
