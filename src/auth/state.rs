//! Signed oAuth state cookie
//!
//! Binds the `state` of an authorization URL to the browser that asked for
//! it, so the callback can be checked without any server-side storage.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Name of the cookie holding the signed state.
pub const STATE_COOKIE: &str = "oauth_state";

/// Pending oAuth state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingState {
    /// The `state` parameter sent to GitHub
    pub state: String,
    /// When the pending login stops being accepted
    pub expires_at: DateTime<Utc>,
}

impl PendingState {
    /// An expiry past what chrono can represent saturates at the maximum
    /// instant.
    pub fn new(state: impl Into<String>, max_age_seconds: i64) -> Self {
        let now = Utc::now();
        let expires_at = Duration::try_seconds(max_age_seconds)
            .and_then(|max_age| now.checked_add_signed(max_age))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            state: state.into(),
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

fn keyed_mac(secret: &str) -> Result<HmacSha256, AppError> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| AppError::Signing(e.to_string()))
}

/// Sign a pending state.
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
pub fn sign_state(pending: &PendingState, secret: &str) -> Result<String, AppError> {
    let payload = serde_json::to_string(pending).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    let mut mac = keyed_mac(secret)?;
    mac.update(payload_b64.as_bytes());
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a signed state.
///
/// # Errors
/// `Unauthorized` if the token is malformed, forged or expired.
pub fn verify_state(token: &str, secret: &str) -> Result<PendingState, AppError> {
    let (payload_b64, signature_b64) = token.split_once('.').ok_or(AppError::Unauthorized)?;

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;
    let mut mac = keyed_mac(secret)?;
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AppError::Unauthorized)?;

    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Unauthorized)?;
    let pending: PendingState =
        serde_json::from_slice(&payload).map_err(|_| AppError::Unauthorized)?;

    if pending.is_expired() {
        return Err(AppError::Unauthorized);
    }

    Ok(pending)
}
