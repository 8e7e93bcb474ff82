//! GitHub oAuth bridge
//!
//! Handles:
//! - Authorization redirect with a signed state cookie
//! - Code to token exchange
//! - Profile lookup for a presented token
//! - Logout

mod oauth;
pub mod state;
mod token;

pub use oauth::{auth_router, mount};
pub use state::{PendingState, STATE_COOKIE, sign_state, verify_state};
pub use token::{ACCESS_TOKEN_COOKIE, AccessToken, extract_token_from_headers};
