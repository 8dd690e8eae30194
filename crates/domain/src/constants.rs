//! Application constants
//!
//! Centralized location for the identity-provider and session constants used
//! throughout the application.

// Token lifetimes
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 3600;
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 30 * 24 * 3600;

// Refresh scheduling: renew this long before expiry, never sooner than the floor
pub const REFRESH_LEAD_SECS: i64 = 300;
pub const MIN_REFRESH_DELAY_SECS: i64 = 60;

// Parent identity provider endpoints (relative to the parent app URL)
pub const CONSENT_PATH: &str = "/auth/child-app/consent";
pub const TOKEN_PATH: &str = "/api/auth/child-app/token";
pub const LOGOUT_PATH: &str = "/api/auth/child-app/logout";

pub const API_KEY_HEADER: &str = "X-API-Key";
pub const SESSION_ID_HEADER: &str = "X-Session-Id";

pub const DEFAULT_SCOPES: &[&str] = &["read", "write", "profile"];
pub const DEFAULT_SIGN_IN_PATH: &str = "/login";
