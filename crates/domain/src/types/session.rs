//! Session and OAuth transaction state

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::user::UserClaims;

/// Which sign-in path issued a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOrigin {
    /// Authorization-code grant against the parent identity provider
    #[default]
    Parent,
    /// Direct credential sign-in against the embedded database
    Local,
}

/// An authenticated session issued by the parent identity provider (or by
/// the local-auth fallback)
///
/// At most one session exists per store; saving a new one replaces the old.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry of the access token (UTC)
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// User claims embedded in the token response
    pub user: UserClaims,
    #[serde(default)]
    pub origin: SessionOrigin,
}

impl Session {
    /// Create a session whose access token expires `expires_in` seconds from
    /// now
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in: i64,
        session_id: Option<String>,
        user: UserClaims,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: Utc::now() + Duration::seconds(expires_in),
            session_id,
            user,
            origin: SessionOrigin::Parent,
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: SessionOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Seconds until the access token expires (negative once expired)
    #[must_use]
    pub fn seconds_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }

    /// Whether the access token is expired or will expire within
    /// `threshold_seconds`
    #[must_use]
    pub fn is_expired(&self, threshold_seconds: i64) -> bool {
        Utc::now() + Duration::seconds(threshold_seconds) >= self.expires_at
    }

    /// Whether both tokens are present
    #[must_use]
    pub fn has_tokens(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

// Tokens never reach logs through Debug.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .field("session_id", &self.session_id)
            .field("user", &self.user.id)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Ephemeral state of one authorization round-trip
///
/// Lives only between the redirect to the consent page and the callback. It
/// is never persisted alongside the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTransaction {
    pub state: String,
    pub app_id: String,
    pub redirect_uri: String,
    pub created_at: DateTime<Utc>,
}

impl OAuthTransaction {
    #[must_use]
    pub fn new(
        state: impl Into<String>,
        app_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            state: state.into(),
            app_id: app_id.into(),
            redirect_uri: redirect_uri.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> UserClaims {
        UserClaims::new("u-1", "ada@example.com")
    }

    #[test]
    fn new_session_computes_expiry() {
        let session = Session::new("access", "refresh", 3600, None, claims());
        let secs = session.seconds_until_expiry();
        assert!(secs > 3590 && secs <= 3600);
        assert!(!session.is_expired(300));
        assert!(session.is_expired(7200));
        assert!(session.has_tokens());
    }

    #[test]
    fn debug_redacts_tokens() {
        let session =
            Session::new("secret-access", "secret-refresh", 60, Some("s-1".into()), claims());
        let printed = format!("{session:?}");
        assert!(!printed.contains("secret-access"));
        assert!(!printed.contains("secret-refresh"));
        assert!(printed.contains("s-1"));
    }

    #[test]
    fn serde_roundtrip_preserves_equality() {
        let session = Session::new("a", "r", 120, Some("sid".into()), claims());
        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn origin_defaults_to_parent_when_absent() {
        let json = r#"{"access_token":"a","refresh_token":"r","expires_at":"2030-01-01T00:00:00Z","user":{"id":"u","email":"e@x.y"}}"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert_eq!(session.origin, SessionOrigin::Parent);
        assert_eq!(session.with_origin(SessionOrigin::Local).origin, SessionOrigin::Local);
    }
}
