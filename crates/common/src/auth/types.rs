//! Auth error taxonomy and the parent provider's wire types
//!
//! Every request and response body exchanged with the parent identity
//! provider lives here, together with the errors the session lifecycle can
//! surface to callers.

use std::fmt;

use mentorhub_domain::{MentorHubError, Session, UserClaims};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while persisting or loading tokens
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing secret store refused the operation
    #[error("secret store access failed: {0}")]
    Access(String),

    /// A persisted entry could not be encoded or decoded
    #[error("stored entry is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by the delegated authentication lifecycle
#[derive(Debug, Error)]
pub enum AuthError {
    /// Application id or parent URL missing or malformed
    #[error("authentication is not configured: {0}")]
    Configuration(String),

    /// Callback state did not match the pending transaction
    #[error("OAuth state mismatch; possible cross-site request forgery")]
    Csrf,

    /// The parent rejected the authorization code
    #[error("token exchange failed: {error}{}", parenthesized(.description))]
    TokenExchange { error: String, description: Option<String> },

    /// The parent rejected the refresh token
    #[error("token refresh failed: {0}")]
    Refresh(String),

    /// Role lookup against the profile table failed
    #[error("profile lookup failed: {0}")]
    ProfileFetch(String),

    /// Callback arrived without `code` or `state`
    #[error("invalid OAuth callback: {0}")]
    InvalidCallback(String),

    /// The request never produced a usable response
    #[error("network error: {0}")]
    Network(String),

    #[error(transparent)]
    Storage(#[from] StoreError),

    /// The host could not be navigated
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// An operation required a session and none exists
    #[error("not authenticated")]
    NotAuthenticated,
}

fn parenthesized(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(" ({d})")).unwrap_or_default()
}

impl AuthError {
    /// Message safe to show to an end user
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "Sign-in is not available right now. Please contact support.",
            Self::Csrf | Self::InvalidCallback(_) => {
                "The sign-in link is invalid or has expired. Please sign in again."
            }
            Self::TokenExchange { .. } => "We could not complete sign-in. Please try again.",
            Self::Refresh(_) | Self::NotAuthenticated => {
                "Your session has ended. Please sign in again."
            }
            Self::ProfileFetch(_) => "Some profile details could not be loaded.",
            Self::Network(_) => "We could not reach the sign-in service. Check your connection.",
            Self::Storage(_) | Self::Navigation(_) => "Something went wrong. Please try again.",
        }
    }

    /// Whether this error ends the current session
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Refresh(_) | Self::NotAuthenticated)
    }
}

impl From<MentorHubError> for AuthError {
    fn from(err: MentorHubError) -> Self {
        match err {
            MentorHubError::Config(msg) => Self::Configuration(msg),
            MentorHubError::Network(msg) => Self::Network(msg),
            MentorHubError::Storage(msg) => Self::Storage(StoreError::Access(msg)),
            other => Self::Configuration(other.to_string()),
        }
    }
}

impl From<AuthError> for MentorHubError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Configuration(msg) => Self::Config(msg),
            AuthError::Network(msg) => Self::Network(msg),
            AuthError::Storage(e) => Self::Storage(e.to_string()),
            other => Self::Auth(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Token endpoint response, shared by both grant types
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user: Option<UserClaims>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("expires_in", &self.expires_in)
            .field("session_id", &self.session_id)
            .field("user", &self.user.as_ref().map(|u| u.id.as_str()))
            .finish_non_exhaustive()
    }
}

impl TokenResponse {
    /// Build the session established by an authorization-code exchange
    ///
    /// # Errors
    /// Returns `AuthError::TokenExchange` when the response lacks a token or
    /// the user claims.
    pub fn into_session(self, default_ttl_secs: i64) -> Result<Session, AuthError> {
        let refresh_token = self.refresh_token.filter(|t| !t.is_empty());
        let (Some(refresh_token), Some(user)) = (refresh_token, self.user) else {
            return Err(AuthError::TokenExchange {
                error: "invalid_response".to_string(),
                description: Some("token response is missing tokens or user claims".to_string()),
            });
        };
        if self.access_token.is_empty() {
            return Err(AuthError::TokenExchange {
                error: "invalid_response".to_string(),
                description: Some("token response carries an empty access token".to_string()),
            });
        }
        Ok(Session::new(
            self.access_token,
            refresh_token,
            self.expires_in.unwrap_or(default_ttl_secs),
            self.session_id,
            user,
        ))
    }

    /// Apply a refresh response on top of the session it renews
    ///
    /// The refresh token, session id, and claims carry over when the
    /// provider does not rotate them.
    ///
    /// # Errors
    /// Returns `AuthError::Refresh` when the access token is empty.
    pub fn renew(self, previous: &Session, default_ttl_secs: i64) -> Result<Session, AuthError> {
        if self.access_token.is_empty() {
            return Err(AuthError::Refresh("refresh response carries an empty access token".into()));
        }
        let mut renewed = Session::new(
            self.access_token,
            self.refresh_token
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| previous.refresh_token.clone()),
            self.expires_in.unwrap_or(default_ttl_secs),
            self.session_id.or_else(|| previous.session_id.clone()),
            self.user.unwrap_or_else(|| previous.user.clone()),
        );
        renewed.origin = previous.origin;
        Ok(renewed)
    }
}

/// Error body returned by the parent on non-2xx responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// `authorization_code` grant body
#[derive(Debug, Clone, Serialize)]
pub struct CodeExchangeRequest<'a> {
    pub grant_type: &'static str,
    pub code: &'a str,
    pub child_app_id: &'a str,
    pub redirect_uri: &'a str,
}

/// `refresh_token` grant body
#[derive(Clone, Serialize)]
pub struct RefreshRequest<'a> {
    pub grant_type: &'static str,
    pub refresh_token: &'a str,
    pub child_app_id: &'a str,
    pub redirect_uri: &'a str,
}

/// Child-session termination body
#[derive(Clone, Serialize)]
pub struct LogoutRequest {
    pub app_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub access_token: String,
    pub redirect_uri: String,
}

impl fmt::Debug for LogoutRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogoutRequest")
            .field("app_id", &self.app_id)
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

/// Query parameters delivered to the redirect URI
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse the query string of a callback URL (with or without `?`)
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "code" => params.code = value,
                "state" => params.state = value,
                "error" => params.error = value,
                "error_description" => params.error_description = value,
                _ => {}
            }
        }
        params
    }
}

/// Email and password for the local-auth fallback
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Outcome of `SessionManager::login`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The host was sent to the parent's consent page
    Redirected,
    /// The local-auth fallback produced a session directly
    SignedIn(Session),
}
