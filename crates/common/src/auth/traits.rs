//! Traits at the seams of the session lifecycle
//!
//! These traits enable dependency injection and testing by abstracting
//! external dependencies (the parent identity provider, the embedded
//! database, secret storage, and host navigation).

use async_trait::async_trait;
use mentorhub_domain::{Session, UserProfile};

use super::types::{AuthError, Credentials, LogoutRequest, StoreError, TokenResponse};

/// Parent identity provider operations
///
/// Implemented over HTTP by [`super::client::ParentAuthClient`].
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange an authorization code for tokens
    ///
    /// # Errors
    /// Returns `AuthError::TokenExchange` when the parent answers non-2xx
    async fn exchange_code(&self, code: &str, redirect_uri: &str)
        -> Result<TokenResponse, AuthError>;

    /// Trade a refresh token for a new access token
    ///
    /// # Errors
    /// Returns `AuthError::Refresh` when the parent answers non-2xx
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError>;

    /// Terminate the child session at the parent
    ///
    /// # Errors
    /// Returns an error if the request fails; callers treat this as
    /// best-effort
    async fn terminate_session(&self, request: &LogoutRequest) -> Result<(), AuthError>;
}

/// Persistence of the single current session
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a session, replacing any prior one
    ///
    /// # Errors
    /// Returns `StoreError` if any entry cannot be written
    async fn save(&self, session: &Session) -> Result<(), StoreError>;

    /// Load the current session
    ///
    /// Returns `Ok(None)` if any required entry is missing or expired.
    ///
    /// # Errors
    /// Returns `StoreError` if the backend is unreachable or an entry is
    /// malformed
    async fn load(&self) -> Result<Option<Session>, StoreError>;

    /// Remove every entry (idempotent)
    ///
    /// # Errors
    /// Returns `StoreError` if the backend refuses the deletion
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Key/value secret storage underneath a [`TokenStore`]
pub trait SecretBackend: Send + Sync {
    /// # Errors
    /// Returns `StoreError::Access` if the write fails
    fn set_secret(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Returns `Ok(None)` when the key does not exist
    ///
    /// # Errors
    /// Returns `StoreError::Access` if the read fails
    fn get_secret(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Delete a key; deleting a missing key succeeds
    ///
    /// # Errors
    /// Returns `StoreError::Access` if the deletion fails
    fn delete_secret(&self, key: &str) -> Result<(), StoreError>;
}

/// Host navigation (full-page redirects and location rewrites)
pub trait Navigator: Send + Sync {
    /// Send the host to `location`, abandoning the current page
    ///
    /// # Errors
    /// Returns `AuthError::Navigation` if the host cannot be navigated
    fn redirect(&self, location: &str) -> Result<(), AuthError>;

    /// Replace the current location without adding a history entry
    fn replace_location(&self, location: &str);
}

/// Direct credential sign-in against the embedded database
#[async_trait]
pub trait LocalAuthProvider: Send + Sync {
    /// # Errors
    /// Returns `AuthError::TokenExchange` for rejected credentials
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError>;

    /// # Errors
    /// Returns `AuthError::Refresh` if the refresh token is rejected
    async fn refresh(&self, session: &Session) -> Result<Session, AuthError>;

    /// # Errors
    /// Returns an error if the request fails; callers treat this as
    /// best-effort
    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;
}

/// Role lookup for sessions whose claims carry no role
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// # Errors
    /// Returns `AuthError::ProfileFetch` if the lookup fails or finds no row
    async fn fetch_profile(&self, session: &Session) -> Result<UserProfile, AuthError>;
}
