//! Mock implementations of the auth seams
//!
//! Each mock replays queued results in order and counts its calls.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]

use std::collections::VecDeque;

use async_trait::async_trait;
use mentorhub_domain::{Session, UserClaims, UserProfile};
use parking_lot::Mutex;

use crate::auth::traits::{
    IdentityProvider, LocalAuthProvider, Navigator, ProfileSource, SecretBackend,
};
use crate::auth::types::{AuthError, Credentials, LogoutRequest, StoreError, TokenResponse};

type Replies<T> = Mutex<VecDeque<Result<T, AuthError>>>;

/// Scripted parent identity provider
///
/// # Examples
///
/// ```
/// use mentorhub_common::auth::{AuthError, IdentityProvider};
/// use mentorhub_common::testing::MockIdentityProvider;
///
/// # tokio_test::block_on(async {
/// let provider = MockIdentityProvider::new();
/// provider.push_refresh(Err(AuthError::Refresh("revoked".into())));
///
/// assert!(provider.refresh("rt").await.is_err());
/// assert_eq!(provider.refresh_calls(), 1);
/// # });
/// ```
#[derive(Default)]
pub struct MockIdentityProvider {
    exchanges: Replies<TokenResponse>,
    refreshes: Replies<TokenResponse>,
    exchange_calls: Mutex<Vec<String>>,
    refresh_calls: Mutex<Vec<String>>,
    logout_calls: Mutex<Vec<LogoutRequest>>,
    fail_logout: Mutex<bool>,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next `exchange_code`
    pub fn push_exchange(&self, result: Result<TokenResponse, AuthError>) {
        self.exchanges.lock().push_back(result);
    }

    /// Queue the result of the next `refresh`
    pub fn push_refresh(&self, result: Result<TokenResponse, AuthError>) {
        self.refreshes.lock().push_back(result);
    }

    /// Make `terminate_session` fail from now on
    pub fn fail_logout(&self) {
        *self.fail_logout.lock() = true;
    }

    #[must_use]
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.lock().len()
    }

    /// Codes passed to `exchange_code`, oldest first
    #[must_use]
    pub fn exchanged_codes(&self) -> Vec<String> {
        self.exchange_calls.lock().clone()
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.lock().len()
    }

    #[must_use]
    pub fn logout_calls(&self) -> usize {
        self.logout_calls.lock().len()
    }

    #[must_use]
    pub fn last_logout(&self) -> Option<LogoutRequest> {
        self.logout_calls.lock().last().cloned()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn exchange_code(
        &self,
        code: &str,
        _redirect_uri: &str,
    ) -> Result<TokenResponse, AuthError> {
        self.exchange_calls.lock().push(code.to_string());
        self.exchanges.lock().pop_front().unwrap_or_else(|| {
            Err(AuthError::TokenExchange {
                error: "no_scripted_response".into(),
                description: None,
            })
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        self.refresh_calls.lock().push(refresh_token.to_string());
        self.refreshes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(AuthError::Refresh("no scripted response".into())))
    }

    async fn terminate_session(&self, request: &LogoutRequest) -> Result<(), AuthError> {
        self.logout_calls.lock().push(request.clone());
        if *self.fail_logout.lock() {
            return Err(AuthError::Network("parent unreachable".into()));
        }
        Ok(())
    }
}

/// Navigator that records where the host was sent
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<String>>,
    replacements: Mutex<Vec<String>>,
    fail_redirects: Mutex<bool>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `redirect` fail from now on
    pub fn fail_redirects(&self) {
        *self.fail_redirects.lock() = true;
    }

    #[must_use]
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().clone()
    }

    #[must_use]
    pub fn replacements(&self) -> Vec<String> {
        self.replacements.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, location: &str) -> Result<(), AuthError> {
        if *self.fail_redirects.lock() {
            return Err(AuthError::Navigation(format!("cannot open {location}")));
        }
        self.redirects.lock().push(location.to_string());
        Ok(())
    }

    fn replace_location(&self, location: &str) {
        self.replacements.lock().push(location.to_string());
    }
}

/// Local credential sign-in that accepts any password
///
/// Issued sessions carry no role claim, like the embedded database's.
#[derive(Debug, Default)]
pub struct MockLocalAuth {
    sign_in_calls: Mutex<usize>,
    refresh_calls: Mutex<usize>,
    sign_out_calls: Mutex<usize>,
}

impl MockLocalAuth {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sign_in_calls(&self) -> usize {
        *self.sign_in_calls.lock()
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        *self.refresh_calls.lock()
    }

    #[must_use]
    pub fn sign_out_calls(&self) -> usize {
        *self.sign_out_calls.lock()
    }
}

#[async_trait]
impl LocalAuthProvider for MockLocalAuth {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        *self.sign_in_calls.lock() += 1;
        let user = UserClaims::new(format!("local-{}", credentials.email), &credentials.email);
        Ok(Session::new("local-at", "local-rt", 3600, None, user))
    }

    async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
        let count = {
            let mut calls = self.refresh_calls.lock();
            *calls += 1;
            *calls
        };
        Ok(Session::new(
            format!("local-at-{count}"),
            session.refresh_token.clone(),
            3600,
            None,
            session.user.clone(),
        ))
    }

    async fn sign_out(&self, _session: &Session) -> Result<(), AuthError> {
        *self.sign_out_calls.lock() += 1;
        Ok(())
    }
}

/// Scripted profile table lookups
#[derive(Default)]
pub struct MockProfileSource {
    replies: Replies<UserProfile>,
    calls: Mutex<usize>,
}

impl MockProfileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next lookup
    pub fn push(&self, result: Result<UserProfile, AuthError>) {
        self.replies.lock().push_back(result);
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl ProfileSource for MockProfileSource {
    async fn fetch_profile(&self, session: &Session) -> Result<UserProfile, AuthError> {
        *self.calls.lock() += 1;
        self.replies.lock().pop_front().unwrap_or_else(|| {
            Err(AuthError::ProfileFetch(format!("no profile row for {}", session.user.id)))
        })
    }
}

/// Secret backend whose every operation fails
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSecretBackend;

impl SecretBackend for FailingSecretBackend {
    fn set_secret(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Access("backend unavailable".into()))
    }

    fn get_secret(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Access("backend unavailable".into()))
    }

    fn delete_secret(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Access("backend unavailable".into()))
    }
}
