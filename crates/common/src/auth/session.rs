//! Session manager
//!
//! Public façade over the flow controller, the token store and the refresh
//! scheduler. It owns the session lifecycle:
//!
//! ```text
//! login ──► consent page ──► handle_callback ──► save + arm
//!                                                   │
//!                         ┌─────────────────────────┘
//!                         ▼
//!                  timer fires ──► refresh ──► save + re-arm
//!                                     │
//!                                     └─ error ──► clear + sign-in
//! ```
//!
//! Refresh failures, including an unreadable store, are terminal: the
//! session is torn down and the host is sent to the sign-in page. There is
//! no retry.
//!
//! The store is re-read when the timer fires, so a session replaced or
//! removed by another process sharing the store is honored. Concurrent
//! refreshes from separate processes are not coordinated.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use mentorhub_domain::constants::SESSION_ID_HEADER;
use mentorhub_domain::{AuthConfig, Session, SessionOrigin};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use super::client::ParentAuthClient;
use super::flow::OAuthFlowController;
use super::scheduler::RefreshScheduler;
use super::traits::{IdentityProvider, LocalAuthProvider, Navigator, TokenStore};
use super::types::{AuthError, Credentials, LoginOutcome, LogoutRequest};

type RefreshTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

fn invalid_header(what: &str, err: &dyn std::fmt::Display) -> AuthError {
    AuthError::Configuration(format!("{what} is not a valid header value: {err}"))
}

/// Builder for [`SessionManager`]
pub struct SessionManagerBuilder {
    config: AuthConfig,
    provider: Option<Arc<dyn IdentityProvider>>,
    store: Option<Arc<dyn TokenStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    local_auth: Option<Arc<dyn LocalAuthProvider>>,
}

impl SessionManagerBuilder {
    /// Override the parent identity provider client
    ///
    /// Defaults to a [`ParentAuthClient`] built from the configuration.
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Enable the credential sign-in fallback
    #[must_use]
    pub fn local_auth(mut self, local_auth: Arc<dyn LocalAuthProvider>) -> Self {
        self.local_auth = Some(local_auth);
        self
    }

    /// # Errors
    /// Returns `AuthError::Configuration` if the store or navigator is
    /// missing, or if the default provider client cannot be built
    pub fn build(self) -> Result<Arc<SessionManager>, AuthError> {
        let store = self
            .store
            .ok_or_else(|| AuthError::Configuration("a token store is required".into()))?;
        let navigator = self
            .navigator
            .ok_or_else(|| AuthError::Configuration("a navigator is required".into()))?;

        let provider = match self.provider {
            Some(provider) => Some(provider),
            None if self.config.oauth_configured() => {
                Some(Arc::new(ParentAuthClient::new(&self.config)?) as Arc<dyn IdentityProvider>)
            }
            None => None,
        };
        let flow = provider.as_ref().map(|p| {
            OAuthFlowController::new(self.config.clone(), Arc::clone(p), Arc::clone(&navigator))
        });
        if flow.is_none() && self.local_auth.is_none() {
            warn!("Neither the parent provider nor local auth is configured");
        }

        let (session_tx, _) = watch::channel(None);
        Ok(Arc::new(SessionManager {
            scheduler: RefreshScheduler::new(
                self.config.refresh_lead_secs,
                self.config.min_refresh_delay_secs,
            ),
            config: self.config,
            flow,
            provider,
            store,
            navigator,
            local_auth: self.local_auth,
            session_tx,
            refresh_gate: Mutex::new(()),
            logout_epoch: AtomicU64::new(0),
        }))
    }
}

/// Session lifecycle façade
pub struct SessionManager {
    config: AuthConfig,
    flow: Option<OAuthFlowController>,
    provider: Option<Arc<dyn IdentityProvider>>,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    local_auth: Option<Arc<dyn LocalAuthProvider>>,
    scheduler: RefreshScheduler,
    session_tx: watch::Sender<Option<Session>>,
    refresh_gate: Mutex<()>,
    logout_epoch: AtomicU64,
}

impl SessionManager {
    #[must_use]
    pub fn builder(config: AuthConfig) -> SessionManagerBuilder {
        SessionManagerBuilder {
            config,
            provider: None,
            store: None,
            navigator: None,
            local_auth: None,
        }
    }

    /// Restore a persisted session and arm its refresh
    ///
    /// Call once at startup.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the store cannot be read
    pub async fn initialize(self: &Arc<Self>) -> Result<Option<Session>, AuthError> {
        let session = self.store.load().await?;
        match &session {
            Some(s) => {
                info!(user = %s.user.id, expires_in = s.seconds_until_expiry(), "Restored session");
                self.arm_refresh(s);
            }
            None => {
                debug!("No persisted session");
                self.scheduler.cancel();
            }
        }
        self.publish(session.clone());
        Ok(session)
    }

    /// Stop the refresh timer; the persisted session is left intact
    pub fn dispose(&self) {
        self.scheduler.cancel();
        debug!("Session manager disposed");
    }

    /// The current session as persisted
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the store cannot be read
    pub async fn get_current_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.store.load().await?)
    }

    /// Start a login
    ///
    /// Uses the parent identity provider when it is configured. Otherwise,
    /// when local auth is available and `fallback` credentials are given,
    /// signs in directly.
    ///
    /// # Errors
    /// Returns `AuthError::Configuration` when no sign-in path is usable,
    /// or the error of the path taken
    pub async fn login(
        self: &Arc<Self>,
        fallback: Option<&Credentials>,
    ) -> Result<LoginOutcome, AuthError> {
        let reason = match &self.flow {
            Some(flow) => match flow.initiate_login() {
                Ok(_) => return Ok(LoginOutcome::Redirected),
                Err(AuthError::Configuration(reason)) => reason,
                Err(e) => return Err(e),
            },
            None => "parent identity provider is not configured".to_string(),
        };

        let (Some(local), Some(credentials)) = (&self.local_auth, fallback) else {
            return Err(AuthError::Configuration(reason));
        };
        info!(%reason, "Falling back to local credential sign-in");
        let epoch = self.logout_epoch.load(Ordering::SeqCst);
        let session = local.sign_in(credentials).await?.with_origin(SessionOrigin::Local);
        let session = self.establish(session, epoch).await?;
        Ok(LoginOutcome::SignedIn(session))
    }

    /// Complete the OAuth callback: exchange, persist, arm refresh, and strip
    /// the authorization parameters from the host location
    ///
    /// # Errors
    /// Returns the flow controller's error, or `AuthError::Storage` if the
    /// session cannot be persisted
    pub async fn handle_callback(
        self: &Arc<Self>,
        code: &str,
        state: &str,
    ) -> Result<Session, AuthError> {
        let flow = self.flow()?;
        let epoch = self.logout_epoch.load(Ordering::SeqCst);
        let session = flow.handle_callback(code, state).await?;
        self.complete_callback(flow, session, epoch).await
    }

    /// [`Self::handle_callback`] from the raw callback query string
    ///
    /// # Errors
    /// Returns `AuthError::TokenExchange` if the parent redirected back with
    /// `error`, otherwise as [`Self::handle_callback`]
    pub async fn handle_callback_query(
        self: &Arc<Self>,
        query: &str,
    ) -> Result<Session, AuthError> {
        let flow = self.flow()?;
        let epoch = self.logout_epoch.load(Ordering::SeqCst);
        let session = flow.handle_callback_query(query).await?;
        self.complete_callback(flow, session, epoch).await
    }

    async fn complete_callback(
        self: &Arc<Self>,
        flow: &OAuthFlowController,
        session: Session,
        epoch: u64,
    ) -> Result<Session, AuthError> {
        let session = self.establish(session, epoch).await?;
        flow.strip_callback_params();
        Ok(session)
    }

    /// Return a usable session, refreshing first if it is within the refresh
    /// lead window
    ///
    /// A failed refresh tears the session down and yields `Ok(None)`.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the store cannot be read
    pub async fn ensure_valid_session(self: &Arc<Self>) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.store.load().await? else {
            return Ok(None);
        };
        if !session.is_expired(self.config.refresh_lead_secs) {
            return Ok(Some(session));
        }
        match self.refresh(false).await {
            Ok(session) => Ok(Some(session)),
            Err(e) if e.is_terminal() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Refresh the current session now
    ///
    /// This is what the refresh timer runs.
    ///
    /// # Errors
    /// Returns `AuthError::Refresh` after tearing the session down,
    /// `AuthError::Storage` if the store could not be read (also torn down),
    /// or `AuthError::NotAuthenticated` if no session is stored
    pub async fn refresh_session(self: &Arc<Self>) -> Result<Session, AuthError> {
        self.refresh(true).await
    }

    async fn refresh(self: &Arc<Self>, force: bool) -> Result<Session, AuthError> {
        let _gate = self.refresh_gate.lock().await;
        let epoch = self.logout_epoch.load(Ordering::SeqCst);

        let loaded = match self.store.load().await {
            Ok(loaded) => loaded,
            Err(e) => {
                error!(error = %e, "Session unreadable at refresh time");
                self.teardown().await;
                return Err(e.into());
            }
        };
        let Some(current) = loaded else {
            info!("No stored session at refresh time");
            self.scheduler.cancel();
            self.publish(None);
            return Err(AuthError::NotAuthenticated);
        };
        if !force && !current.is_expired(self.config.refresh_lead_secs) {
            return Ok(current);
        }

        let renewed = match self.renew(&current).await {
            Ok(renewed) => renewed,
            Err(e) => {
                error!(error = %e, user = %current.user.id, "Session refresh failed");
                self.teardown().await;
                return Err(match e {
                    AuthError::Refresh(reason) => AuthError::Refresh(reason),
                    other => AuthError::Refresh(other.to_string()),
                });
            }
        };
        let session = self.establish(renewed, epoch).await?;
        info!(user = %session.user.id, "Session refreshed");
        Ok(session)
    }

    async fn renew(&self, current: &Session) -> Result<Session, AuthError> {
        match current.origin {
            SessionOrigin::Parent => {
                let provider = self
                    .provider
                    .as_ref()
                    .ok_or_else(|| AuthError::Refresh("parent provider unavailable".into()))?;
                provider
                    .refresh(&current.refresh_token)
                    .await?
                    .renew(current, self.config.access_token_ttl_secs)
            }
            SessionOrigin::Local => {
                let local = self
                    .local_auth
                    .as_ref()
                    .ok_or_else(|| AuthError::Refresh("local auth unavailable".into()))?;
                Ok(local.refresh(current).await?.with_origin(SessionOrigin::Local))
            }
        }
    }

    /// Persist a session, publish it and arm its refresh
    ///
    /// A logout that started after `epoch` wins: the write is undone.
    async fn establish(
        self: &Arc<Self>,
        session: Session,
        epoch: u64,
    ) -> Result<Session, AuthError> {
        self.store.save(&session).await?;
        if self.logout_epoch.load(Ordering::SeqCst) != epoch {
            warn!("Logout raced an in-flight session write; discarding it");
            self.store.clear().await?;
            return Err(AuthError::NotAuthenticated);
        }
        self.arm_refresh(&session);
        self.publish(Some(session.clone()));
        Ok(session)
    }

    async fn teardown(&self) {
        self.scheduler.cancel();
        if let Err(e) = self.store.clear().await {
            error!(error = %e, "Failed to clear session after refresh failure");
        }
        self.publish(None);
        if let Err(e) = self.navigator.redirect(&self.config.sign_in_path) {
            warn!(error = %e, "Failed to navigate to sign-in");
        }
    }

    fn arm_refresh(self: &Arc<Self>, session: &Session) {
        let delay = self
            .scheduler
            .arm(session.seconds_until_expiry(), Self::refresh_task(Arc::downgrade(self)));
        debug!(delay_secs = delay.as_secs(), "Refresh scheduled");
    }

    fn refresh_task(manager: Weak<Self>) -> RefreshTask {
        Box::pin(async move {
            let Some(manager) = manager.upgrade() else {
                return;
            };
            if let Err(e) = manager.refresh_session().await {
                debug!(error = %e, "Scheduled refresh ended the session");
            }
        })
    }

    /// End the session everywhere
    ///
    /// Notifies the issuer best-effort, then clears the store, cancels the
    /// refresh timer and sends the host to the sign-in page regardless of the
    /// notification's outcome.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if clearing failed or
    /// `AuthError::Navigation` if the redirect failed; local teardown still
    /// happens in both cases
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.logout_epoch.fetch_add(1, Ordering::SeqCst);
        match self.store.load().await {
            Ok(Some(session)) => self.notify_logout(&session).await,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not read session before logout"),
        }

        if let Some(flow) = &self.flow {
            flow.abandon();
        }
        self.scheduler.cancel();
        let cleared = self.store.clear().await;
        self.publish(None);
        info!("Logged out");

        let navigated = self.navigator.redirect(&self.config.sign_in_path);
        cleared?;
        navigated
    }

    async fn notify_logout(&self, session: &Session) {
        let result = match session.origin {
            SessionOrigin::Parent => match &self.provider {
                Some(provider) => {
                    let request = LogoutRequest {
                        app_id: self.config.child_app_id.clone(),
                        session_id: session.session_id.clone(),
                        access_token: session.access_token.clone(),
                        redirect_uri: self.config.redirect_uri.clone(),
                    };
                    provider.terminate_session(&request).await
                }
                None => Ok(()),
            },
            SessionOrigin::Local => match &self.local_auth {
                Some(local) => local.sign_out(session).await,
                None => Ok(()),
            },
        };
        if let Err(e) = result {
            warn!(error = %e, "Logout notification failed; clearing locally");
        }
    }

    /// Headers authenticating an API request as the current session
    ///
    /// # Errors
    /// Returns `AuthError::NotAuthenticated` when there is no session
    pub async fn auth_headers(&self) -> Result<HeaderMap, AuthError> {
        let session = self.get_current_session().await?.ok_or(AuthError::NotAuthenticated)?;

        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", session.access_token))
            .map_err(|e| invalid_header("access token", &e))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        if let Some(session_id) = &session.session_id {
            let name = HeaderName::from_bytes(SESSION_ID_HEADER.as_bytes())
                .map_err(|e| AuthError::Configuration(e.to_string()))?;
            let value =
                HeaderValue::from_str(session_id).map_err(|e| invalid_header("session id", &e))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    /// Observe session changes made through this manager
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session_tx.subscribe()
    }

    fn publish(&self, session: Option<Session>) {
        self.session_tx.send_replace(session);
    }

    fn flow(&self) -> Result<&OAuthFlowController, AuthError> {
        self.flow.as_ref().ok_or_else(|| {
            AuthError::Configuration("parent identity provider is not configured".into())
        })
    }

    /// Discard a pending OAuth login
    pub fn abandon_login(&self) {
        if let Some(flow) = &self.flow {
            flow.abandon();
        }
    }

    #[must_use]
    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn oauth_enabled(&self) -> bool {
        self.flow.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    use async_trait::async_trait;
    use mentorhub_domain::{Environment, UserClaims};

    use super::*;
    use crate::auth::scheduler::SchedulerState;
    use crate::auth::store::{MemorySecretStore, PersistedTokenStore};
    use crate::auth::types::{StoreError, TokenResponse};
    use crate::testing::{
        FailingSecretBackend, MockIdentityProvider, MockLocalAuth, RecordingNavigator,
    };

    struct Harness {
        manager: Arc<SessionManager>,
        provider: Arc<MockIdentityProvider>,
        navigator: Arc<RecordingNavigator>,
        store: Arc<dyn TokenStore>,
    }

    fn memory_store() -> Arc<dyn TokenStore> {
        Arc::new(PersistedTokenStore::new(
            MemorySecretStore::new(),
            "test",
            Environment::Test.storage_attributes(),
            30 * 24 * 3600,
        ))
    }

    fn config() -> AuthConfig {
        AuthConfig::new("https://hub.example.com", "mentor-app", "http://localhost:5173/callback")
    }

    fn harness_with(config: AuthConfig, store: Arc<dyn TokenStore>) -> Harness {
        let provider = Arc::new(MockIdentityProvider::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let manager = SessionManager::builder(config)
            .provider(provider.clone())
            .store(Arc::clone(&store))
            .navigator(navigator.clone())
            .build()
            .unwrap();
        Harness { manager, provider, navigator, store }
    }

    fn harness() -> Harness {
        harness_with(config(), memory_store())
    }

    fn tokens(access: &str, expires_in: i64) -> TokenResponse {
        TokenResponse {
            access_token: access.into(),
            refresh_token: Some(format!("{access}-refresh")),
            expires_in: Some(expires_in),
            session_id: Some("sess-1".into()),
            user: Some(UserClaims::new("u1", "u1@example.com").with_role("mentor")),
        }
    }

    fn state_from(navigator: &RecordingNavigator) -> String {
        let consent = url::Url::parse(&navigator.redirects()[0]).unwrap();
        consent.query_pairs().find(|(k, _)| k == "state").map(|(_, v)| v.into_owned()).unwrap()
    }

    async fn logged_in(h: &Harness, expires_in: i64) -> Session {
        h.provider.push_exchange(Ok(tokens("at-1", expires_in)));
        h.manager.login(None).await.unwrap();
        let state = state_from(&h.navigator);
        h.manager.handle_callback("code-1", &state).await.unwrap()
    }

    #[tokio::test]
    async fn callback_persists_and_arms_refresh() {
        let h = harness();
        let session = logged_in(&h, 3600).await;

        assert_eq!(h.manager.get_current_session().await.unwrap(), Some(session.clone()));
        assert!(h.manager.scheduler().is_armed());
        assert_eq!(h.navigator.replacements(), vec!["http://localhost:5173/callback".to_string()]);
        assert_eq!(*h.manager.subscribe().borrow(), Some(session));
    }

    /// Validates `SessionManager::refresh_session` behavior for the timer
    /// fire scenario.
    ///
    /// Assertions:
    /// - The refresh runs once the lead window is reached.
    /// - The renewed session replaces the stored one and is re-armed.
    #[tokio::test(start_paused = true)]
    async fn timer_refreshes_and_rearms() {
        let h = harness();
        logged_in(&h, 3600).await;
        h.provider.push_refresh(Ok(tokens("at-2", 3600)));

        tokio::time::sleep(Duration::from_secs(3301)).await;

        assert_eq!(h.provider.refresh_calls(), 1);
        let stored = h.manager.get_current_session().await.unwrap().unwrap();
        assert_eq!(stored.access_token, "at-2");
        assert_eq!(h.manager.scheduler().state(), SchedulerState::Armed);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_failure_tears_down_session() {
        let h = harness();
        logged_in(&h, 3600).await;
        h.provider.push_refresh(Err(AuthError::Refresh("revoked".into())));

        tokio::time::sleep(Duration::from_secs(3301)).await;

        assert_eq!(h.manager.get_current_session().await.unwrap(), None);
        assert_eq!(h.manager.scheduler().state(), SchedulerState::Idle);
        assert_eq!(h.navigator.redirects().last().map(String::as_str), Some("/login"));
        assert_eq!(*h.manager.subscribe().borrow(), None);
    }

    /// Store that can be switched to fail reads
    struct UnreadableStore {
        inner: Arc<dyn TokenStore>,
        unreadable: AtomicBool,
    }

    #[async_trait]
    impl TokenStore for UnreadableStore {
        async fn save(&self, session: &Session) -> Result<(), StoreError> {
            self.inner.save(session).await
        }

        async fn load(&self) -> Result<Option<Session>, StoreError> {
            if self.unreadable.load(Ordering::SeqCst) {
                return Err(StoreError::Access("keychain locked".into()));
            }
            self.inner.load().await
        }

        async fn clear(&self) -> Result<(), StoreError> {
            self.inner.clear().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_store_at_refresh_tears_down() {
        let inner = memory_store();
        let store = Arc::new(UnreadableStore {
            inner: Arc::clone(&inner),
            unreadable: AtomicBool::new(false),
        });
        let h = harness_with(config(), store.clone());
        logged_in(&h, 3600).await;
        store.unreadable.store(true, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(3301)).await;

        assert_eq!(h.provider.refresh_calls(), 0);
        assert_eq!(inner.load().await.unwrap(), None);
        assert_eq!(h.manager.scheduler().state(), SchedulerState::Idle);
        assert_eq!(*h.manager.subscribe().borrow(), None);
        assert_eq!(h.navigator.redirects().last().map(String::as_str), Some("/login"));
    }

    #[tokio::test]
    async fn logout_clears_even_when_parent_unreachable() {
        let h = harness();
        logged_in(&h, 3600).await;
        h.provider.fail_logout();

        h.manager.logout().await.unwrap();

        assert_eq!(h.provider.logout_calls(), 1);
        assert_eq!(h.manager.get_current_session().await.unwrap(), None);
        assert_eq!(h.manager.scheduler().state(), SchedulerState::Idle);
        assert_eq!(h.navigator.redirects().last().map(String::as_str), Some("/login"));
    }

    #[tokio::test]
    async fn failed_save_does_not_arm() {
        let store: Arc<dyn TokenStore> = Arc::new(PersistedTokenStore::new(
            FailingSecretBackend,
            "test",
            Environment::Test.storage_attributes(),
            60,
        ));
        let h = harness_with(config(), store);
        h.provider.push_exchange(Ok(tokens("at-1", 3600)));
        h.manager.login(None).await.unwrap();
        let state = state_from(&h.navigator);

        let err = h.manager.handle_callback("code", &state).await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));
        assert!(!h.manager.scheduler().is_armed());
        assert!(h.navigator.replacements().is_empty());
    }

    #[tokio::test]
    async fn ensure_valid_session_refreshes_inside_lead_window() {
        let h = harness();
        logged_in(&h, 120).await;
        h.provider.push_refresh(Ok(tokens("at-2", 3600)));

        let session = h.manager.ensure_valid_session().await.unwrap().unwrap();
        assert_eq!(session.access_token, "at-2");
        assert_eq!(h.provider.refresh_calls(), 1);

        let again = h.manager.ensure_valid_session().await.unwrap().unwrap();
        assert_eq!(again.access_token, "at-2");
        assert_eq!(h.provider.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn ensure_valid_session_yields_none_after_failed_refresh() {
        let h = harness();
        logged_in(&h, 120).await;
        h.provider.push_refresh(Err(AuthError::Refresh("expired".into())));

        assert_eq!(h.manager.ensure_valid_session().await.unwrap(), None);
        assert_eq!(h.store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn auth_headers_carry_bearer_and_session_id() {
        let h = harness();
        assert!(matches!(h.manager.auth_headers().await, Err(AuthError::NotAuthenticated)));

        logged_in(&h, 3600).await;
        let headers = h.manager.auth_headers().await.unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer at-1");
        assert_eq!(headers.get("x-session-id").unwrap(), "sess-1");
    }

    #[tokio::test]
    async fn initialize_restores_and_arms() {
        let store = memory_store();
        let saved = Session::new("at", "rt", 3600, None, UserClaims::new("u1", "u1@example.com"));
        store.save(&saved).await.unwrap();

        let h = harness_with(config(), store);
        assert_eq!(h.manager.initialize().await.unwrap(), Some(saved));
        assert!(h.manager.scheduler().is_armed());

        h.manager.dispose();
        assert_eq!(h.manager.scheduler().state(), SchedulerState::Idle);
    }

    /// Validates `SessionManager::login` behavior for the unconfigured
    /// provider scenario.
    ///
    /// Assertions:
    /// - Without credentials the configuration error surfaces.
    /// - With credentials the local fallback signs in and persists a
    ///   session tagged as local.
    #[tokio::test]
    async fn login_falls_back_to_local_auth() {
        let mut cfg = config();
        cfg.child_app_id.clear();
        let local = Arc::new(MockLocalAuth::new());
        let manager = SessionManager::builder(cfg)
            .store(memory_store())
            .navigator(Arc::new(RecordingNavigator::new()))
            .local_auth(local.clone())
            .build()
            .unwrap();
        assert!(!manager.oauth_enabled());

        assert!(matches!(manager.login(None).await, Err(AuthError::Configuration(_))));

        let creds = Credentials::new("u1@example.com", "pw");
        let LoginOutcome::SignedIn(session) = manager.login(Some(&creds)).await.unwrap() else {
            panic!("expected a local sign-in");
        };
        assert_eq!(session.origin, SessionOrigin::Local);
        assert_eq!(session.user.role, None);
        assert_eq!(local.sign_in_calls(), 1);
        assert!(manager.scheduler().is_armed());
    }
}
