//! Authorization-code flow against the parent identity provider
//!
//! `initiate_login` records a pending [`OAuthTransaction`] and sends the host
//! to the consent page. `handle_callback` checks the returned state against
//! that transaction before any network call and exchanges the code.
//!
//! The transaction is consumed once its state has matched, whether or not the
//! exchange then succeeds, so a callback can never be replayed.

use std::sync::Arc;

use mentorhub_domain::{AuthConfig, OAuthTransaction, Session};
use parking_lot::Mutex;
use tracing::{info, warn};
use url::Url;

use super::state::{generate_state, validate_state};
use super::traits::{IdentityProvider, Navigator};
use super::types::{AuthError, CallbackParams};

/// Drives one authorization round-trip at a time
pub struct OAuthFlowController {
    config: AuthConfig,
    provider: Arc<dyn IdentityProvider>,
    navigator: Arc<dyn Navigator>,
    pending: Mutex<Option<OAuthTransaction>>,
}

impl OAuthFlowController {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        provider: Arc<dyn IdentityProvider>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self { config, provider, navigator, pending: Mutex::new(None) }
    }

    /// Start a login by redirecting the host to the consent page
    ///
    /// A new call replaces any pending transaction.
    ///
    /// # Errors
    /// Returns `AuthError::Configuration` before any side effect when the
    /// application id or parent URL is missing, or `AuthError::Navigation`
    /// if the host cannot be redirected
    pub fn initiate_login(&self) -> Result<Url, AuthError> {
        self.config.validate()?;

        let transaction = OAuthTransaction::new(
            generate_state(),
            self.config.child_app_id.clone(),
            self.config.redirect_uri.clone(),
        );
        let consent = self.consent_url(&transaction)?;
        *self.pending.lock() = Some(transaction);

        info!(app_id = %self.config.child_app_id, "Redirecting to parent consent page");
        if let Err(e) = self.navigator.redirect(consent.as_str()) {
            self.pending.lock().take();
            return Err(e);
        }
        Ok(consent)
    }

    fn consent_url(&self, transaction: &OAuthTransaction) -> Result<Url, AuthError> {
        let mut url = self.config.consent_url()?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("child_app_id", &transaction.app_id)
            .append_pair("redirect_uri", &transaction.redirect_uri)
            .append_pair("scope", &self.config.scope_string())
            .append_pair("state", &transaction.state);
        Ok(url)
    }

    /// Complete the round-trip started by [`Self::initiate_login`]
    ///
    /// Returns the session issued by the parent. Persisting it and arming
    /// the refresh timer is left to the caller.
    ///
    /// # Errors
    /// - `AuthError::InvalidCallback` if `code` or `state` is empty
    /// - `AuthError::Csrf` if no transaction is pending or the state differs;
    ///   no request is sent
    /// - `AuthError::TokenExchange` if the parent rejects the code
    pub async fn handle_callback(&self, code: &str, state: &str) -> Result<Session, AuthError> {
        if code.is_empty() || state.is_empty() {
            return Err(AuthError::InvalidCallback("missing code or state".to_string()));
        }

        let transaction = {
            let mut pending = self.pending.lock();
            match pending.as_ref() {
                Some(t) if validate_state(&t.state, state) => pending.take(),
                Some(_) => None,
                None => {
                    warn!("OAuth callback arrived with no pending login");
                    return Err(AuthError::Csrf);
                }
            }
        };
        let Some(transaction) = transaction else {
            warn!("OAuth callback state does not match the pending login");
            return Err(AuthError::Csrf);
        };

        let response = self.provider.exchange_code(code, &transaction.redirect_uri).await?;
        let session = response.into_session(self.config.access_token_ttl_secs)?;
        info!(user = %session.user.id, "Authorization code exchanged");
        Ok(session)
    }

    /// Complete a callback from its raw query string
    ///
    /// # Errors
    /// Returns `AuthError::TokenExchange` when the parent redirected back
    /// with `error`, otherwise as [`Self::handle_callback`]
    pub async fn handle_callback_query(&self, query: &str) -> Result<Session, AuthError> {
        let params = CallbackParams::from_query(query);
        if let Some(error) = params.error {
            warn!(%error, "Parent returned an authorization error");
            self.abandon();
            return Err(AuthError::TokenExchange { error, description: params.error_description });
        }
        self.handle_callback(
            params.code.as_deref().unwrap_or_default(),
            params.state.as_deref().unwrap_or_default(),
        )
        .await
    }

    /// Remove the authorization parameters from the host location
    pub fn strip_callback_params(&self) {
        let clean = Url::parse(&self.config.redirect_uri).map_or_else(
            |_| self.config.redirect_uri.clone(),
            |mut url| {
                url.set_query(None);
                url.set_fragment(None);
                url.to_string()
            },
        );
        self.navigator.replace_location(&clean);
    }

    /// Discard the pending transaction
    pub fn abandon(&self) {
        if self.pending.lock().take().is_some() {
            info!("Pending OAuth login abandoned");
        }
    }

    #[must_use]
    pub fn has_pending_login(&self) -> bool {
        self.pending.lock().is_some()
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use mentorhub_domain::UserClaims;

    use super::*;
    use crate::auth::types::TokenResponse;
    use crate::testing::{MockIdentityProvider, RecordingNavigator};

    fn config() -> AuthConfig {
        AuthConfig::new("https://hub.example.com", "mentor-app", "http://localhost:5173/callback")
    }

    fn token_response() -> TokenResponse {
        TokenResponse {
            access_token: "at".into(),
            refresh_token: Some("rt".into()),
            expires_in: Some(3600),
            session_id: None,
            user: Some(UserClaims::new("u1", "u1@example.com")),
        }
    }

    fn controller(
        provider: &Arc<MockIdentityProvider>,
        navigator: &Arc<RecordingNavigator>,
    ) -> OAuthFlowController {
        OAuthFlowController::new(config(), provider.clone(), navigator.clone())
    }

    fn state_of(url: &Url) -> String {
        url.query_pairs().find(|(k, _)| k == "state").map(|(_, v)| v.into_owned()).unwrap()
    }

    #[test]
    fn initiate_login_redirects_with_consent_params() {
        let provider = Arc::new(MockIdentityProvider::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let url = controller(&provider, &navigator).initiate_login().unwrap();

        assert_eq!(url.path(), "/auth/child-app/consent");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("response_type".into(), "code".into())));
        assert!(pairs.contains(&("child_app_id".into(), "mentor-app".into())));
        assert!(pairs.contains(&("scope".into(), "read write profile".into())));
        assert!(pairs.contains(&("redirect_uri".into(), "http://localhost:5173/callback".into())));
        assert_eq!(navigator.redirects(), vec![url.to_string()]);
    }

    #[test]
    fn initiate_login_without_app_id_has_no_side_effects() {
        let provider = Arc::new(MockIdentityProvider::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let mut cfg = config();
        cfg.child_app_id.clear();
        let flow = OAuthFlowController::new(cfg, provider, navigator.clone());

        assert!(matches!(flow.initiate_login(), Err(AuthError::Configuration(_))));
        assert!(navigator.redirects().is_empty());
        assert!(!flow.has_pending_login());
    }

    #[test]
    fn failed_redirect_leaves_no_pending_login() {
        let provider = Arc::new(MockIdentityProvider::new());
        let navigator = Arc::new(RecordingNavigator::new());
        navigator.fail_redirects();
        let flow = controller(&provider, &navigator);

        assert!(matches!(flow.initiate_login(), Err(AuthError::Navigation(_))));
        assert!(!flow.has_pending_login());
    }

    #[tokio::test]
    async fn mismatched_state_never_reaches_provider() {
        let provider = Arc::new(MockIdentityProvider::new());
        provider.push_exchange(Ok(token_response()));
        let navigator = Arc::new(RecordingNavigator::new());
        let flow = controller(&provider, &navigator);
        flow.initiate_login().unwrap();

        let err = flow.handle_callback("code", "forged-state").await.unwrap_err();
        assert!(matches!(err, AuthError::Csrf));
        assert_eq!(provider.exchange_calls(), 0);
        assert!(flow.has_pending_login());
    }

    #[tokio::test]
    async fn callback_without_pending_login_is_csrf() {
        let provider = Arc::new(MockIdentityProvider::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let flow = controller(&provider, &navigator);

        assert!(matches!(flow.handle_callback("code", "state").await, Err(AuthError::Csrf)));
        assert!(matches!(
            flow.handle_callback("", "state").await,
            Err(AuthError::InvalidCallback(_))
        ));
        assert_eq!(provider.exchange_calls(), 0);
    }

    /// Validates `OAuthFlowController::handle_callback` behavior for the
    /// replayed callback scenario.
    ///
    /// Assertions:
    /// - The first callback yields a session.
    /// - Replaying the same code and state is rejected without a request.
    #[tokio::test]
    async fn state_is_single_use() {
        let provider = Arc::new(MockIdentityProvider::new());
        provider.push_exchange(Ok(token_response()));
        let navigator = Arc::new(RecordingNavigator::new());
        let flow = controller(&provider, &navigator);
        let state = state_of(&flow.initiate_login().unwrap());

        let session = flow.handle_callback("code", &state).await.unwrap();
        assert_eq!(session.access_token, "at");
        assert!(matches!(flow.handle_callback("code", &state).await, Err(AuthError::Csrf)));
        assert_eq!(provider.exchange_calls(), 1);
    }

    #[tokio::test]
    async fn error_query_abandons_login() {
        let provider = Arc::new(MockIdentityProvider::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let flow = controller(&provider, &navigator);
        flow.initiate_login().unwrap();

        let err = flow
            .handle_callback_query("?error=access_denied&error_description=User%20declined")
            .await
            .unwrap_err();
        assert!(
            matches!(err, AuthError::TokenExchange { ref error, .. } if error == "access_denied")
        );
        assert!(!flow.has_pending_login());
    }

    #[test]
    fn strip_callback_params_replaces_location() {
        let provider = Arc::new(MockIdentityProvider::new());
        let navigator = Arc::new(RecordingNavigator::new());
        controller(&provider, &navigator).strip_callback_params();
        assert_eq!(navigator.replacements(), vec!["http://localhost:5173/callback".to_string()]);
    }
}
