//! Wiring of the session lifecycle from configuration
//!
//! Chooses the secret backend, shares one HTTP stack between the parent
//! provider client and the embedded database adapter, and hands back the
//! session manager with its auth context.

use std::path::PathBuf;
use std::sync::Arc;

use mentorhub_common::auth::{
    AuthContext, AuthError, IdentityProvider, MemorySecretStore, Navigator, ParentAuthClient,
    PersistedTokenStore, SecretBackend, SessionManager, TokenStore,
};
use mentorhub_common::security::KeychainProvider;
use mentorhub_domain::AuthConfig;
use tracing::info;

use crate::http::HttpClient;
use crate::integrations::SupabaseAuth;
use crate::storage::FileSecretStore;

/// Where persisted tokens live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageChoice {
    /// OS keychain, one item per entry
    Keychain,
    /// JSON file at the given path
    File(PathBuf),
    /// Process memory; nothing survives a restart
    Memory,
}

/// A wired session lifecycle
pub struct AuthRuntime {
    pub sessions: Arc<SessionManager>,
    pub context: Arc<AuthContext>,
    pub store: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for AuthRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthRuntime")
            .field("oauth_enabled", &self.sessions.oauth_enabled())
            .finish_non_exhaustive()
    }
}

fn namespace(config: &AuthConfig) -> String {
    if config.child_app_id.trim().is_empty() {
        "local".to_string()
    } else {
        config.child_app_id.clone()
    }
}

fn backend(config: &AuthConfig, storage: &StorageChoice) -> Arc<dyn SecretBackend> {
    match storage {
        StorageChoice::Keychain => {
            Arc::new(KeychainProvider::new(format!("MentorHub.{}", namespace(config))))
        }
        StorageChoice::File(path) => {
            Arc::new(FileSecretStore::new(path.clone(), config.storage_attributes().secure))
        }
        StorageChoice::Memory => Arc::new(MemorySecretStore::new()),
    }
}

/// Build the session manager and auth context for `config`
///
/// The local-auth fallback and profile lookups are enabled when the
/// configuration names an embedded database.
///
/// # Errors
/// Returns `AuthError::Configuration` if the parent or database URL is
/// invalid, or `AuthError::Network` if the HTTP client cannot be built
pub fn build_runtime(
    config: AuthConfig,
    storage: &StorageChoice,
    navigator: Arc<dyn Navigator>,
    http: HttpClient,
) -> Result<AuthRuntime, AuthError> {
    let store: Arc<dyn TokenStore> = Arc::new(PersistedTokenStore::new(
        backend(&config, storage),
        namespace(&config),
        config.storage_attributes(),
        config.refresh_token_ttl_secs,
    ));
    let local = config
        .local_auth
        .as_ref()
        .map(|local| SupabaseAuth::new(local, http.clone()).map(Arc::new))
        .transpose()?;

    let mut builder =
        SessionManager::builder(config.clone()).store(Arc::clone(&store)).navigator(navigator);
    if config.oauth_configured() {
        let client = ParentAuthClient::with_client(&config, http.inner().clone())?;
        builder = builder.provider(Arc::new(client) as Arc<dyn IdentityProvider>);
    }
    if let Some(local) = &local {
        builder = builder.local_auth(local.clone());
    }
    let sessions = builder.build()?;

    let mut context = AuthContext::new(Arc::clone(&sessions));
    if let Some(local) = local {
        context = context.with_profile_source(local);
    }
    info!(
        oauth = config.oauth_configured(),
        local_auth = config.local_auth.is_some(),
        ?storage,
        "Session lifecycle ready"
    );

    Ok(AuthRuntime { sessions, context: Arc::new(context), store })
}
