//! Delegated OAuth 2.0 session lifecycle
//!
//! A MentorHub child application does not authenticate users itself. It
//! sends them to the parent application's consent page, exchanges the
//! returned authorization code for tokens, keeps those tokens renewed in the
//! background, and derives permissions from the user's role.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  SessionManager  │  Public façade
//! └────────┬─────────┘
//!          │
//!          ├──► OAuthFlowController  (consent redirect, state check, code exchange)
//!          │         │
//!          │         └──► IdentityProvider  (ParentAuthClient over HTTP)
//!          ├──► TokenStore           (PersistedTokenStore over a SecretBackend)
//!          ├──► RefreshScheduler     (single-slot renewal timer)
//!          └──► LocalAuthProvider    (credential fallback, optional)
//!
//! ┌──────────────────┐
//! │   AuthContext    │  AuthUser + PermissionEvaluator for the application
//! └──────────────────┘
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mentorhub_common::auth::{
//!     AuthContext, MemorySecretStore, Navigator, PersistedTokenStore, SessionManager,
//! };
//! use mentorhub_common::auth::AuthError;
//! use mentorhub_domain::AuthConfig;
//!
//! struct Browser;
//!
//! impl Navigator for Browser {
//!     fn redirect(&self, location: &str) -> Result<(), AuthError> {
//!         println!("open {location}");
//!         Ok(())
//!     }
//!
//!     fn replace_location(&self, _location: &str) {}
//! }
//!
//! # async fn example() -> Result<(), AuthError> {
//! let config = AuthConfig::new(
//!     "https://hub.example.com",
//!     "mentor-app",
//!     "http://localhost:5173/auth/callback",
//! )
//! .with_api_key("child-app-key");
//!
//! let store = PersistedTokenStore::new(
//!     MemorySecretStore::new(),
//!     "mentor-app",
//!     config.storage_attributes(),
//!     config.refresh_token_ttl_secs,
//! );
//! let sessions = SessionManager::builder(config)
//!     .store(Arc::new(store))
//!     .navigator(Arc::new(Browser))
//!     .build()?;
//!
//! sessions.initialize().await?;
//! sessions.login(None).await?;
//!
//! // ... the parent redirects back with ?code=...&state=...
//! sessions.handle_callback_query("?code=abc&state=xyz").await?;
//!
//! let context = AuthContext::new(Arc::clone(&sessions));
//! context.resolve().await?;
//! assert!(context.can_access_route("/dashboard"));
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - **[`types`]**: errors and the parent provider's wire types
//! - **[`state`]**: `state` parameter generation and validation
//! - **[`client`]**: HTTP client for the parent provider
//! - **[`store`]**: token persistence
//! - **[`scheduler`]**: refresh timer
//! - **[`flow`]**: authorization-code flow
//! - **[`session`]**: session manager
//! - **[`context`]**: authenticated-user context

pub mod client;
pub mod context;
pub mod flow;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod store;
pub mod traits;
pub mod types;

// Re-export commonly used types and functions
pub use client::ParentAuthClient;
pub use context::{AuthContext, RouteAccess};
pub use flow::OAuthFlowController;
pub use scheduler::{refresh_delay, RefreshScheduler, SchedulerState};
pub use session::{SessionManager, SessionManagerBuilder};
pub use state::{generate_state, validate_state};
pub use store::{MemorySecretStore, PersistedTokenStore};
pub use traits::{
    IdentityProvider, LocalAuthProvider, Navigator, ProfileSource, SecretBackend, TokenStore,
};
pub use types::{
    AuthError, CallbackParams, Credentials, LoginOutcome, LogoutRequest, StoreError,
    TokenResponse,
};
