//! Shared session lifecycle building blocks for MentorHub child applications.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: role and route permission tables
//! - `runtime`: OAuth flow, token store, refresh scheduling, session manager
//! - `platform`: OS keychain token storage
//! - `test-utils`: in-memory mocks for the auth seams

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod security;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", all(test, feature = "runtime")))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use auth::{
    AuthContext, AuthError, OAuthFlowController, PersistedTokenStore, RefreshScheduler,
    SessionManager, TokenStore,
};
#[cfg(feature = "foundation")]
pub use security::PermissionEvaluator;
#[cfg(feature = "platform")]
pub use security::{KeychainError, KeychainProvider};
