//! Platform keychain as a secret backend
//!
//! Stores token entries in macOS Keychain Access, Windows Credential Manager
//! or the Linux Secret Service, one keychain item per entry key.
//!
//! ## Usage
//!
//! ```no_run
//! use mentorhub_common::auth::PersistedTokenStore;
//! use mentorhub_common::security::KeychainProvider;
//! use mentorhub_domain::Environment;
//!
//! let store = PersistedTokenStore::new(
//!     KeychainProvider::new("MentorHub.mentor-app"),
//!     "mentor-app",
//!     Environment::Production.storage_attributes(),
//!     30 * 24 * 3600,
//! );
//! ```

use keyring::Entry;
use thiserror::Error;
use tracing::debug;

use crate::auth::traits::SecretBackend;
use crate::auth::types::StoreError;

/// Keychain-backed secret storage for one service name
#[derive(Debug, Clone)]
pub struct KeychainProvider {
    service_name: String,
}

impl KeychainProvider {
    /// # Arguments
    /// * `service_name` - Keychain service, e.g. `"MentorHub.mentor-app"`
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Store a secret
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if keychain access fails
    pub fn store(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Storing secret in keychain");
        self.entry(key)?.set_password(value).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to store secret for {key}: {e}"))
        })
    }

    /// Retrieve a secret
    ///
    /// # Errors
    /// Returns `KeychainError::NotFound` if the secret doesn't exist, or
    /// `KeychainError::AccessFailed` if keychain access fails
    pub fn retrieve(&self, key: &str) -> Result<String, KeychainError> {
        self.entry(key)?.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => KeychainError::NotFound,
            other => KeychainError::AccessFailed(format!("Failed to read {key}: {other}")),
        })
    }

    /// Delete a secret (idempotent)
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if keychain access fails
    pub fn remove(&self, key: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Deleting secret from keychain");
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                Err(KeychainError::AccessFailed(format!("Failed to delete secret for {key}: {e}")))
            }
        }
    }

    fn entry(&self, account: &str) -> Result<Entry, KeychainError> {
        Entry::new(&self.service_name, account).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to create keychain entry: {e}"))
        })
    }
}

impl SecretBackend for KeychainProvider {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), StoreError> {
        Ok(self.store(key, value)?)
    }

    fn get_secret(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.retrieve(key) {
            Ok(secret) => Ok(Some(secret)),
            Err(KeychainError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_secret(&self, key: &str) -> Result<(), StoreError> {
        Ok(self.remove(key)?)
    }
}

/// Keychain error types
#[derive(Debug, Error)]
pub enum KeychainError {
    /// Keychain access failed (permission denied, not available, etc.)
    #[error("Keychain access failed: {0}")]
    AccessFailed(String),

    /// Entry not found in keychain
    #[error("Entry not found")]
    NotFound,
}

impl From<KeychainError> for StoreError {
    fn from(err: KeychainError) -> Self {
        Self::Access(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_keeps_service_name() {
        let keychain = KeychainProvider::new("MentorHub.test");
        assert_eq!(keychain.service_name(), "MentorHub.test");
    }

    #[test]
    fn access_failure_maps_to_store_access() {
        let err: StoreError = KeychainError::AccessFailed("locked".into()).into();
        assert!(matches!(err, StoreError::Access(ref msg) if msg.contains("locked")));
    }
}
