//! Token persistence layered on top of a [`SecretBackend`]
//!
//! A session is split across three entries under one namespace:
//!
//! - `refresh.<ns>`: refresh token, bounded by the refresh lifetime
//! - `profile.<ns>`: user claims, session origin and authentication time
//! - `access.<ns>`: access token, bounded by the access lifetime
//!
//! `save` removes the access entry first and writes it last, so a save that
//! fails halfway never leaves a loadable mix of old and new tokens.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use mentorhub_domain::{Session, SessionOrigin, StorageAttributes, UserClaims};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{SecretBackend, TokenStore};
use super::types::StoreError;

const ACCESS_PREFIX: &str = "access.";
const REFRESH_PREFIX: &str = "refresh.";
const PROFILE_PREFIX: &str = "profile.";

#[derive(Serialize, Deserialize)]
struct AccessEntry {
    token: String,
    expires_at: DateTime<Utc>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(flatten)]
    attributes: StorageAttributes,
}

#[derive(Serialize, Deserialize)]
struct RefreshEntry {
    token: String,
    expires_at: DateTime<Utc>,
    #[serde(flatten)]
    attributes: StorageAttributes,
}

#[derive(Serialize, Deserialize)]
struct ProfileEntry {
    user: UserClaims,
    #[serde(default)]
    origin: SessionOrigin,
    authenticated_at: DateTime<Utc>,
}

/// [`TokenStore`] over any [`SecretBackend`]
pub struct PersistedTokenStore<B: SecretBackend> {
    backend: B,
    namespace: String,
    attributes: StorageAttributes,
    refresh_ttl: Duration,
}

impl<B: SecretBackend> PersistedTokenStore<B> {
    /// Create a store writing entries under `namespace`
    ///
    /// `refresh_ttl_secs` bounds how long the refresh entry stays loadable.
    pub fn new(
        backend: B,
        namespace: impl Into<String>,
        attributes: StorageAttributes,
        refresh_ttl_secs: i64,
    ) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            attributes,
            refresh_ttl: Duration::seconds(refresh_ttl_secs),
        }
    }

    #[must_use]
    pub fn attributes(&self) -> StorageAttributes {
        self.attributes
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn key(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.namespace)
    }

    fn read<T: for<'de> Deserialize<'de>>(&self, prefix: &str) -> Result<Option<T>, StoreError> {
        match self.backend.get_secret(&self.key(prefix))? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, prefix: &str, value: &T) -> Result<(), StoreError> {
        self.backend.set_secret(&self.key(prefix), &serde_json::to_string(value)?)
    }
}

#[async_trait]
impl<B: SecretBackend> TokenStore for PersistedTokenStore<B> {
    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        debug!(namespace = %self.namespace, user = %session.user.id, "Persisting session");
        let now = Utc::now();

        self.backend.delete_secret(&self.key(ACCESS_PREFIX))?;
        self.write(
            REFRESH_PREFIX,
            &RefreshEntry {
                token: session.refresh_token.clone(),
                expires_at: now + self.refresh_ttl,
                attributes: self.attributes,
            },
        )?;
        self.write(
            PROFILE_PREFIX,
            &ProfileEntry {
                user: session.user.clone(),
                origin: session.origin,
                authenticated_at: now,
            },
        )?;
        self.write(
            ACCESS_PREFIX,
            &AccessEntry {
                token: session.access_token.clone(),
                expires_at: session.expires_at,
                session_id: session.session_id.clone(),
                attributes: self.attributes,
            },
        )?;
        Ok(())
    }

    async fn load(&self) -> Result<Option<Session>, StoreError> {
        let now = Utc::now();
        let Some(access) = self.read::<AccessEntry>(ACCESS_PREFIX)? else {
            return Ok(None);
        };
        if access.expires_at <= now {
            debug!(namespace = %self.namespace, "Access entry expired");
            return Ok(None);
        }
        let Some(refresh) = self.read::<RefreshEntry>(REFRESH_PREFIX)? else {
            return Ok(None);
        };
        if refresh.expires_at <= now {
            debug!(namespace = %self.namespace, "Refresh entry expired");
            return Ok(None);
        }
        let Some(profile) = self.read::<ProfileEntry>(PROFILE_PREFIX)? else {
            return Ok(None);
        };

        Ok(Some(Session {
            access_token: access.token,
            refresh_token: refresh.token,
            expires_at: access.expires_at,
            session_id: access.session_id,
            user: profile.user,
            origin: profile.origin,
        }))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        for prefix in [ACCESS_PREFIX, REFRESH_PREFIX, PROFILE_PREFIX] {
            self.backend.delete_secret(&self.key(prefix))?;
        }
        debug!(namespace = %self.namespace, "Session entries cleared");
        Ok(())
    }
}

/// Process-local secret backend
///
/// Sessions do not outlive the process. Also the backend used by tests.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }
}

impl SecretBackend for MemorySecretStore {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_secret(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn delete_secret(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

impl<T: SecretBackend + ?Sized> SecretBackend for std::sync::Arc<T> {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set_secret(key, value)
    }

    fn get_secret(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get_secret(key)
    }

    fn delete_secret(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete_secret(key)
    }
}
