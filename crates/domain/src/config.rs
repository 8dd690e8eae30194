//! Configuration structures for the delegated authentication core
//!
//! `AuthConfig` describes how this child application talks to the parent
//! identity provider. It is usually produced by the infra config loader
//! (environment first, then a config file) and validated before the OAuth
//! flow is started.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    CONSENT_PATH, DEFAULT_ACCESS_TOKEN_TTL_SECS, DEFAULT_REFRESH_TOKEN_TTL_SECS, DEFAULT_SCOPES,
    DEFAULT_SIGN_IN_PATH, LOGOUT_PATH, MIN_REFRESH_DELAY_SECS, REFRESH_LEAD_SECS, TOKEN_PATH,
};
use crate::errors::{MentorHubError, Result};

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    #[default]
    Development,
    Test,
}

impl Environment {
    /// Parse an environment name (`production`/`prod`, `development`/`dev`,
    /// `test`). Unknown values fall back to development.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "test" | "testing" => Self::Test,
            _ => Self::Development,
        }
    }

    #[must_use]
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Persistence attributes for token entries.
    ///
    /// Production storage is secure and strict; every other environment
    /// relaxes both so plain-HTTP local setups keep working.
    #[must_use]
    pub fn storage_attributes(self) -> StorageAttributes {
        if self.is_production() {
            StorageAttributes { secure: true, same_site: SameSite::Strict }
        } else {
            StorageAttributes { secure: false, same_site: SameSite::Lax }
        }
    }
}

/// Same-site policy attached to persisted token entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
}

/// Attributes applied to persisted token entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageAttributes {
    pub secure: bool,
    pub same_site: SameSite,
}

/// Embedded database auth used as the fallback sign-in path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAuthConfig {
    /// Base URL of the embedded database project
    pub url: String,
    /// Public (anonymous) API key
    pub anon_key: String,
    /// Table holding user profiles
    #[serde(default = "default_profile_table")]
    pub profile_table: String,
}

fn default_profile_table() -> String {
    "users".to_string()
}

/// Parent identity provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base URL of the parent application (identity provider)
    #[serde(default)]
    pub parent_app_url: String,

    /// Identifier of this child application at the parent
    #[serde(default)]
    pub child_app_id: String,

    /// API key sent as `X-API-Key` to the token endpoint
    #[serde(default)]
    pub api_key: Option<String>,

    /// Callback URI registered with the parent
    #[serde(default)]
    pub redirect_uri: String,

    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    #[serde(default)]
    pub environment: Environment,

    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: i64,

    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: i64,

    /// Renew this many seconds before the access token expires
    #[serde(default = "default_refresh_lead")]
    pub refresh_lead_secs: i64,

    /// Never schedule a renewal sooner than this
    #[serde(default = "default_min_refresh_delay")]
    pub min_refresh_delay_secs: i64,

    /// Where the user lands after logout or a torn-down session
    #[serde(default = "default_sign_in_path")]
    pub sign_in_path: String,

    #[serde(default)]
    pub local_auth: Option<LocalAuthConfig>,
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect()
}

const fn default_access_ttl() -> i64 {
    DEFAULT_ACCESS_TOKEN_TTL_SECS
}

const fn default_refresh_ttl() -> i64 {
    DEFAULT_REFRESH_TOKEN_TTL_SECS
}

const fn default_refresh_lead() -> i64 {
    REFRESH_LEAD_SECS
}

const fn default_min_refresh_delay() -> i64 {
    MIN_REFRESH_DELAY_SECS
}

fn default_sign_in_path() -> String {
    DEFAULT_SIGN_IN_PATH.to_string()
}

impl AuthConfig {
    /// Create a configuration with default scopes and lifetimes
    #[must_use]
    pub fn new(
        parent_app_url: impl Into<String>,
        child_app_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            parent_app_url: parent_app_url.into(),
            child_app_id: child_app_id.into(),
            api_key: None,
            redirect_uri: redirect_uri.into(),
            scopes: default_scopes(),
            environment: Environment::default(),
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
            refresh_lead_secs: REFRESH_LEAD_SECS,
            min_refresh_delay_secs: MIN_REFRESH_DELAY_SECS,
            sign_in_path: default_sign_in_path(),
            local_auth: None,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn with_local_auth(mut self, local_auth: LocalAuthConfig) -> Self {
        self.local_auth = Some(local_auth);
        self
    }

    /// Whether the parent identity provider is configured at all.
    ///
    /// The session manager uses this to decide between the OAuth path and the
    /// local credential fallback.
    #[must_use]
    pub fn oauth_configured(&self) -> bool {
        !self.child_app_id.trim().is_empty() && !self.parent_app_url.trim().is_empty()
    }

    /// Check that the OAuth flow can be started
    ///
    /// # Errors
    /// Returns `MentorHubError::Config` when the application id or parent URL
    /// is missing, or when a URL does not parse.
    pub fn validate(&self) -> Result<()> {
        if self.child_app_id.trim().is_empty() {
            return Err(MentorHubError::Config("child application id is not configured".into()));
        }
        if self.parent_app_url.trim().is_empty() {
            return Err(MentorHubError::Config("parent application URL is not configured".into()));
        }
        self.parent_url()?;
        Url::parse(&self.redirect_uri).map_err(|e| {
            MentorHubError::Config(format!("invalid redirect URI '{}': {e}", self.redirect_uri))
        })?;
        Ok(())
    }

    fn parent_url(&self) -> Result<Url> {
        Url::parse(self.parent_app_url.trim_end_matches('/')).map_err(|e| {
            MentorHubError::Config(format!(
                "invalid parent application URL '{}': {e}",
                self.parent_app_url
            ))
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self.parent_app_url.trim_end_matches('/');
        Url::parse(&format!("{base}{path}"))
            .map_err(|e| MentorHubError::Config(format!("invalid endpoint URL for {path}: {e}")))
    }

    /// Consent page the browser is redirected to
    ///
    /// # Errors
    /// Returns `MentorHubError::Config` if the parent URL is invalid
    pub fn consent_url(&self) -> Result<Url> {
        self.endpoint(CONSENT_PATH)
    }

    /// Token endpoint for both grant types
    ///
    /// # Errors
    /// Returns `MentorHubError::Config` if the parent URL is invalid
    pub fn token_url(&self) -> Result<Url> {
        self.endpoint(TOKEN_PATH)
    }

    /// Child-session termination endpoint
    ///
    /// # Errors
    /// Returns `MentorHubError::Config` if the parent URL is invalid
    pub fn logout_url(&self) -> Result<Url> {
        self.endpoint(LOGOUT_PATH)
    }

    /// Scopes as a single space-separated string
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    #[must_use]
    pub fn storage_attributes(&self) -> StorageAttributes {
        self.environment.storage_attributes()
    }
}
