//! Embedded database (Supabase) adapter for local sign-in
//!
//! Implements the credential fallback used when no parent application is
//! configured, and the profile-table lookup that supplies roles for sessions
//! issued without one.
//!
//! # Endpoints
//!
//! - `POST {url}/auth/v1/token?grant_type=password`
//! - `POST {url}/auth/v1/token?grant_type=refresh_token`
//! - `POST {url}/auth/v1/logout`
//! - `GET  {url}/rest/v1/{table}?id=eq.{id}&select=*`
//!
//! Every request carries the public key in the `apikey` header. Grants and
//! logout are sent once; only the profile read is retried.

use async_trait::async_trait;
use mentorhub_common::auth::{AuthError, Credentials, LocalAuthProvider, ProfileSource};
use mentorhub_domain::{LocalAuthConfig, Session, SessionOrigin, UserClaims, UserProfile};
use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::http::HttpClient;

const APIKEY_HEADER: &str = "apikey";
const DEFAULT_EXPIRES_IN: i64 = 3600;

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct GrantResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: GrantUser,
}

#[derive(Deserialize)]
struct GrantUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default, alias = "msg")]
    error_description: Option<String>,
}

/// Local credential sign-in and profile lookup against the embedded database
#[derive(Debug, Clone)]
pub struct SupabaseAuth {
    http: HttpClient,
    base_url: Url,
    anon_key: String,
    profile_table: String,
}

impl SupabaseAuth {
    /// # Errors
    /// Returns `AuthError::Configuration` if the database URL is invalid
    pub fn new(config: &LocalAuthConfig, http: HttpClient) -> Result<Self, AuthError> {
        let mut base_url = Url::parse(&config.url).map_err(|e| {
            AuthError::Configuration(format!("invalid database url {}: {e}", config.url))
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http,
            base_url,
            anon_key: config.anon_key.clone(),
            profile_table: config.profile_table.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        self.base_url
            .join(path)
            .map_err(|e| AuthError::Configuration(format!("invalid endpoint {path}: {e}")))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url).header(APIKEY_HEADER, &self.anon_key)
    }

    async fn grant<T: Serialize + ?Sized>(
        &self,
        grant_type: &str,
        body: &T,
    ) -> Result<Result<GrantResponse, ErrorBody>, AuthError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        let response = self.http.send_once(self.request(Method::POST, url).json(body)).await?;

        if !response.status().is_success() {
            return Ok(Err(error_body(response).await));
        }
        let grant = response.json::<GrantResponse>().await.map_err(|e| {
            AuthError::TokenExchange {
                error: "invalid_response".to_string(),
                description: Some(e.to_string()),
            }
        })?;
        Ok(Ok(grant))
    }
}

async fn error_body(response: Response) -> ErrorBody {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorBody>(&text).unwrap_or_else(|_| ErrorBody {
        error: Some(status.as_u16().to_string()),
        error_description: (!text.trim().is_empty()).then_some(text),
    })
}

/// Build a role-less local session from a grant response
///
/// `previous` carries forward the refresh token when the grant omits one.
fn session_from_grant(grant: GrantResponse, previous: Option<&Session>) -> Session {
    let full_name = grant
        .user
        .user_metadata
        .get("full_name")
        .or_else(|| grant.user.user_metadata.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let email = grant
        .user
        .email
        .or_else(|| previous.map(|s| s.user.email.clone()))
        .unwrap_or_default();

    let mut user = UserClaims::new(grant.user.id, email);
    user.full_name = full_name;
    let refresh_token = grant
        .refresh_token
        .or_else(|| previous.map(|s| s.refresh_token.clone()))
        .unwrap_or_default();

    Session::new(
        grant.access_token,
        refresh_token,
        grant.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
        None,
        user,
    )
    .with_origin(SessionOrigin::Local)
}

#[async_trait]
impl LocalAuthProvider for SupabaseAuth {
    #[instrument(skip_all, fields(email = %credentials.email))]
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let body = PasswordGrant { email: &credentials.email, password: &credentials.password };
        match self.grant("password", &body).await? {
            Ok(grant) => {
                let session = session_from_grant(grant, None);
                info!(user = %session.user.id, "Signed in with local credentials");
                Ok(session)
            }
            Err(body) => {
                warn!(error = ?body.error, "Local sign-in rejected");
                Err(AuthError::TokenExchange {
                    error: body.error.unwrap_or_else(|| "invalid_grant".to_string()),
                    description: body.error_description,
                })
            }
        }
    }

    async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
        if session.refresh_token.is_empty() {
            return Err(AuthError::Refresh("no refresh token available".to_string()));
        }
        let body = RefreshGrant { refresh_token: &session.refresh_token };
        match self.grant("refresh_token", &body).await {
            Ok(Ok(grant)) => {
                let mut renewed = session_from_grant(grant, Some(session));
                renewed.user = session.user.clone();
                debug!(user = %renewed.user.id, "Local session refreshed");
                Ok(renewed)
            }
            Ok(Err(body)) => Err(AuthError::Refresh(
                body.error_description.or(body.error).unwrap_or_else(|| "rejected".to_string()),
            )),
            Err(e) => Err(AuthError::Refresh(e.to_string())),
        }
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        let url = self.endpoint("auth/v1/logout")?;
        let response = self
            .http
            .send_once(self.request(Method::POST, url).bearer_auth(&session.access_token))
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(AuthError::Network(format!("logout returned {status}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileSource for SupabaseAuth {
    #[instrument(skip_all, fields(user = %session.user.id))]
    async fn fetch_profile(&self, session: &Session) -> Result<UserProfile, AuthError> {
        let mut url = self.endpoint(&format!("rest/v1/{}", self.profile_table))?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{}", session.user.id))
            .append_pair("select", "*");

        let response = self
            .http
            .send_idempotent(self.request(Method::GET, url).bearer_auth(&session.access_token))
            .await
            .map_err(|e| AuthError::ProfileFetch(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(AuthError::ProfileFetch(format!("profile table returned {status}")));
        }

        let rows = response
            .json::<Vec<UserProfile>>()
            .await
            .map_err(|e| AuthError::ProfileFetch(e.to_string()))?;
        let id = &session.user.id;
        rows.into_iter()
            .next()
            .ok_or_else(|| AuthError::ProfileFetch(format!("no profile row for {id}")))
    }
}
