//! HTTP client for the parent identity provider
//!
//! Handles the two token grants and child-session termination:
//! - Authorization code exchange
//! - Token refresh
//! - Logout notification
//!
//! Every request carries the child application's API key in `X-API-Key`.

use std::time::Duration;

use async_trait::async_trait;
use mentorhub_domain::constants::API_KEY_HEADER;
use mentorhub_domain::AuthConfig;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use super::traits::IdentityProvider;
use super::types::{
    AuthError, CodeExchangeRequest, LogoutRequest, ProviderErrorBody, RefreshRequest,
    TokenResponse,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Parent identity provider client
#[derive(Debug, Clone)]
pub struct ParentAuthClient {
    client: Client,
    child_app_id: String,
    api_key: Option<String>,
    redirect_uri: String,
    token_url: Url,
    logout_url: Url,
}

impl ParentAuthClient {
    /// Create a client with a default HTTP stack
    ///
    /// # Errors
    /// Returns `AuthError::Configuration` if the parent URL is invalid, or
    /// `AuthError::Network` if the HTTP client cannot be built
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Self::with_client(config, client)
    }

    /// Create a client over an existing `reqwest::Client`
    ///
    /// # Errors
    /// Returns `AuthError::Configuration` if the parent URL is invalid
    pub fn with_client(config: &AuthConfig, client: Client) -> Result<Self, AuthError> {
        Ok(Self {
            client,
            child_app_id: config.child_app_id.clone(),
            api_key: config.api_key.clone(),
            redirect_uri: config.redirect_uri.clone(),
            token_url: config.token_url()?,
            logout_url: config.logout_url()?,
        })
    }

    fn post_json<T: Serialize + ?Sized>(&self, url: &Url, body: &T) -> RequestBuilder {
        let request = self.client.post(url.clone()).json(body);
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }
}

/// Read `{error, error_description}` from a failed response
async fn provider_error(response: Response) -> ProviderErrorBody {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<ProviderErrorBody>(&text).unwrap_or_else(|_| ProviderErrorBody {
        error: Some(status.canonical_reason().unwrap_or("request_failed").to_string()),
        error_description: (!text.trim().is_empty()).then_some(text),
    })
}

#[async_trait]
impl IdentityProvider for ParentAuthClient {
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, AuthError> {
        let body = CodeExchangeRequest {
            grant_type: "authorization_code",
            code,
            child_app_id: &self.child_app_id,
            redirect_uri,
        };
        debug!(url = %self.token_url, "Exchanging authorization code");
        let response = self.post_json(&self.token_url, &body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = provider_error(response).await;
            warn!(%status, error = ?body.error, "Token exchange rejected");
            return Err(AuthError::TokenExchange {
                error: body.error.unwrap_or_else(|| status.to_string()),
                description: body.error_description,
            });
        }

        response.json::<TokenResponse>().await.map_err(|e| AuthError::TokenExchange {
            error: "invalid_response".to_string(),
            description: Some(e.to_string()),
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::Refresh("no refresh token available".to_string()));
        }
        let body = RefreshRequest {
            grant_type: "refresh_token",
            refresh_token,
            child_app_id: &self.child_app_id,
            redirect_uri: &self.redirect_uri,
        };
        debug!(url = %self.token_url, "Refreshing access token");
        let response = self
            .post_json(&self.token_url, &body)
            .send()
            .await
            .map_err(|e| AuthError::Refresh(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = provider_error(response).await;
            let reason = body
                .error_description
                .or(body.error)
                .unwrap_or_else(|| format!("refresh rejected with status {status}"));
            return Err(AuthError::Refresh(reason));
        }

        response.json::<TokenResponse>().await.map_err(|e| AuthError::Refresh(e.to_string()))
    }

    async fn terminate_session(&self, request: &LogoutRequest) -> Result<(), AuthError> {
        let response = self
            .post_json(&self.logout_url, request)
            .bearer_auth(&request.access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AuthError::Network(format!(
                "logout endpoint answered {}",
                response.status()
            )));
        }
        Ok(())
    }
}
