//! Shared HTTP stack for the auth adapters
//!
//! Token grants and logout calls consume single-use credentials, so they go
//! out exactly once through [`HttpClient::send_once`]. Reads may opt into
//! retries with [`HttpClient::send_idempotent`], which only repeats requests
//! whose method is idempotent.

use std::time::Duration;

use mentorhub_common::auth::AuthError;
use reqwest::{Client as ReqwestClient, Method, Request, RequestBuilder, Response};
use tracing::debug;

/// reqwest client plus the retry budget for idempotent reads
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    read_attempts: usize,
    read_backoff: Duration,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// # Errors
    /// Returns `AuthError::Network` if the TLS backend cannot be initialised
    pub fn new() -> Result<Self, AuthError> {
        Self::builder().build()
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// The underlying client, for collaborators that issue their own requests
    #[must_use]
    pub fn inner(&self) -> &ReqwestClient {
        &self.client
    }

    /// Send a request exactly once
    ///
    /// # Errors
    /// Returns `AuthError::Network` if no response was received
    pub async fn send_once(&self, builder: RequestBuilder) -> Result<Response, AuthError> {
        self.execute(builder.build()?).await
    }

    /// Send a read, retrying server errors and transient failures
    ///
    /// Requests with a non-idempotent method, or a body that cannot be
    /// replayed, are sent once. Client errors are never retried. Backoff
    /// doubles after each failed attempt.
    ///
    /// # Errors
    /// Returns `AuthError::Network` if the final attempt received no response
    pub async fn send_idempotent(&self, builder: RequestBuilder) -> Result<Response, AuthError> {
        let request = builder.build()?;
        if !request.method().is_idempotent() {
            debug!(method = %request.method(), "Not retrying non-idempotent request");
            return self.execute(request).await;
        }

        let mut remaining = self.read_attempts.saturating_sub(1);
        let mut delay = self.read_backoff;
        while remaining > 0 {
            let Some(attempt) = request.try_clone() else {
                break;
            };
            match self.client.execute(attempt).await {
                Ok(response) if !response.status().is_server_error() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    debug!(url = %request.url(), %status, remaining, "Retrying read");
                }
                Err(err) if is_transient(&err) => {
                    debug!(url = %request.url(), error = %err, remaining, "Retrying read");
                }
                Err(err) => return Err(err.into()),
            }
            remaining -= 1;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            delay = delay.saturating_mul(2);
        }
        self.execute(request).await
    }

    async fn execute(&self, request: Request) -> Result<Response, AuthError> {
        let method = request.method().clone();
        let url = request.url().clone();
        match self.client.execute(request).await {
            Ok(response) => {
                debug!(%method, %url, status = %response.status(), "HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(%method, %url, error = %err, "HTTP request failed");
                Err(err.into())
            }
        }
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Builder for [`HttpClient`]
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    read_attempts: usize,
    read_backoff: Duration,
    user_agent: String,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            read_attempts: 3,
            read_backoff: Duration::from_millis(200),
            user_agent: concat!("mentorhub/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpClientBuilder {
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts for idempotent reads, including the first
    #[must_use]
    pub fn read_attempts(mut self, attempts: usize) -> Self {
        self.read_attempts = attempts.max(1);
        self
    }

    /// Delay before the first read retry
    #[must_use]
    pub fn read_backoff(mut self, backoff: Duration) -> Self {
        self.read_backoff = backoff;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// # Errors
    /// Returns `AuthError::Network` if the TLS backend cannot be initialised
    pub fn build(self) -> Result<HttpClient, AuthError> {
        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .no_proxy()
            .build()?;
        Ok(HttpClient {
            client,
            read_attempts: self.read_attempts,
            read_backoff: self.read_backoff,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use reqwest::StatusCode;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, Request as MockRequest, ResponseTemplate};

    use super::*;

    fn client() -> HttpClient {
        HttpClient::builder().read_backoff(Duration::from_millis(5)).build().expect("http client")
    }

    #[tokio::test]
    async fn send_once_does_not_retry_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let http = client();
        let response = http.send_once(http.request(Method::POST, server.uri())).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn idempotent_reads_retry_until_success() {
        let server = MockServer::start().await;
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        Mock::given(method("GET"))
            .respond_with(move |_: &MockRequest| {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    ResponseTemplate::new(502)
                } else {
                    ResponseTemplate::new(200)
                }
            })
            .expect(3)
            .mount(&server)
            .await;

        let http = client();
        let response = http.send_idempotent(http.request(Method::GET, server.uri())).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn idempotent_reads_return_last_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let http = HttpClient::builder()
            .read_attempts(2)
            .read_backoff(Duration::ZERO)
            .build()
            .expect("http client");
        let response = http.send_idempotent(http.request(Method::GET, server.uri())).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn post_is_never_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let http = client();
        let response =
            http.send_idempotent(http.request(Method::POST, server.uri())).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let http = client();
        let response = http.send_idempotent(http.request(Method::GET, server.uri())).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let http = client();
        let url = format!("http://{addr}");
        let result = http.send_idempotent(http.request(Method::GET, &url)).await;
        assert!(matches!(result, Err(AuthError::Network(_))), "{result:?}");
    }
}
