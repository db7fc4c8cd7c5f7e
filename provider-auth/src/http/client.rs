//! Authenticated HTTP client builder with middleware.

use std::time::Duration;

use reqwest_middleware::ClientBuilder;
use reqwest_retry::RetryTransientMiddleware;

use super::RetryAfterPolicy;
use crate::api_key::ProviderAuth;
use crate::error::Error;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum number of retries. Zero disables the retry middleware entirely.
    pub max_retries: u32,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            max_retries: 2,
            user_agent: format!("trainer-voice/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Authenticated HTTP client with middleware.
pub type AuthenticatedClient = reqwest_middleware::ClientWithMiddleware;

/// Builder for creating authenticated HTTP clients with middleware.
///
/// Provides a fluent API for constructing HTTP clients with:
/// - Authentication headers applied to every request
/// - Retry logic for transient failures (5xx, 429, connection errors)
/// - Timeout configuration
pub struct AuthenticatedClientBuilder {
    config: HttpClientConfig,
    auth: Option<Box<dyn ProviderAuth>>,
}

impl AuthenticatedClientBuilder {
    /// Create a new client builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
            auth: None,
        }
    }

    /// Set the authentication provider.
    pub fn with_auth(mut self, auth: Box<dyn ProviderAuth>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.config.user_agent = user_agent;
        self
    }

    /// Build the configured HTTP client.
    ///
    /// Fails when the credentials cannot be turned into headers, so a misconfigured
    /// provider is caught at startup instead of on the first call.
    pub fn build(self) -> Result<AuthenticatedClient, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent);

        if let Some(auth) = &self.auth {
            log::debug!(
                "Building HTTP client for {} ({:?})",
                auth.provider().as_str(),
                auth.auth_method()
            );
            builder = builder.default_headers(auth.auth_headers()?);
        }

        let client = builder.build()?;

        let mut client_builder = ClientBuilder::new(client);
        if self.config.max_retries > 0 {
            let retry_policy = RetryAfterPolicy::new(self.config.max_retries);
            client_builder =
                client_builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
        }

        Ok(client_builder.build())
    }
}

impl Default for AuthenticatedClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_key::{ApiKeyAuth, ApiKeyProvider};
    use secrecy::SecretString;

    #[test]
    fn test_builder_default() {
        let builder = AuthenticatedClientBuilder::new();
        assert_eq!(builder.config.timeout, Duration::from_secs(20));
        assert_eq!(builder.config.max_retries, 2);
    }

    #[test]
    fn test_builder_with_timeout() {
        let builder = AuthenticatedClientBuilder::new().with_timeout(Duration::from_secs(60));
        assert_eq!(builder.config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_builder_with_max_retries() {
        let builder = AuthenticatedClientBuilder::new().with_max_retries(0);
        assert_eq!(builder.config.max_retries, 0);
    }

    #[tokio::test]
    async fn test_build_client() {
        let builder = AuthenticatedClientBuilder::new();
        let result = builder.build();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_build_rejects_empty_api_key() {
        let auth = ApiKeyAuth::new(
            ApiKeyProvider::Deepgram,
            SecretString::new(String::new()),
        );
        let result = AuthenticatedClientBuilder::new()
            .with_auth(Box::new(auth))
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_auth_header_is_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .match_header("authorization", "Token dg_key")
            .with_status(200)
            .create_async()
            .await;

        let auth = ApiKeyAuth::new(
            ApiKeyProvider::Deepgram,
            SecretString::new("dg_key".to_string()),
        );
        let client = AuthenticatedClientBuilder::new()
            .with_auth(Box::new(auth))
            .build()
            .unwrap();

        let response = client
            .get(format!("{}/ping", server.url()))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        mock.assert_async().await;
    }
}
