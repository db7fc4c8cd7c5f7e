//! Standard Bearer token authentication.

use reqwest::header::{HeaderMap, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};

use super::auth::sensitive_header;
use super::{ApiKeyProvider, AuthMethod, ProviderAuth};
use crate::error::Error;

/// Standard Bearer token authentication.
///
/// Uses the standard `Authorization: Bearer <token>` header pattern.
pub struct BearerTokenAuth {
    provider: ApiKeyProvider,
    token: SecretString,
}

impl BearerTokenAuth {
    /// Create a new Bearer token authenticator.
    pub fn new(provider: ApiKeyProvider, token: SecretString) -> Self {
        Self { provider, token }
    }
}

impl ProviderAuth for BearerTokenAuth {
    fn provider(&self) -> ApiKeyProvider {
        self.provider
    }

    fn auth_method(&self) -> AuthMethod {
        AuthMethod::BearerToken
    }

    fn auth_headers(&self) -> Result<HeaderMap, Error> {
        let token = self.token.expose_secret();
        if token.trim().is_empty() {
            return sensitive_header(AUTHORIZATION.as_str(), token);
        }
        sensitive_header(AUTHORIZATION.as_str(), &format!("Bearer {token}"))
    }
}
