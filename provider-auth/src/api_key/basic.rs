//! HTTP Basic authentication, used by Twilio's REST API (account SID + auth token).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderMap, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};

use super::auth::sensitive_header;
use super::{ApiKeyProvider, AuthMethod, ProviderAuth};
use crate::error::{api_key_error, ApiKeyErrorKind, Error};

pub struct BasicAuth {
    provider: ApiKeyProvider,
    username: String,
    password: SecretString,
}

impl BasicAuth {
    pub fn new(provider: ApiKeyProvider, username: String, password: SecretString) -> Self {
        Self {
            provider,
            username,
            password,
        }
    }
}

impl ProviderAuth for BasicAuth {
    fn provider(&self) -> ApiKeyProvider {
        self.provider
    }

    fn auth_method(&self) -> AuthMethod {
        AuthMethod::BasicAuth {
            username: self.username.clone(),
        }
    }

    fn auth_headers(&self) -> Result<HeaderMap, Error> {
        if self.username.trim().is_empty() {
            return Err(api_key_error(
                ApiKeyErrorKind::InvalidFormat,
                "Basic auth username is empty",
            ));
        }

        let credentials = format!("{}:{}", self.username, self.password.expose_secret());
        sensitive_header(
            AUTHORIZATION.as_str(),
            &format!("Basic {}", STANDARD.encode(credentials)),
        )
    }
}
