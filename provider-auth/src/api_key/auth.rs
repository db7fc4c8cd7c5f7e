//! API key authentication trait and implementation.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::{api_key_error, ApiKeyErrorKind, Error};

/// Known API key providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyProvider {
    Twilio,
    Deepgram,
    ElevenLabs,
    OpenAi,
}

impl ApiKeyProvider {
    /// Get the provider identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiKeyProvider::Twilio => "twilio",
            ApiKeyProvider::Deepgram => "deepgram",
            ApiKeyProvider::ElevenLabs => "elevenlabs",
            ApiKeyProvider::OpenAi => "openai",
        }
    }
}

/// Authentication method for HTTP requests.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthMethod {
    /// Custom header with optional prefix (e.g., "Authorization: Token xxx")
    ApiKeyHeader {
        header_name: String,
        prefix: Option<String>,
    },
    /// Standard Bearer token
    BearerToken,
    /// HTTP Basic authentication
    BasicAuth { username: String },
}

/// Trait for authenticating HTTP requests with API keys or bearer tokens.
///
/// Implementations handle provider-specific authentication patterns like:
/// - Deepgram: `Authorization: Token xxx`
/// - ElevenLabs: `xi-api-key: xxx`
/// - OpenAI: `Authorization: Bearer xxx`
/// - Twilio: `Authorization: Basic base64(sid:token)`
pub trait ProviderAuth: Send + Sync {
    /// Get the provider identifier.
    fn provider(&self) -> ApiKeyProvider;

    /// Get the authentication method used by this provider.
    fn auth_method(&self) -> AuthMethod;

    /// Headers to attach to every request sent to the provider.
    /// Values are marked sensitive so they never show up in debug output.
    fn auth_headers(&self) -> Result<HeaderMap, Error>;
}

/// Builds a single sensitive header, rejecting keys that cannot be sent over HTTP.
pub(crate) fn sensitive_header(name: &str, value: &str) -> Result<HeaderMap, Error> {
    if value.trim().is_empty() {
        return Err(api_key_error(
            ApiKeyErrorKind::InvalidFormat,
            &format!("Empty credential for header {name}"),
        ));
    }

    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
        api_key_error(
            ApiKeyErrorKind::InvalidFormat,
            &format!("Invalid header name: {name}"),
        )
    })?;
    let mut header_value = HeaderValue::from_str(value).map_err(|_| {
        api_key_error(
            ApiKeyErrorKind::InvalidFormat,
            &format!("Credential for {name} contains invalid characters"),
        )
    })?;
    header_value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(header_name, header_value);
    Ok(headers)
}

/// API key authentication implementation.
///
/// The header name and prefix are fixed per provider.
///
/// # Examples
///
/// ```rust,ignore
/// // Deepgram: Authorization: Token xxx
/// let auth = ApiKeyAuth::new(ApiKeyProvider::Deepgram, SecretString::new(key));
///
/// // ElevenLabs: xi-api-key: xxx
/// let auth = ApiKeyAuth::new(ApiKeyProvider::ElevenLabs, SecretString::new(key));
/// ```
pub struct ApiKeyAuth {
    provider: ApiKeyProvider,
    api_key: SecretString,
    header_name: String,
    prefix: Option<String>,
}

impl ApiKeyAuth {
    pub fn new(provider: ApiKeyProvider, api_key: SecretString) -> Self {
        let (header_name, prefix) = match provider {
            ApiKeyProvider::Deepgram => ("Authorization", Some("Token")),
            ApiKeyProvider::ElevenLabs => ("xi-api-key", None),
            ApiKeyProvider::OpenAi | ApiKeyProvider::Twilio => ("Authorization", Some("Bearer")),
        };

        Self {
            provider,
            api_key,
            header_name: header_name.to_string(),
            prefix: prefix.map(str::to_string),
        }
    }
}

impl ProviderAuth for ApiKeyAuth {
    fn provider(&self) -> ApiKeyProvider {
        self.provider
    }

    fn auth_method(&self) -> AuthMethod {
        AuthMethod::ApiKeyHeader {
            header_name: self.header_name.clone(),
            prefix: self.prefix.clone(),
        }
    }

    fn auth_headers(&self) -> Result<HeaderMap, Error> {
        let key = self.api_key.expose_secret();
        if key.trim().is_empty() {
            return sensitive_header(&self.header_name, key);
        }

        let auth_value = match &self.prefix {
            Some(prefix) => format!("{} {}", prefix, key),
            None => key.to_string(),
        };

        sensitive_header(&self.header_name, &auth_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::new(value.to_string())
    }

    #[test]
    fn test_api_key_provider_as_str() {
        assert_eq!(ApiKeyProvider::Deepgram.as_str(), "deepgram");
        assert_eq!(ApiKeyProvider::ElevenLabs.as_str(), "elevenlabs");
    }

    #[test]
    fn test_deepgram_uses_token_prefix() {
        let auth = ApiKeyAuth::new(ApiKeyProvider::Deepgram, secret("dg_key"));
        let headers = auth.auth_headers().unwrap();

        assert_eq!(headers.get("authorization").unwrap(), "Token dg_key");
        assert!(headers.get("authorization").unwrap().is_sensitive());
    }

    #[test]
    fn test_elevenlabs_uses_custom_header_without_prefix() {
        let auth = ApiKeyAuth::new(ApiKeyProvider::ElevenLabs, secret("el_key"));

        assert_eq!(
            auth.auth_method(),
            AuthMethod::ApiKeyHeader {
                header_name: "xi-api-key".to_string(),
                prefix: None
            }
        );
        assert_eq!(auth.auth_headers().unwrap().get("xi-api-key").unwrap(), "el_key");
    }

    #[test]
    fn test_empty_key_is_invalid_format() {
        let auth = ApiKeyAuth::new(ApiKeyProvider::Deepgram, secret("  "));
        let err = auth.auth_headers().unwrap_err();

        assert_eq!(
            err.error_kind,
            crate::ErrorKind::ApiKey(ApiKeyErrorKind::InvalidFormat)
        );
    }
}
