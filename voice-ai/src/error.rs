//! Error types for voice AI operations.

use std::fmt;

/// Universal error type that abstracts provider-specific errors into common variants.
///
/// All provider implementations map their native errors to these variants, preserving
/// context while keeping callers provider-agnostic.
#[derive(Debug)]
pub enum Error {
    /// API key or account credentials were rejected by the provider.
    Authentication(String),

    /// Network connectivity issues, DNS failures or a dropped connection.
    /// Typically transient.
    Network(String),

    /// Missing credentials or malformed provider settings.
    Configuration(String),

    /// The provider answered with a business-level failure (invalid number, unknown voice).
    Provider(String),

    /// Operation exceeded the configured timeout.
    Timeout(String),

    /// Requested resource does not exist at the provider.
    NotFound(String),

    /// Provider rate limit exceeded.
    RateLimited { retry_after_seconds: u64 },

    /// Response body did not have the expected shape.
    Deserialization(String),

    /// Catch-all for errors that don't fit other categories.
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Whether trying the same request again later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Timeout(_) | Error::RateLimited { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Authentication(msg) => write!(f, "Authentication failed: {}", msg),
            Error::Network(msg) => write!(f, "Network error: {}", msg),
            Error::Configuration(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::Provider(msg) => write!(f, "Provider error: {}", msg),
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
            Error::NotFound(msg) => write!(f, "Not found: {}", msg),
            Error::RateLimited {
                retry_after_seconds,
            } => {
                write!(f, "Rate limited: retry after {}s", retry_after_seconds)
            }
            Error::Deserialization(msg) => write!(f, "Deserialization error: {}", msg),
            Error::Other(err) => write!(f, "Other error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Other(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<provider_auth::Error> for Error {
    fn from(err: provider_auth::Error) -> Self {
        use provider_auth::error::{ApiKeyErrorKind, HttpErrorKind};
        use provider_auth::ErrorKind;

        let message = err.to_string();
        match &err.error_kind {
            ErrorKind::ApiKey(ApiKeyErrorKind::Rejected) => Error::Authentication(message),
            ErrorKind::ApiKey(ApiKeyErrorKind::InvalidFormat)
            | ErrorKind::Http(HttpErrorKind::BuilderFailed) => Error::Configuration(message),
            ErrorKind::Http(HttpErrorKind::Timeout) => Error::Timeout(message),
            ErrorKind::Http(HttpErrorKind::Network | HttpErrorKind::RequestFailed) => {
                Error::Network(message)
            }
            ErrorKind::Http(HttpErrorKind::RateLimited {
                retry_after_seconds,
            }) => Error::RateLimited {
                retry_after_seconds: retry_after_seconds.unwrap_or(1),
            },
            ErrorKind::Http(HttpErrorKind::Status(404)) => Error::NotFound(message),
            ErrorKind::Http(HttpErrorKind::Status(_)) => Error::Provider(message),
            ErrorKind::Webhook(_) => Error::Provider(message),
        }
    }
}
