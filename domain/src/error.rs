//! Error types for the `domain` layer.
use entity_api::error::{EntityApiErrorKind, Error as EntityApiError};
use provider_auth::error::Error as ProviderAuthError;
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. The intent is to translate errors between layers while maintaining
/// layer boundaries. Ex. `domain` is dependent on `entity_api`, and `web` is dependent on `domain`.
/// but `web` should not be dependent, directly, on `entity_api`. Each layer is free to define its own
/// error kinds to whatever richness needed at that layer. Ultimately the various `error_kind`s are used
/// by `web` to return appropriate HTTP status codes and by the agent to pick a spoken reply.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    Scheduling(SchedulingErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Entity(EntityErrorKind),
    Config,
    Other(String),
}

/// Enum representing the various kinds of entity errors that can bubble up from the "Entity" layer (`entity_api` and `entity`).
/// These errors are translated from the `entity_api` layer to the `domain` layer and reduced to a subset of error kinds
/// that are relevant to the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum EntityErrorKind {
    NotFound,
    Invalid,
    Conflict,
    Other(String),
}

/// Business rule violations. The message is safe to show (or say) to a caller.
#[derive(Debug, PartialEq)]
pub enum SchedulingErrorKind {
    Validation(String),
    Conflict(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    /// The record store could not be reached or failed mid-query.
    Store,
    Timeout,
    Other(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Scheduling(SchedulingErrorKind::Validation(
                message.into(),
            )),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Scheduling(SchedulingErrorKind::Conflict(
                message.into(),
            )),
        }
    }

    pub fn not_found() -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(
                EntityErrorKind::NotFound,
            )),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error {
            source: Some(message.into().into()),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self.error_kind,
            DomainErrorKind::Scheduling(SchedulingErrorKind::Validation(_))
                | DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Invalid))
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self.error_kind,
            DomainErrorKind::Scheduling(SchedulingErrorKind::Conflict(_))
                | DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Conflict))
        )
    }

    pub fn is_not_found(&self) -> bool {
        self.error_kind
            == DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::NotFound))
    }

    /// Transient external failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.error_kind,
            DomainErrorKind::External(
                ExternalErrorKind::Network | ExternalErrorKind::Store | ExternalErrorKind::Timeout
            )
        )
    }

    /// Caller-facing message for validation and conflict errors.
    pub fn user_message(&self) -> Option<&str> {
        match &self.error_kind {
            DomainErrorKind::Scheduling(SchedulingErrorKind::Validation(message))
            | DomainErrorKind::Scheduling(SchedulingErrorKind::Conflict(message)) => {
                Some(message.as_str())
            }
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `entity_api` layer to the `domain` layer.
impl From<EntityApiError> for Error {
    fn from(err: EntityApiError) -> Self {
        let error_kind = match err.error_kind {
            EntityApiErrorKind::RecordNotFound => {
                DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::NotFound))
            }
            EntityApiErrorKind::InvalidQueryTerm | EntityApiErrorKind::ValidationError => {
                DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Invalid))
            }
            EntityApiErrorKind::Conflict => {
                DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Conflict))
            }
            EntityApiErrorKind::SystemError => DomainErrorKind::External(ExternalErrorKind::Store),
            _ => DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Other(
                "EntityErrorKind".to_string(),
            ))),
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<voice_ai::Error> for Error {
    fn from(err: voice_ai::Error) -> Self {
        let error_kind = match &err {
            voice_ai::Error::Network(_) | voice_ai::Error::RateLimited { .. } => {
                DomainErrorKind::External(ExternalErrorKind::Network)
            }
            voice_ai::Error::Timeout(_) => DomainErrorKind::External(ExternalErrorKind::Timeout),
            voice_ai::Error::Configuration(_) => DomainErrorKind::Internal(InternalErrorKind::Config),
            other => DomainErrorKind::External(ExternalErrorKind::Other(other.to_string())),
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<ProviderAuthError> for Error {
    fn from(err: ProviderAuthError) -> Self {
        voice_ai::Error::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_conflict_is_a_conflict() {
        let err: Error = EntityApiError {
            source: None,
            error_kind: EntityApiErrorKind::Conflict,
        }
        .into();

        assert!(err.is_conflict());
        assert!(!err.is_validation());
    }

    #[test]
    fn entity_system_error_is_retryable() {
        let err: Error = EntityApiError {
            source: None,
            error_kind: EntityApiErrorKind::SystemError,
        }
        .into();

        assert!(err.is_retryable());
    }

    #[test]
    fn record_not_found_is_not_found() {
        let err: Error = EntityApiError {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotFound,
        }
        .into();

        assert!(err.is_not_found());
        assert!(!err.is_retryable());
    }

    #[test]
    fn provider_timeout_is_retryable() {
        let err: Error = voice_ai::Error::Timeout("20s".to_string()).into();
        assert!(err.is_retryable());
    }

    #[test]
    fn validation_message_is_exposed() {
        let err = Error::validation("Sessions must be booked during business hours");
        assert_eq!(
            err.user_message(),
            Some("Sessions must be booked during business hours")
        );
        assert!(err.is_validation());
    }
}
