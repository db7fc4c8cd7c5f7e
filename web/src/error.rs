use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use domain::error::{
    DomainErrorKind, EntityErrorKind, Error as DomainError, ExternalErrorKind, InternalErrorKind,
    SchedulingErrorKind,
};

use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl Error {
    fn status_and_message(&self) -> (StatusCode, String) {
        match &self.0.error_kind {
            DomainErrorKind::Scheduling(SchedulingErrorKind::Validation(message)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, message.clone())
            }
            DomainErrorKind::Scheduling(SchedulingErrorKind::Conflict(message)) => {
                (StatusCode::CONFLICT, message.clone())
            }
            DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                InternalErrorKind::Entity(entity_error_kind) => match entity_error_kind {
                    EntityErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT FOUND".to_string()),
                    EntityErrorKind::Invalid => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "UNPROCESSABLE ENTITY".to_string(),
                    ),
                    EntityErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT".to_string()),
                    EntityErrorKind::Other(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL SERVER ERROR".to_string(),
                    ),
                },
                InternalErrorKind::Config | InternalErrorKind::Other(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL SERVER ERROR".to_string(),
                ),
            },
            DomainErrorKind::External(external_error_kind) => match external_error_kind {
                ExternalErrorKind::Network
                | ExternalErrorKind::Store
                | ExternalErrorKind::Timeout
                | ExternalErrorKind::Other(_) => {
                    (StatusCode::BAD_GATEWAY, "BAD GATEWAY".to_string())
                }
            },
        }
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!("Request failed with {status}: {}", self.0);
        } else {
            debug!("Request rejected with {status}: {message}");
        }

        (
            status,
            Json(json!({ "status_code": status.as_u16(), "error": message })),
        )
            .into_response()
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
