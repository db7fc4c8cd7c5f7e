//! Error types for entity API
use std::error::Error as StdError;
use std::fmt;

use serde::Serialize;

use sea_orm::error::{DbErr, RuntimeErr};

/// Postgres SQLSTATE codes that are translated into data errors rather than system errors.
const UNIQUE_VIOLATION: &str = "23505";
const EXCLUSION_VIOLATION: &str = "23P01";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// Errors while executing operations related to entities.
/// The intent is to categorize errors into two major types:
///  * Errors related to data. Ex DbError::RecordNotFound, a unique index rejecting a write
///  * Errors related to interactions with the database itself. Ex DbError::Conn
#[derive(Debug, PartialEq)]
pub struct Error {
    // Underlying error emitted from seaORM internals
    pub source: Option<DbErr>,
    // Enum representing which category of error
    pub error_kind: EntityApiErrorKind,
}

#[derive(Debug, PartialEq, Serialize)]
pub enum EntityApiErrorKind {
    // Invalid search term
    InvalidQueryTerm,
    // Record not found
    RecordNotFound,
    // Record not updated
    RecordNotUpdated,
    // A unique index or exclusion constraint rejected the write
    Conflict,
    // Errors related to interactions with the database itself. Ex DbError::Conn
    SystemError,
    // A check or foreign key constraint rejected the write
    ValidationError,
    // Other errors
    Other,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Entity API Error: {:?}", self)
    }
}

impl StdError for Error {}

impl Error {
    pub(crate) fn not_found() -> Self {
        Error {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotFound,
        }
    }
}

/// Extracts the Postgres SQLSTATE from a driver-level error, if there is one.
fn sqlstate(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(db_err)))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(db_err))) => {
            db_err.code().map(|code| code.into_owned())
        }
        _ => None,
    }
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        let error_kind = match sqlstate(&err).as_deref() {
            Some(UNIQUE_VIOLATION) | Some(EXCLUSION_VIOLATION) => EntityApiErrorKind::Conflict,
            Some(FOREIGN_KEY_VIOLATION) | Some(CHECK_VIOLATION) => {
                EntityApiErrorKind::ValidationError
            }
            _ => match err {
                DbErr::RecordNotFound(_) => EntityApiErrorKind::RecordNotFound,
                DbErr::RecordNotUpdated => EntityApiErrorKind::RecordNotUpdated,
                DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => EntityApiErrorKind::SystemError,
                _ => EntityApiErrorKind::SystemError,
            },
        };

        Error {
            source: Some(err),
            error_kind,
        }
    }
}
