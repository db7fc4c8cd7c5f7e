use domain::session::NewSession;
use domain::{scheduling, Id};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::Error;

const DEFAULT_DAYS_AHEAD: i64 = 7;

#[derive(Debug, Deserialize, IntoParams)]
pub(crate) struct UpcomingParams {
    /// Only sessions with this trainer
    #[param(value_type = Option<Uuid>)]
    pub(crate) trainer_id: Option<Id>,
    /// How many days ahead to look, 0 to 366. Defaults to 7.
    pub(crate) days_ahead: Option<i64>,
}

impl UpcomingParams {
    pub(crate) fn days_ahead(&self) -> i64 {
        self.days_ahead.unwrap_or(DEFAULT_DAYS_AHEAD)
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub(crate) struct RemindersParams {
    /// Reminder window in hours. Defaults to the configured window.
    pub(crate) hours_ahead: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(as = session::CreateParams)]
pub(crate) struct CreateParams {
    #[schema(value_type = Uuid)]
    pub(crate) client_id: Id,
    /// Falls back to the client's trainer, then the default trainer
    #[schema(value_type = Option<Uuid>)]
    pub(crate) trainer_id: Option<Id>,
    /// RFC 3339 start time with an offset, e.g. 2030-09-16T14:00:00-04:00
    pub(crate) date_time: String,
    pub(crate) duration_minutes: Option<i64>,
    pub(crate) location: Option<String>,
    #[serde(default)]
    pub(crate) notes: String,
    /// Repeating a create with the same key never books twice
    pub(crate) idempotency_key: Option<String>,
}

impl TryFrom<CreateParams> for NewSession {
    type Error = Error;

    fn try_from(params: CreateParams) -> Result<Self, Self::Error> {
        Ok(NewSession {
            client_id: params.client_id,
            trainer_id: params.trainer_id,
            date_time: scheduling::parse_session_time(&params.date_time)?,
            duration_minutes: params.duration_minutes,
            location: params.location,
            notes: params.notes,
            idempotency_key: params.idempotency_key,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct RescheduleParams {
    /// RFC 3339 start time with an offset
    pub(crate) date_time: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub(crate) struct CancelParams {
    pub(crate) reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(date_time: &str) -> CreateParams {
        CreateParams {
            client_id: Id::new_v4(),
            trainer_id: None,
            date_time: date_time.to_string(),
            duration_minutes: None,
            location: None,
            notes: String::new(),
            idempotency_key: None,
        }
    }

    #[test]
    fn create_params_require_an_offset() {
        assert!(NewSession::try_from(params("2030-09-16T14:00:00")).is_err());

        let new_session = NewSession::try_from(params("2030-09-16T14:00:00-04:00")).unwrap();
        assert_eq!(new_session.date_time.to_rfc3339(), "2030-09-16T14:00:00-04:00");
    }

    #[test]
    fn upcoming_defaults_to_a_week() {
        let params = UpcomingParams {
            trainer_id: None,
            days_ahead: None,
        };
        assert_eq!(params.days_ahead(), 7);
    }
}
