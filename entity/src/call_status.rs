use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Status of a single outbound call attempt record.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    EnumIter,
    Deserialize,
    Default,
    Serialize,
    DeriveActiveEnum,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "call_status")]
pub enum CallStatus {
    /// Record created, not yet handed to the telephony provider
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    /// Provider accepted the call; waiting on the status callback
    #[sea_orm(string_value = "dialing")]
    Dialing,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "no_answer")]
    NoAnswer,
    /// Retry budget exhausted
    #[sea_orm(string_value = "abandoned")]
    Abandoned,
}

impl CallStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallStatus::Completed | CallStatus::Abandoned)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CallStatus::Failed | CallStatus::NoAnswer)
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallStatus::Pending => write!(fmt, "pending"),
            CallStatus::Dialing => write!(fmt, "dialing"),
            CallStatus::Completed => write!(fmt, "completed"),
            CallStatus::Failed => write!(fmt, "failed"),
            CallStatus::NoAnswer => write!(fmt, "no_answer"),
            CallStatus::Abandoned => write!(fmt, "abandoned"),
        }
    }
}
