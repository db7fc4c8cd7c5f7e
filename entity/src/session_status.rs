use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle of a training session. Transitions only leave `Scheduled`.
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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "session_status")]
pub enum SessionStatus {
    #[sea_orm(string_value = "scheduled")]
    #[default]
    Scheduled,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "no_show")]
    NoShow,
}

impl SessionStatus {
    /// Terminal statuses never transition again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Scheduled)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Scheduled => write!(fmt, "scheduled"),
            SessionStatus::Completed => write!(fmt, "completed"),
            SessionStatus::Cancelled => write!(fmt, "cancelled"),
            SessionStatus::NoShow => write!(fmt, "no_show"),
        }
    }
}
