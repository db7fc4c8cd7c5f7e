use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Why an outbound call is being placed. Drives the greeting and agent prompt.
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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "call_purpose")]
pub enum CallPurpose {
    #[sea_orm(string_value = "reminder")]
    #[default]
    Reminder,
    #[sea_orm(string_value = "follow_up")]
    FollowUp,
    #[sea_orm(string_value = "scheduling")]
    Scheduling,
}

impl std::fmt::Display for CallPurpose {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallPurpose::Reminder => write!(fmt, "reminder"),
            CallPurpose::FollowUp => write!(fmt, "follow_up"),
            CallPurpose::Scheduling => write!(fmt, "scheduling"),
        }
    }
}
