//! SeaORM Entity for the outbound_calls table.
//! One row per logical outbound call; `attempts` counts dials made for it.

use crate::call_purpose::CallPurpose;
use crate::call_status::CallStatus;
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::outbound_calls::Model)]
#[sea_orm(schema_name = "trainer_voice", table_name = "outbound_calls")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    pub purpose: CallPurpose,

    #[schema(value_type = Option<Uuid>)]
    pub session_id: Option<Id>,

    #[schema(value_type = Option<Uuid>)]
    pub client_id: Option<Id>,

    pub to_phone: String,

    pub status: CallStatus,

    pub attempts: i32,

    /// Handle returned by the telephony provider for the latest dial
    #[sea_orm(unique)]
    pub call_sid: Option<String>,

    #[schema(value_type = Option<String>, format = DateTime)]
    pub next_attempt_at: Option<DateTimeWithTimeZone>,

    #[schema(value_type = Option<String>, format = DateTime)]
    pub dialed_at: Option<DateTimeWithTimeZone>,

    pub last_error: Option<String>,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sessions::Entity",
        from = "Column::SessionId",
        to = "super::sessions::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Sessions,

    #[sea_orm(
        belongs_to = "super::clients::Entity",
        from = "Column::ClientId",
        to = "super::clients::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Clients,
}

impl Related<super::sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::clients::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Clients.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
