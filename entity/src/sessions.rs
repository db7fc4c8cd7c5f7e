//! SeaORM Entity for the sessions table.
//!
//! `ends_at` is stored alongside `date_time` so the database can enforce that no two
//! scheduled sessions of one trainer overlap (see the `sessions_trainer_no_overlap`
//! exclusion constraint).

use crate::session_status::SessionStatus;
use crate::Id;
use chrono::Duration;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::sessions::Model)]
#[sea_orm(schema_name = "trainer_voice", table_name = "sessions")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    #[schema(value_type = Uuid)]
    pub client_id: Id,

    /// Copied from the client at booking time for reminder greetings
    pub client_name: String,

    #[schema(value_type = Uuid)]
    pub trainer_id: Id,

    /// Scheduled start
    #[schema(value_type = String, format = DateTime)]
    pub date_time: DateTimeWithTimeZone,

    #[schema(value_type = String, format = DateTime)]
    pub ends_at: DateTimeWithTimeZone,

    pub duration_minutes: i32,

    pub location: String,

    pub status: SessionStatus,

    pub reminder_sent: bool,

    #[schema(value_type = Option<String>, format = DateTime)]
    pub reminder_sent_at: Option<DateTimeWithTimeZone>,

    pub confirmation_received: bool,

    pub notes: String,

    #[serde(skip_serializing)]
    #[sea_orm(unique)]
    pub idempotency_key: Option<String>,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// End of the session computed from its start and length.
    pub fn end_time(&self) -> DateTimeWithTimeZone {
        self.date_time + Duration::minutes(i64::from(self.duration_minutes))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::clients::Entity",
        from = "Column::ClientId",
        to = "super::clients::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Clients,

    #[sea_orm(
        belongs_to = "super::trainers::Entity",
        from = "Column::TrainerId",
        to = "super::trainers::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Trainers,
}

impl Related<super::clients::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Clients.def()
    }
}

impl Related<super::trainers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trainers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
