//! SeaORM Entity for the clients table.
//! A client holds a prepaid package of sessions; `sessions_remaining` never goes below zero.

use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::clients::Model)]
#[sea_orm(schema_name = "trainer_voice", table_name = "clients")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    pub name: String,

    /// Normalized phone number, unique per client
    #[sea_orm(unique)]
    pub phone: String,

    pub email: Option<String>,

    pub notes: String,

    #[schema(value_type = Option<Uuid>)]
    pub trainer_id: Option<Id>,

    /// Number of sessions in the most recently purchased package
    pub package_size: i32,

    pub sessions_remaining: i32,

    #[schema(value_type = Option<String>, format = DateTime)]
    pub last_session_at: Option<DateTimeWithTimeZone>,

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
        belongs_to = "super::trainers::Entity",
        from = "Column::TrainerId",
        to = "super::trainers::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Trainers,

    #[sea_orm(has_many = "super::sessions::Entity")]
    Sessions,
}

impl Related<super::trainers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trainers.def()
    }
}

impl Related<super::sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
