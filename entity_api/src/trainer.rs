//! CRUD operations for the trainers table.

use super::error::Error;
use entity::trainers::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{entity::prelude::*, ActiveValue::Set, DatabaseConnection, QueryOrder};

pub async fn create(db: &DatabaseConnection, trainer_model: Model) -> Result<Model, Error> {
    debug!("Creating trainer {}", trainer_model.name);

    let now = chrono::Utc::now();

    let active_model = ActiveModel {
        name: Set(trainer_model.name),
        phone: Set(trainer_model.phone),
        email: Set(trainer_model.email),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(active_model.insert(db).await?)
}

pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(Error::not_found)
}

pub async fn find_all(db: &DatabaseConnection) -> Result<Vec<Model>, Error> {
    Ok(Entity::find().order_by_asc(Column::Name).all(db).await?)
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use crate::error::EntityApiErrorKind;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn find_by_id_returns_the_trainer() -> Result<(), Error> {
        let now = chrono::Utc::now();
        let trainer = Model {
            id: Id::new_v4(),
            name: "Sam Okafor".to_string(),
            phone: None,
            email: Some("sam@example.com".to_string()),
            created_at: now.into(),
            updated_at: now.into(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![trainer.clone()]])
            .into_connection();

        assert_eq!(find_by_id(&db, trainer.id).await?, trainer);

        Ok(())
    }

    #[tokio::test]
    async fn find_by_id_errors_when_missing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new()])
            .into_connection();

        let err = find_by_id(&db, Id::new_v4()).await.unwrap_err();
        assert_eq!(err.error_kind, EntityApiErrorKind::RecordNotFound);
    }
}
