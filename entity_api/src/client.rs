//! CRUD operations for the clients table.

use super::error::Error;
use entity::clients::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*,
    sea_query::Expr,
    ActiveValue::{NotSet, Set},
    Condition, DatabaseConnection,
};

/// Inserts a new client. A phone number already on file surfaces as a conflict.
pub async fn create(db: &DatabaseConnection, client_model: Model) -> Result<Model, Error> {
    debug!("Creating client {} ({})", client_model.name, client_model.phone);

    let now = chrono::Utc::now();

    let active_model = ActiveModel {
        id: NotSet,
        name: Set(client_model.name),
        phone: Set(client_model.phone),
        email: Set(client_model.email),
        notes: Set(client_model.notes),
        trainer_id: Set(client_model.trainer_id),
        package_size: Set(client_model.package_size),
        sessions_remaining: Set(client_model.sessions_remaining),
        last_session_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    Ok(active_model.insert(db).await?)
}

pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(Error::not_found)
}

/// Looks a client up by normalized phone number.
pub async fn find_by_phone(db: &DatabaseConnection, phone: &str) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::Phone.eq(phone))
        .one(db)
        .await?)
}

/// Decrements `sessions_remaining` by one in a single conditional UPDATE so concurrent
/// completions can never take the count below zero. Returns rows affected (0 when the
/// client is unknown or already at zero).
pub async fn decrement_sessions_remaining(
    db: &DatabaseConnection,
    id: Id,
    at: DateTimeWithTimeZone,
) -> Result<u64, Error> {
    let result = Entity::update_many()
        .col_expr(
            Column::SessionsRemaining,
            Expr::col(Column::SessionsRemaining).sub(1),
        )
        .col_expr(Column::UpdatedAt, Expr::value(at))
        .filter(
            Condition::all()
                .add(Column::Id.eq(id))
                .add(Column::SessionsRemaining.gt(0)),
        )
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

pub async fn set_last_session_at(
    db: &DatabaseConnection,
    id: Id,
    at: DateTimeWithTimeZone,
) -> Result<u64, Error> {
    let result = Entity::update_many()
        .col_expr(Column::LastSessionAt, Expr::value(Some(at)))
        .col_expr(Column::UpdatedAt, Expr::value(at))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Records a newly purchased package: `package_size` becomes `sessions` and the
/// purchased sessions are added on top of whatever remains, in the same UPDATE so
/// concurrent writers never lose an increment.
pub async fn add_package(db: &DatabaseConnection, id: Id, sessions: i32) -> Result<Model, Error> {
    debug!("Adding a {sessions} session package to client {id}");

    let now: DateTimeWithTimeZone = chrono::Utc::now().into();
    Entity::update_many()
        .col_expr(Column::PackageSize, Expr::value(sessions))
        .col_expr(
            Column::SessionsRemaining,
            Expr::col(Column::SessionsRemaining).add(sessions),
        )
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.eq(id))
        .exec_with_returning(db)
        .await?
        .into_iter()
        .next()
        .ok_or_else(Error::not_found)
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn client_model() -> Model {
        let now = Utc::now();
        Model {
            id: Id::new_v4(),
            name: "Jordan Reyes".to_string(),
            phone: "+15555550123".to_string(),
            email: None,
            notes: String::new(),
            trainer_id: None,
            package_size: 10,
            sessions_remaining: 4,
            last_session_at: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn create_returns_a_new_client_model() -> Result<(), Error> {
        let model = client_model();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![model.clone()]])
            .into_connection();

        let client = create(&db, model.clone()).await?;

        assert_eq!(client.id, model.id);
        assert_eq!(client.phone, "+15555550123");

        Ok(())
    }

    #[tokio::test]
    async fn find_by_phone_returns_none_when_missing() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new()])
            .into_connection();

        assert!(find_by_phone(&db, "+15555550000").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn decrement_reports_rows_affected() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let rows = decrement_sessions_remaining(&db, Id::new_v4(), Utc::now().into()).await?;

        assert_eq!(rows, 1);

        Ok(())
    }

    #[tokio::test]
    async fn add_package_increments_remaining_sessions_in_the_store() -> Result<(), Error> {
        let mut updated = client_model();
        updated.package_size = 8;
        updated.sessions_remaining = 12;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![updated.clone()]])
            .into_connection();

        let client = add_package(&db, updated.id, 8).await?;

        assert_eq!(client.sessions_remaining, 12);
        assert_eq!(client.package_size, 8);

        let sql: Vec<String> = db
            .into_transaction_log()
            .iter()
            .flat_map(|txn| txn.statements().iter().map(|stmt| stmt.sql.clone()))
            .collect();
        assert!(sql
            .iter()
            .any(|stmt| stmt.contains(r#""sessions_remaining" = "sessions_remaining" + "#)));

        Ok(())
    }

    #[tokio::test]
    async fn add_package_for_unknown_client_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new()])
            .into_connection();

        let result = add_package(&db, Id::new_v4(), 8).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            crate::error::EntityApiErrorKind::RecordNotFound
        );
    }
}
