//! CRUD operations for the outbound_calls table.

use super::error::Error;
use entity::call_purpose::CallPurpose;
use entity::call_status::CallStatus;
use entity::outbound_calls::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*,
    ActiveValue::{NotSet, Set},
    Condition, DatabaseConnection, IntoActiveModel, QueryOrder,
};

/// Fields written when a dial attempt finishes or is abandoned.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub status: CallStatus,
    pub attempts: i32,
    pub next_attempt_at: Option<DateTimeWithTimeZone>,
    pub last_error: Option<String>,
}

/// Creates a `pending` call record.
pub async fn create(
    db: &DatabaseConnection,
    purpose: CallPurpose,
    session_id: Option<Id>,
    client_id: Option<Id>,
    to_phone: &str,
) -> Result<Model, Error> {
    debug!("Creating {purpose} call record to {to_phone} (session: {session_id:?})");

    let now = chrono::Utc::now();

    let active_model = ActiveModel {
        id: NotSet,
        purpose: Set(purpose),
        session_id: Set(session_id),
        client_id: Set(client_id),
        to_phone: Set(to_phone.to_string()),
        status: Set(CallStatus::Pending),
        attempts: Set(0),
        call_sid: Set(None),
        next_attempt_at: Set(None),
        dialed_at: Set(None),
        last_error: Set(None),
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

pub async fn find_by_call_sid(
    db: &DatabaseConnection,
    call_sid: &str,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::CallSid.eq(call_sid))
        .one(db)
        .await?)
}

/// Most recent call record made for a session, if any.
pub async fn find_latest_for_session(
    db: &DatabaseConnection,
    session_id: Id,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::SessionId.eq(session_id))
        .order_by_desc(Column::CreatedAt)
        .one(db)
        .await?)
}

/// Failed or unanswered calls whose backoff has elapsed, plus `pending` records created
/// before `stale_pending_before` that never reached the provider.
pub async fn find_retryable(
    db: &DatabaseConnection,
    now: DateTimeWithTimeZone,
    stale_pending_before: DateTimeWithTimeZone,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(
            Condition::any()
                .add(
                    Condition::all()
                        .add(Column::Status.is_in([CallStatus::Failed, CallStatus::NoAnswer]))
                        .add(Column::NextAttemptAt.lte(now)),
                )
                .add(
                    Condition::all()
                        .add(Column::Status.eq(CallStatus::Pending))
                        .add(Column::CreatedAt.lt(stale_pending_before)),
                ),
        )
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?)
}

/// Calls still `dialing` that were handed to the provider before `cutoff`.
pub async fn find_stale_dialing(
    db: &DatabaseConnection,
    cutoff: DateTimeWithTimeZone,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::Status.eq(CallStatus::Dialing))
        .filter(Column::DialedAt.lt(cutoff))
        .all(db)
        .await?)
}

/// Records that the provider accepted a dial and returned `call_sid`.
pub async fn mark_dialing(
    db: &DatabaseConnection,
    existing: Model,
    call_sid: &str,
    at: DateTimeWithTimeZone,
) -> Result<Model, Error> {
    debug!("Call {} dialing with sid {call_sid}", existing.id);

    let attempts = existing.attempts + 1;
    let mut active_model = existing.into_active_model();
    active_model.status = Set(CallStatus::Dialing);
    active_model.attempts = Set(attempts);
    active_model.call_sid = Set(Some(call_sid.to_string()));
    active_model.dialed_at = Set(Some(at));
    active_model.next_attempt_at = Set(None);
    active_model.last_error = Set(None);
    active_model.updated_at = Set(at);

    Ok(active_model.update(db).await?)
}

pub async fn record_outcome(
    db: &DatabaseConnection,
    existing: Model,
    outcome: Outcome,
) -> Result<Model, Error> {
    debug!(
        "Call {} {} -> {} (attempts: {})",
        existing.id, existing.status, outcome.status, outcome.attempts
    );

    let mut active_model = existing.into_active_model();
    active_model.status = Set(outcome.status);
    active_model.attempts = Set(outcome.attempts);
    active_model.next_attempt_at = Set(outcome.next_attempt_at);
    active_model.last_error = Set(outcome.last_error);
    active_model.updated_at = Set(chrono::Utc::now().into());

    Ok(active_model.update(db).await?)
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn call_model() -> Model {
        let now = Utc::now();
        Model {
            id: Id::new_v4(),
            purpose: CallPurpose::Reminder,
            session_id: Some(Id::new_v4()),
            client_id: Some(Id::new_v4()),
            to_phone: "+15555550123".to_string(),
            status: CallStatus::Pending,
            attempts: 0,
            call_sid: None,
            next_attempt_at: None,
            dialed_at: None,
            last_error: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn create_returns_a_pending_record() -> Result<(), Error> {
        let model = call_model();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![model.clone()]])
            .into_connection();

        let call = create(
            &db,
            CallPurpose::Reminder,
            model.session_id,
            model.client_id,
            &model.to_phone,
        )
        .await?;

        assert_eq!(call.status, CallStatus::Pending);
        assert_eq!(call.attempts, 0);

        Ok(())
    }

    #[tokio::test]
    async fn mark_dialing_returns_the_updated_record() -> Result<(), Error> {
        let existing = call_model();
        let mut dialing = existing.clone();
        dialing.status = CallStatus::Dialing;
        dialing.attempts = 1;
        dialing.call_sid = Some("CA123".to_string());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![dialing.clone()]])
            .into_connection();

        let call = mark_dialing(&db, existing, "CA123", Utc::now().into()).await?;

        assert_eq!(call.status, CallStatus::Dialing);
        assert_eq!(call.call_sid.as_deref(), Some("CA123"));

        Ok(())
    }

    #[tokio::test]
    async fn find_retryable_includes_stale_pending_records() -> Result<(), Error> {
        let stale = call_model();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![stale.clone()]])
            .into_connection();

        let now = Utc::now();
        let calls = find_retryable(
            &db,
            now.into(),
            (now - chrono::Duration::minutes(10)).into(),
        )
        .await?;
        assert_eq!(calls, vec![stale]);

        let sql: Vec<String> = db
            .into_transaction_log()
            .iter()
            .flat_map(|txn| txn.statements().iter().map(|stmt| stmt.sql.clone()))
            .collect();
        assert!(sql[0].contains(r#""outbound_calls"."created_at" < "#));

        Ok(())
    }

    #[tokio::test]
    async fn find_by_call_sid_returns_none_for_unknown_sid() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new()])
            .into_connection();

        assert!(find_by_call_sid(&db, "CA-unknown").await?.is_none());

        Ok(())
    }
}
