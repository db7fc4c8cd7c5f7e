//! CRUD operations for the sessions table.

use super::error::Error;
use entity::session_status::SessionStatus;
use entity::sessions::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*,
    sea_query::Expr,
    ActiveValue::{NotSet, Set},
    Condition, DatabaseConnection, IntoActiveModel, QueryOrder,
};

/// Inserts a new session. `id`, `created_at` and `updated_at` of the passed model are ignored.
///
/// A reused idempotency key or an overlap with another scheduled session of the same
/// trainer is rejected by the database and surfaces as `EntityApiErrorKind::Conflict`.
pub async fn create(db: &DatabaseConnection, session_model: Model) -> Result<Model, Error> {
    debug!(
        "Creating session for client {} with trainer {} at {}",
        session_model.client_id, session_model.trainer_id, session_model.date_time
    );

    let now = chrono::Utc::now();

    let active_model = ActiveModel {
        id: NotSet,
        client_id: Set(session_model.client_id),
        client_name: Set(session_model.client_name),
        trainer_id: Set(session_model.trainer_id),
        date_time: Set(session_model.date_time),
        ends_at: Set(session_model.ends_at),
        duration_minutes: Set(session_model.duration_minutes),
        location: Set(session_model.location),
        status: Set(SessionStatus::Scheduled),
        reminder_sent: Set(false),
        reminder_sent_at: Set(None),
        confirmation_received: Set(false),
        notes: Set(session_model.notes),
        idempotency_key: Set(session_model.idempotency_key),
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

/// Non-cancelled sessions of a trainer that intersect `[from, to)`.
pub async fn find_by_trainer_between(
    db: &DatabaseConnection,
    trainer_id: Id,
    from: DateTimeWithTimeZone,
    to: DateTimeWithTimeZone,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::TrainerId.eq(trainer_id))
        .filter(Column::Status.ne(SessionStatus::Cancelled))
        .filter(Column::DateTime.lt(to))
        .filter(Column::EndsAt.gt(from))
        .order_by_asc(Column::DateTime)
        .all(db)
        .await?)
}

/// Scheduled sessions starting within `[from, to]`, optionally for a single trainer.
pub async fn find_upcoming(
    db: &DatabaseConnection,
    trainer_id: Option<Id>,
    from: DateTimeWithTimeZone,
    to: DateTimeWithTimeZone,
) -> Result<Vec<Model>, Error> {
    let mut query = Entity::find()
        .filter(Column::Status.eq(SessionStatus::Scheduled))
        .filter(Column::DateTime.gte(from))
        .filter(Column::DateTime.lte(to));

    if let Some(trainer_id) = trainer_id {
        query = query.filter(Column::TrainerId.eq(trainer_id));
    }

    Ok(query.order_by_asc(Column::DateTime).all(db).await?)
}

/// Every session of a client, oldest first.
pub async fn find_by_client(db: &DatabaseConnection, client_id: Id) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::ClientId.eq(client_id))
        .order_by_asc(Column::DateTime)
        .all(db)
        .await?)
}

pub async fn find_next_scheduled_for_client(
    db: &DatabaseConnection,
    client_id: Id,
    now: DateTimeWithTimeZone,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::ClientId.eq(client_id))
        .filter(Column::Status.eq(SessionStatus::Scheduled))
        .filter(Column::DateTime.gte(now))
        .order_by_asc(Column::DateTime)
        .one(db)
        .await?)
}

/// Scheduled sessions without a reminder that start within `[now, until]`.
/// Served by the `(reminder_sent, status, date_time)` index.
pub async fn find_reminder_candidates(
    db: &DatabaseConnection,
    now: DateTimeWithTimeZone,
    until: DateTimeWithTimeZone,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::ReminderSent.eq(false))
        .filter(Column::Status.eq(SessionStatus::Scheduled))
        .filter(Column::DateTime.gte(now))
        .filter(Column::DateTime.lte(until))
        .order_by_asc(Column::DateTime)
        .all(db)
        .await?)
}

/// Moves a session to a new time. Reminder and confirmation flags are reset so the
/// client is reminded about the new time.
pub async fn reschedule(
    db: &DatabaseConnection,
    existing: Model,
    date_time: DateTimeWithTimeZone,
    ends_at: DateTimeWithTimeZone,
) -> Result<Model, Error> {
    debug!(
        "Rescheduling session {} from {} to {}",
        existing.id, existing.date_time, date_time
    );

    let mut active_model = existing.into_active_model();
    active_model.date_time = Set(date_time);
    active_model.ends_at = Set(ends_at);
    active_model.reminder_sent = Set(false);
    active_model.reminder_sent_at = Set(None);
    active_model.confirmation_received = Set(false);
    active_model.updated_at = Set(chrono::Utc::now().into());

    Ok(active_model.update(db).await?)
}

/// Moves session `id` from `from` to `to` in a single guarded UPDATE.
/// Returns `None` when the row is no longer in `from` (or doesn't exist), so only one of
/// several concurrent transitions ever succeeds.
pub async fn transition_status(
    db: &DatabaseConnection,
    id: Id,
    from: SessionStatus,
    to: SessionStatus,
    notes: String,
) -> Result<Option<Model>, Error> {
    debug!("Updating session {id} status {from} -> {to}");

    let updated = Entity::update_many()
        .set(ActiveModel {
            status: Set(to),
            notes: Set(notes),
            updated_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        })
        .filter(
            Condition::all()
                .add(Column::Id.eq(id))
                .add(Column::Status.eq(from)),
        )
        .exec_with_returning(db)
        .await?;

    Ok(updated.into_iter().next())
}

/// Flips `reminder_sent` to true only if it is currently false.
/// Returns the number of rows changed (0 when already set or unknown id).
pub async fn set_reminder_sent(
    db: &DatabaseConnection,
    id: Id,
    at: DateTimeWithTimeZone,
) -> Result<u64, Error> {
    let result = Entity::update_many()
        .col_expr(Column::ReminderSent, Expr::value(true))
        .col_expr(Column::ReminderSentAt, Expr::value(at))
        .col_expr(Column::UpdatedAt, Expr::value(at))
        .filter(
            Condition::all()
                .add(Column::Id.eq(id))
                .add(Column::ReminderSent.eq(false)),
        )
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Flips `confirmation_received` to true only if it is currently false.
pub async fn set_confirmed(
    db: &DatabaseConnection,
    id: Id,
    at: DateTimeWithTimeZone,
) -> Result<u64, Error> {
    let result = Entity::update_many()
        .col_expr(Column::ConfirmationReceived, Expr::value(true))
        .col_expr(Column::UpdatedAt, Expr::value(at))
        .filter(
            Condition::all()
                .add(Column::Id.eq(id))
                .add(Column::ConfirmationReceived.eq(false)),
        )
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}
