//! Booking, rescheduling, cancelling and querying training sessions.
//!
//! Every write re-reads what it needs from the store; nothing is cached between calls.
//! Overlap checks here are advisory for good error messages: the exclusion constraint on
//! the sessions table is what settles two bookings racing for the same slot.

use crate::error::Error;
use crate::retry::read_with_backoff;
use crate::scheduling::{self, has_conflict};
use crate::sessions::Model;
use crate::settings::Settings;
use crate::{client, Id};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use entity::session_status::SessionStatus;
use entity_api::{session, trainer};
use log::*;
use sea_orm::DatabaseConnection;
use serde::Serialize;

/// Longest single session that can be booked.
const MAX_SESSION_MINUTES: i64 = 8 * 60;

/// Fields accepted when booking a session.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
    pub client_id: Id,
    /// Falls back to the client's trainer, then the configured default trainer.
    pub trainer_id: Option<Id>,
    pub date_time: DateTime<FixedOffset>,
    pub duration_minutes: Option<i64>,
    pub location: Option<String>,
    pub notes: String,
    pub idempotency_key: Option<String>,
}

pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    read_with_backoff("find session", move || async move {
        Ok(session::find_by_id(db, id).await?)
    })
    .await
}

pub async fn create(
    db: &DatabaseConnection,
    settings: &Settings,
    new_session: NewSession,
) -> Result<Model, Error> {
    let duration_minutes = new_session
        .duration_minutes
        .unwrap_or(settings.session_minutes);
    if !(1..=MAX_SESSION_MINUTES).contains(&duration_minutes) {
        return Err(Error::validation(format!(
            "A session must last between 1 and {MAX_SESSION_MINUTES} minutes"
        )));
    }
    let duration = Duration::minutes(duration_minutes);

    let client = client::find_by_id(db, new_session.client_id)
        .await
        .map_err(|err| not_found_as_validation(err, "Unknown client"))?;

    let trainer_id = new_session
        .trainer_id
        .or(client.trainer_id)
        .or(settings.default_trainer_id)
        .ok_or_else(|| Error::validation("No trainer was given and no default trainer is set"))?;
    let trainer = read_with_backoff("find trainer", move || async move {
        Ok(trainer::find_by_id(db, trainer_id).await?)
    })
    .await
    .map_err(|err| not_found_as_validation(err, "Unknown trainer"))?;

    check_bookable(settings, new_session.date_time, duration, Utc::now())?;

    let existing = sessions_around(db, trainer.id, new_session.date_time, duration).await?;
    if has_conflict(trainer.id, new_session.date_time, duration, &existing) {
        return Err(slot_taken());
    }

    let now = Utc::now().fixed_offset();
    let model = Model {
        id: Id::nil(),
        client_id: client.id,
        client_name: client.name.clone(),
        trainer_id: trainer.id,
        date_time: new_session.date_time,
        ends_at: new_session.date_time + duration,
        duration_minutes: duration_minutes as i32,
        location: new_session
            .location
            .filter(|location| !location.trim().is_empty())
            .unwrap_or_else(|| settings.default_location.clone()),
        status: SessionStatus::Scheduled,
        reminder_sent: false,
        reminder_sent_at: None,
        confirmation_received: false,
        notes: new_session.notes,
        idempotency_key: new_session.idempotency_key,
        created_at: now,
        updated_at: now,
    };

    let created = session::create(db, model).await.map_err(store_conflict)?;
    info!(
        "Booked session {} for client {} with trainer {} at {}",
        created.id, created.client_id, created.trainer_id, created.date_time
    );
    Ok(created)
}

/// Moves a scheduled session to `new_start`, keeping its id and duration.
pub async fn reschedule(
    db: &DatabaseConnection,
    settings: &Settings,
    id: Id,
    new_start: DateTime<FixedOffset>,
) -> Result<Model, Error> {
    let existing = find_by_id(db, id).await?;
    if existing.status != SessionStatus::Scheduled {
        return Err(Error::validation(format!(
            "Only scheduled sessions can be rescheduled; this one is {}",
            existing.status
        )));
    }

    let duration = Duration::minutes(i64::from(existing.duration_minutes));
    check_bookable(settings, new_start, duration, Utc::now())?;

    let others: Vec<Model> = sessions_around(db, existing.trainer_id, new_start, duration)
        .await?
        .into_iter()
        .filter(|other| other.id != existing.id)
        .collect();
    if has_conflict(existing.trainer_id, new_start, duration, &others) {
        return Err(slot_taken());
    }

    let updated = session::reschedule(db, existing, new_start, new_start + duration)
        .await
        .map_err(store_conflict)?;
    info!("Rescheduled session {} to {}", updated.id, updated.date_time);
    Ok(updated)
}

enum Transition {
    Moved(Model),
    Unchanged(Model),
}

/// `Ok(true)` when `existing` may move to `to`, `Ok(false)` when it is already there.
fn may_leave_scheduled(existing: &Model, to: SessionStatus) -> Result<bool, Error> {
    match existing.status {
        SessionStatus::Scheduled => Ok(true),
        status if status == to => Ok(false),
        status => {
            let action = match to {
                SessionStatus::Cancelled => "cancelled",
                SessionStatus::Completed => "completed",
                SessionStatus::NoShow => "marked as a no-show",
                SessionStatus::Scheduled => "scheduled",
            };
            Err(Error::validation(format!(
                "A {status} session cannot be {action}"
            )))
        }
    }
}

/// Moves a scheduled session to `to`. The store only applies the update while the row is
/// still scheduled; when another request got there first the current row decides the result.
async fn leave_scheduled(
    db: &DatabaseConnection,
    existing: Model,
    to: SessionStatus,
    notes: String,
) -> Result<Transition, Error> {
    if !may_leave_scheduled(&existing, to)? {
        debug!("Session {} is already {to}", existing.id);
        return Ok(Transition::Unchanged(existing));
    }

    if let Some(updated) =
        session::transition_status(db, existing.id, SessionStatus::Scheduled, to, notes).await?
    {
        return Ok(Transition::Moved(updated));
    }

    let current = find_by_id(db, existing.id).await?;
    if may_leave_scheduled(&current, to)? {
        return Err(Error::conflict(format!(
            "Session {} changed while it was being updated",
            current.id
        )));
    }
    debug!("Session {} was already moved to {to}", current.id);
    Ok(Transition::Unchanged(current))
}

/// Cancels a session. Cancelling twice is a no-op.
pub async fn cancel(db: &DatabaseConnection, id: Id, reason: Option<String>) -> Result<Model, Error> {
    let existing = find_by_id(db, id).await?;

    let notes = match reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(reason) => append_note(&existing.notes, &format!("Cancelled: {reason}")),
        None => existing.notes.clone(),
    };

    match leave_scheduled(db, existing, SessionStatus::Cancelled, notes).await? {
        Transition::Moved(cancelled) => {
            info!("Cancelled session {}", cancelled.id);
            Ok(cancelled)
        }
        Transition::Unchanged(session) => Ok(session),
    }
}

/// Marks a session completed, uses one session from the client's package and records
/// when the client last trained. Completing twice is a no-op and uses nothing.
pub async fn complete(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    let existing = find_by_id(db, id).await?;
    let notes = existing.notes.clone();

    let completed = match leave_scheduled(db, existing, SessionStatus::Completed, notes).await? {
        Transition::Moved(completed) => completed,
        Transition::Unchanged(session) => return Ok(session),
    };

    let remaining = client::decrement_sessions_remaining(db, completed.client_id).await?;
    entity_api::client::set_last_session_at(db, completed.client_id, completed.date_time).await?;
    info!(
        "Completed session {}; client {} has {} sessions remaining",
        completed.id, completed.client_id, remaining
    );

    Ok(completed)
}

pub async fn mark_no_show(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    let existing = find_by_id(db, id).await?;
    let notes = existing.notes.clone();

    match leave_scheduled(db, existing, SessionStatus::NoShow, notes).await? {
        Transition::Moved(updated) => {
            warn!(
                "Client {} did not show up for session {}",
                updated.client_id, updated.id
            );
            Ok(updated)
        }
        Transition::Unchanged(session) => Ok(session),
    }
}

/// Scheduled sessions starting in the next `days_ahead` days, soonest first.
pub async fn get_upcoming_sessions(
    db: &DatabaseConnection,
    trainer_id: Option<Id>,
    days_ahead: i64,
    now: DateTime<Utc>,
) -> Result<Vec<Model>, Error> {
    if !(0..=366).contains(&days_ahead) {
        return Err(Error::validation("days_ahead must be between 0 and 366"));
    }

    let from = now.fixed_offset();
    let to = (now + Duration::days(days_ahead)).fixed_offset();
    read_with_backoff("find upcoming sessions", move || async move {
        Ok(session::find_upcoming(db, trainer_id, from, to).await?)
    })
    .await
}

/// Every session of a client, oldest first.
pub async fn find_by_client(db: &DatabaseConnection, client_id: Id) -> Result<Vec<Model>, Error> {
    let client_id = client::find_by_id(db, client_id).await?.id;
    read_with_backoff("find client sessions", move || async move {
        Ok(session::find_by_client(db, client_id).await?)
    })
    .await
}

/// Sessions that should get a reminder call now.
pub async fn find_due_reminders(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
    window_hours: i64,
) -> Result<Vec<Model>, Error> {
    let from = now.fixed_offset();
    let until = (now + Duration::hours(window_hours)).fixed_offset();
    let candidates = read_with_backoff("find reminder candidates", move || async move {
        Ok(session::find_reminder_candidates(db, from, until).await?)
    })
    .await?;

    Ok(candidates
        .into_iter()
        .filter(|candidate| scheduling::is_reminder_due(candidate, now, window_hours))
        .collect())
}

/// Counts for the operator dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AppointmentStats {
    /// Scheduled sessions starting within the next seven days.
    pub upcoming_7_days: usize,
    /// Sessions whose reminder call is due now.
    pub reminders_due: usize,
    /// Scheduled sessions still to come today, in the business timezone.
    pub sessions_today: usize,
}

pub async fn appointment_stats(
    db: &DatabaseConnection,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<AppointmentStats, Error> {
    let upcoming = get_upcoming_sessions(db, None, 7, now).await?;
    let due = find_due_reminders(db, now, settings.reminder_window_hours).await?;

    let tz = settings.business_hours.timezone();
    let today = now.with_timezone(&tz).date_naive();
    let sessions_today = upcoming
        .iter()
        .filter(|session| session.date_time.with_timezone(&tz).date_naive() == today)
        .count();

    Ok(AppointmentStats {
        upcoming_7_days: upcoming.len(),
        reminders_due: due.len(),
        sessions_today,
    })
}

/// Flags a session as reminded. Returns false when it already was.
pub async fn mark_reminder_sent(db: &DatabaseConnection, id: Id) -> Result<bool, Error> {
    let rows = session::set_reminder_sent(db, id, Utc::now().fixed_offset()).await?;
    if rows == 0 {
        // Surfaces NotFound for an unknown id; otherwise the flag was already set.
        find_by_id(db, id).await?;
        debug!("Reminder for session {id} was already marked as sent");
    }
    Ok(rows > 0)
}

/// Records that the client confirmed they will attend. Returns false when already confirmed.
pub async fn mark_confirmed(db: &DatabaseConnection, id: Id) -> Result<bool, Error> {
    let rows = session::set_confirmed(db, id, Utc::now().fixed_offset()).await?;
    if rows == 0 {
        find_by_id(db, id).await?;
        debug!("Session {id} was already confirmed");
    }
    Ok(rows > 0)
}

/// Bookable start times for a trainer on `date` (in the business timezone) that are
/// still in the future.
pub async fn available_slots(
    db: &DatabaseConnection,
    settings: &Settings,
    trainer_id: Id,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Vec<DateTime<FixedOffset>>, Error> {
    read_with_backoff("find trainer", move || async move {
        Ok(trainer::find_by_id(db, trainer_id).await?)
    })
    .await?;

    // A two-day margin either side covers every UTC offset.
    let from = (date - Duration::days(1)).and_time(chrono::NaiveTime::MIN).and_utc().fixed_offset();
    let to = (date + Duration::days(2)).and_time(chrono::NaiveTime::MIN).and_utc().fixed_offset();
    let existing = read_with_backoff("find trainer sessions", move || async move {
        Ok(session::find_by_trainer_between(db, trainer_id, from, to).await?)
    })
    .await?;

    Ok(settings
        .business_hours
        .find_available_slots(
            trainer_id,
            date,
            &existing,
            settings.slot_size(),
            settings.session_length(),
        )
        .into_iter()
        .filter(|slot| *slot > now)
        .collect())
}

/// The client's next scheduled session, if any.
pub async fn next_for_client(
    db: &DatabaseConnection,
    client_id: Id,
    now: DateTime<Utc>,
) -> Result<Option<Model>, Error> {
    let now = now.fixed_offset();
    read_with_backoff("find next session", move || async move {
        Ok(session::find_next_scheduled_for_client(db, client_id, now).await?)
    })
    .await
}

fn check_bookable(
    settings: &Settings,
    start: DateTime<FixedOffset>,
    duration: Duration,
    now: DateTime<Utc>,
) -> Result<(), Error> {
    if start <= now {
        return Err(Error::validation("Sessions can only be booked in the future"));
    }
    if !settings.business_hours.session_fits(&start, duration) {
        return Err(Error::validation(
            "That time is outside business hours; sessions must start and end while we're open",
        ));
    }
    Ok(())
}

/// Non-cancelled sessions of the trainer that could overlap `[start, start + duration)`.
async fn sessions_around(
    db: &DatabaseConnection,
    trainer_id: Id,
    start: DateTime<FixedOffset>,
    duration: Duration,
) -> Result<Vec<Model>, Error> {
    let from = start - Duration::days(1);
    let to = start + duration + Duration::days(1);
    read_with_backoff("find trainer sessions", move || async move {
        Ok(session::find_by_trainer_between(db, trainer_id, from, to).await?)
    })
    .await
}

fn slot_taken() -> Error {
    Error::conflict("That time slot is no longer available")
}

/// The store rejected the write with a unique or exclusion violation.
fn store_conflict(err: entity_api::error::Error) -> Error {
    let err: Error = err.into();
    if err.is_conflict() {
        warn!("Store rejected a booking as conflicting: {err}");
        slot_taken()
    } else {
        err
    }
}

fn not_found_as_validation(err: Error, message: &str) -> Error {
    if err.is_not_found() {
        Error::validation(message)
    } else {
        err
    }
}

fn append_note(notes: &str, line: &str) -> String {
    if notes.trim().is_empty() {
        line.to_string()
    } else {
        format!("{notes}\n{line}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_note_adds_a_line() {
        assert_eq!(append_note("", "Cancelled: sick"), "Cancelled: sick");
        assert_eq!(
            append_note("Prefers mornings", "Cancelled: sick"),
            "Prefers mornings\nCancelled: sick"
        );
    }

    #[test]
    fn past_and_after_hours_times_are_not_bookable() {
        let settings = Settings::for_tests();
        let now = Utc::now();

        let past = (now - Duration::days(1)).fixed_offset();
        assert!(check_bookable(&settings, past, Duration::minutes(60), now)
            .unwrap_err()
            .is_validation());

        let early = DateTime::parse_from_rfc3339("2030-09-16T08:00:00-04:00").unwrap();
        assert!(check_bookable(&settings, early, Duration::minutes(60), now).is_err());

        let fine = DateTime::parse_from_rfc3339("2030-09-16T14:00:00-04:00").unwrap();
        assert!(check_bookable(&settings, fine, Duration::minutes(60), now).is_ok());
    }
}
