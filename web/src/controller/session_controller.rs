use crate::controller::ApiResponse;
use crate::params::session::{
    CancelParams, CreateParams, RemindersParams, RescheduleParams, UpcomingParams,
};
use crate::response::SessionStats;
use crate::{AppState, Error};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use domain::session::NewSession;
use domain::{scheduling, session as SessionApi, sessions, Id};

use log::*;

/// GET upcoming scheduled sessions, soonest first
#[utoipa::path(
    get,
    path = "/sessions/upcoming",
    params(UpcomingParams),
    responses(
        (status = 200, description = "Successfully retrieved upcoming sessions", body = [sessions::Model]),
        (status = 422, description = "days_ahead out of range"),
    )
)]
pub async fn upcoming(
    State(app_state): State<AppState>,
    Query(params): Query<UpcomingParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET upcoming sessions: {params:?}");

    let sessions = SessionApi::get_upcoming_sessions(
        app_state.db_conn_ref(),
        params.trainer_id,
        params.days_ahead(),
        Utc::now(),
    )
    .await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), sessions)))
}

/// GET sessions that are currently due a reminder call
#[utoipa::path(
    get,
    path = "/sessions/reminders",
    params(RemindersParams),
    responses(
        (status = 200, description = "Sessions due a reminder", body = [sessions::Model]),
    )
)]
pub async fn reminders(
    State(app_state): State<AppState>,
    Query(params): Query<RemindersParams>,
) -> Result<impl IntoResponse, Error> {
    let hours_ahead = params
        .hours_ahead
        .unwrap_or(app_state.settings.reminder_window_hours);
    debug!("GET sessions due a reminder within {hours_ahead}h");

    let sessions =
        SessionApi::find_due_reminders(app_state.db_conn_ref(), Utc::now(), hours_ahead).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), sessions)))
}

/// GET counts of upcoming sessions, reminders due and sessions left today
#[utoipa::path(
    get,
    path = "/sessions/stats",
    responses(
        (status = 200, description = "Current session counts", body = SessionStats),
        (status = 502, description = "The store could not be reached"),
    )
)]
pub async fn stats(State(app_state): State<AppState>) -> Result<impl IntoResponse, Error> {
    debug!("GET session stats");

    let stats =
        SessionApi::appointment_stats(app_state.db_conn_ref(), &app_state.settings, Utc::now())
            .await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        SessionStats::new(stats, app_state.settings.use_session_agent),
    )))
}

/// POST book a new session
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = CreateParams,
    responses(
        (status = 201, description = "Successfully booked a new session", body = sessions::Model),
        (status = 409, description = "The slot is taken"),
        (status = 422, description = "Outside business hours, in the past or otherwise invalid"),
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    Json(params): Json<CreateParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Create a new session from: {params:?}");

    let new_session = NewSession::try_from(params)?;
    let session =
        SessionApi::create(app_state.db_conn_ref(), &app_state.settings, new_session).await?;

    info!("Booked session {} at {}", session.id, session.date_time);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(StatusCode::CREATED.into(), session)),
    ))
}

/// PUT move a scheduled session to a new time
#[utoipa::path(
    put,
    path = "/sessions/{id}/reschedule",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = RescheduleParams,
    responses(
        (status = 200, description = "Successfully rescheduled", body = sessions::Model),
        (status = 404, description = "Session not found"),
        (status = 409, description = "The new slot is taken"),
        (status = 422, description = "Session is not scheduled or the time is invalid"),
    )
)]
pub async fn reschedule(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
    Json(params): Json<RescheduleParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("PUT Reschedule session {id} to {}", params.date_time);

    let new_start = scheduling::parse_session_time(&params.date_time)?;
    let session =
        SessionApi::reschedule(app_state.db_conn_ref(), &app_state.settings, id, new_start)
            .await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), session)))
}

/// PUT cancel a session. Cancelling twice is harmless.
#[utoipa::path(
    put,
    path = "/sessions/{id}/cancel",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = CancelParams,
    responses(
        (status = 200, description = "Session is cancelled", body = sessions::Model),
        (status = 404, description = "Session not found"),
        (status = 422, description = "Session already took place"),
    )
)]
pub async fn cancel(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
    Json(params): Json<CancelParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("PUT Cancel session {id}");

    let session = SessionApi::cancel(app_state.db_conn_ref(), id, params.reason).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), session)))
}

/// PUT mark a session as completed and use up one session from the client's package
#[utoipa::path(
    put,
    path = "/sessions/{id}/complete",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session is completed", body = sessions::Model),
        (status = 404, description = "Session not found"),
        (status = 422, description = "Session was cancelled or missed"),
    )
)]
pub async fn complete(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("PUT Complete session {id}");

    let session = SessionApi::complete(app_state.db_conn_ref(), id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), session)))
}

/// PUT record that the client did not show up
#[utoipa::path(
    put,
    path = "/sessions/{id}/no_show",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session is marked as a no-show", body = sessions::Model),
        (status = 404, description = "Session not found"),
        (status = 422, description = "Session was cancelled or completed"),
    )
)]
pub async fn no_show(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("PUT No-show for session {id}");

    let session = SessionApi::mark_no_show(app_state.db_conn_ref(), id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), session)))
}

/// PUT record the client's confirmation that they will attend
#[utoipa::path(
    put,
    path = "/sessions/{id}/confirm",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session is confirmed", body = sessions::Model),
        (status = 404, description = "Session not found"),
    )
)]
pub async fn confirm(
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("PUT Confirm session {id}");

    let db = app_state.db_conn_ref();
    if !SessionApi::mark_confirmed(db, id).await? {
        debug!("Session {id} was already confirmed");
    }
    let session = SessionApi::find_by_id(db, id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), session)))
}


#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod store_tests {
    use super::*;
    use crate::test_support::{app_state, config};
    use chrono::{Duration, Utc};
    use domain::session_status::SessionStatus;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn session_in(hours: i64) -> sessions::Model {
        let start = (Utc::now() + Duration::hours(hours)).fixed_offset();
        sessions::Model {
            id: Id::new_v4(),
            client_id: Id::new_v4(),
            client_name: "Jordan Reyes".to_string(),
            trainer_id: Id::new_v4(),
            date_time: start,
            ends_at: start + Duration::minutes(60),
            duration_minutes: 60,
            location: "Gym".to_string(),
            status: SessionStatus::Scheduled,
            reminder_sent: false,
            reminder_sent_at: None,
            confirmation_received: false,
            notes: String::new(),
            idempotency_key: None,
            created_at: start,
            updated_at: start,
        }
    }

    #[tokio::test]
    async fn upcoming_returns_the_stored_sessions() {
        let first = session_in(2);
        let second = session_in(30);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![first.clone(), second.clone()]])
            .into_connection();
        let state = app_state(db, config(&[]));

        let response = upcoming(
            State(state),
            Query(UpcomingParams {
                trainer_id: None,
                days_ahead: None,
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
        assert_eq!(json["data"][0]["id"], first.id.to_string());
    }

    #[tokio::test]
    async fn cancelling_an_unknown_session_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<sessions::Model>::new()])
            .into_connection();
        let state = app_state(db, config(&[]));

        let response = cancel(
            State(state),
            Path(Id::new_v4()),
            Json(CancelParams::default()),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stats_count_upcoming_sessions_and_due_reminders() {
        let soon = session_in(2);
        let later = session_in(30);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![soon.clone(), later.clone()]])
            .append_query_results(vec![vec![soon.clone(), later.clone()]])
            .into_connection();
        let state = app_state(db, config(&[]));

        let response = stats(State(state)).await.into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["data"]["upcoming_7_days"], 2);
        assert_eq!(json["data"]["reminders_due"], 1);
    }
}
