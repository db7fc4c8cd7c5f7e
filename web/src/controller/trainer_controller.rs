use crate::controller::ApiResponse;
use crate::params::trainer::AvailableSlotsParams;
use crate::response::AvailableSlots;
use crate::{AppState, Error};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use domain::{session as SessionApi, Id};

use log::*;

/// GET open slots for a trainer on a given day
#[utoipa::path(
    get,
    path = "/trainers/{trainer_id}/available_slots",
    params(
        ("trainer_id" = Uuid, Path, description = "Trainer id"),
        AvailableSlotsParams,
    ),
    responses(
        (status = 200, description = "Bookable start times, earliest first", body = AvailableSlots),
        (status = 404, description = "Trainer not found"),
    )
)]
pub async fn available_slots(
    State(app_state): State<AppState>,
    Path(trainer_id): Path<Id>,
    Query(params): Query<AvailableSlotsParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET available slots for trainer {trainer_id} on {}", params.date);

    let slots = SessionApi::available_slots(
        app_state.db_conn_ref(),
        &app_state.settings,
        trainer_id,
        params.date,
        Utc::now(),
    )
    .await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        AvailableSlots {
            trainer_id,
            date: params.date,
            slots,
        },
    )))
}
