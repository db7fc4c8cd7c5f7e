use crate::controller::ApiResponse;
use crate::params::outbound_call::{BulkCallParams, TestCallParams};
use crate::response::{BulkCalls, DispatchSummary};
use crate::{AppState, Error};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use domain::outbound_calls;

use log::*;

/// POST run one reminder dispatch pass now instead of waiting for the next tick
#[utoipa::path(
    post,
    path = "/sessions/send-reminders",
    responses(
        (status = 200, description = "Dispatch pass finished", body = DispatchSummary),
        (status = 502, description = "The store could not be reached"),
    )
)]
pub async fn send_reminders(State(app_state): State<AppState>) -> Result<impl IntoResponse, Error> {
    info!("POST Manual reminder dispatch requested");

    let summary = app_state.dispatcher.tick(Utc::now()).await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        DispatchSummary::from(summary),
    )))
}

/// POST place a scheduling or follow-up call to a phone number
#[utoipa::path(
    post,
    path = "/test/outbound-call",
    request_body = TestCallParams,
    responses(
        (status = 201, description = "Call record created and dialed", body = outbound_calls::Model),
        (status = 422, description = "Invalid phone number or call type"),
    )
)]
pub async fn test_call(
    State(app_state): State<AppState>,
    Json(params): Json<TestCallParams>,
) -> Result<impl IntoResponse, Error> {
    info!("POST {} call to {}", params.call_type, params.phone_number);

    let call = app_state
        .dispatcher
        .place_adhoc_call(&params.phone_number, params.call_type, params.client_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(StatusCode::CREATED.into(), call)),
    ))
}

/// POST place follow-up or scheduling calls to several clients or phone numbers
#[utoipa::path(
    post,
    path = "/outbound-calls/bulk",
    request_body = BulkCallParams,
    responses(
        (status = 200, description = "Every target was attempted", body = BulkCalls),
        (status = 422, description = "No targets, too many targets or a reminder call type"),
    )
)]
pub async fn bulk_calls(
    State(app_state): State<AppState>,
    Json(params): Json<BulkCallParams>,
) -> Result<impl IntoResponse, Error> {
    let (purpose, targets) = params.into_targets();
    info!("POST {} bulk {purpose} calls", targets.len());

    let summary = app_state
        .dispatcher
        .place_bulk_calls(purpose, targets)
        .await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        BulkCalls::from(summary),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{app_state, config};
    use domain::call_purpose::CallPurpose;
    use sea_orm::DatabaseConnection;

    #[tokio::test]
    async fn reminders_cannot_be_placed_by_hand() {
        let state = app_state(DatabaseConnection::Disconnected, config(&[]));

        let response = test_call(
            State(state),
            Json(TestCallParams {
                phone_number: "+15555550123".to_string(),
                call_type: CallPurpose::Reminder,
                client_id: None,
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_call_type_defaults_to_scheduling() {
        let params: TestCallParams =
            serde_json::from_str(r#"{"phone_number": "+15555550123"}"#).unwrap();
        assert_eq!(params.call_type, CallPurpose::Scheduling);

        let params: TestCallParams =
            serde_json::from_str(r#"{"phone_number": "+15555550123", "call_type": "follow_up"}"#)
                .unwrap();
        assert_eq!(params.call_type, CallPurpose::FollowUp);
    }

    #[tokio::test]
    async fn bulk_calls_without_targets_are_rejected() {
        let state = app_state(DatabaseConnection::Disconnected, config(&[]));

        let response = bulk_calls(State(state), Json(BulkCallParams::default()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn bulk_call_params_list_clients_before_phone_numbers() {
        let client_id = domain::Id::new_v4();
        let params: BulkCallParams = serde_json::from_value(serde_json::json!({
            "phone_numbers": ["+15555550123"],
            "client_ids": [client_id],
        }))
        .unwrap();

        let (purpose, targets) = params.into_targets();

        assert_eq!(purpose, CallPurpose::FollowUp);
        assert_eq!(
            targets,
            vec![
                domain::outbound::CallTarget::Client(client_id),
                domain::outbound::CallTarget::Phone("+15555550123".to_string()),
            ]
        );
    }
}
