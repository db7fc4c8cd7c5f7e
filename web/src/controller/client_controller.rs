use crate::controller::ApiResponse;
use crate::params::client::{CreateParams, PackageParams};
use crate::response::RemainingSessions;
use crate::{AppState, Error};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::{client as ClientApi, clients, session as SessionApi, sessions, Id};

use log::*;

/// POST register a new client
#[utoipa::path(
    post,
    path = "/clients",
    request_body = CreateParams,
    responses(
        (status = 201, description = "Successfully registered a new client", body = clients::Model),
        (status = 409, description = "A client with this phone number exists"),
        (status = 422, description = "Missing name or implausible phone number"),
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    Json(params): Json<CreateParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Create a new client: {}", params.name);

    let client = ClientApi::create(app_state.db_conn_ref(), params.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(StatusCode::CREATED.into(), client)),
    ))
}

/// GET every session booked for a client, oldest first
#[utoipa::path(
    get,
    path = "/clients/{client_id}/sessions",
    params(("client_id" = Uuid, Path, description = "Client id")),
    responses(
        (status = 200, description = "Successfully retrieved the client's sessions", body = [sessions::Model]),
        (status = 404, description = "Client not found"),
    )
)]
pub async fn sessions(
    State(app_state): State<AppState>,
    Path(client_id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET sessions for client {client_id}");

    let sessions = SessionApi::find_by_client(app_state.db_conn_ref(), client_id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), sessions)))
}

/// GET how many sessions are left in a client's package
#[utoipa::path(
    get,
    path = "/clients/{client_id}/remaining-sessions",
    params(("client_id" = Uuid, Path, description = "Client id")),
    responses(
        (status = 200, description = "Remaining sessions", body = RemainingSessions),
        (status = 404, description = "Client not found"),
    )
)]
pub async fn remaining_sessions(
    State(app_state): State<AppState>,
    Path(client_id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET remaining sessions for client {client_id}");

    let client = ClientApi::find_by_id(app_state.db_conn_ref(), client_id).await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        RemainingSessions {
            client_id: client.id,
            sessions_remaining: client.sessions_remaining,
            package_size: client.package_size,
        },
    )))
}

/// PUT add a purchased package to a client's balance
#[utoipa::path(
    put,
    path = "/clients/{client_id}/package",
    params(("client_id" = Uuid, Path, description = "Client id")),
    request_body = PackageParams,
    responses(
        (status = 200, description = "Package added", body = clients::Model),
        (status = 404, description = "Client not found"),
        (status = 422, description = "Package must contain at least one session"),
    )
)]
pub async fn add_package(
    State(app_state): State<AppState>,
    Path(client_id): Path<Id>,
    Json(params): Json<PackageParams>,
) -> Result<impl IntoResponse, Error> {
    debug!(
        "PUT Add a {} session package for client {client_id}",
        params.sessions
    );

    let client = ClientApi::add_package(app_state.db_conn_ref(), client_id, params.sessions).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), client)))
}


#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod store_tests {
    use super::*;
    use crate::test_support::{app_state, config};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn remaining_sessions_reads_the_package_balance() {
        let now = Utc::now().fixed_offset();
        let client = clients::Model {
            id: Id::new_v4(),
            name: "Jordan Reyes".to_string(),
            phone: "+15555550123".to_string(),
            email: None,
            notes: String::new(),
            trainer_id: None,
            package_size: 10,
            sessions_remaining: 4,
            last_session_at: None,
            created_at: now,
            updated_at: now,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![client.clone()]])
            .into_connection();

        let response = remaining_sessions(State(app_state(db, config(&[]))), Path(client.id))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["data"]["sessions_remaining"], 4);
        assert_eq!(json["data"]["package_size"], 10);
    }
}
