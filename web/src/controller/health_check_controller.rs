use crate::response::Health;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::agent::AgentKind;
use log::*;

/// GET service health, including whether the store answers
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "API router is up and responding to requests", body = Health),
    )
)]
pub async fn health_check(State(app_state): State<AppState>) -> impl IntoResponse {
    let database_connected = match app_state.db_conn_ref().ping().await {
        Ok(()) => true,
        Err(err) => {
            warn!("Health check could not reach the database: {err}");
            false
        }
    };

    (
        StatusCode::OK,
        Json(Health {
            status: "healthy".to_string(),
            session_agent: matches!(app_state.agent, AgentKind::Session(_)),
            database_connected,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{app_state, config};
    use sea_orm::DatabaseConnection;

    #[tokio::test]
    async fn health_reports_a_missing_database() {
        let state = app_state(DatabaseConnection::Disconnected, config(&[]));

        let response = health_check(State(state)).await.into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["session_agent"], true);
        assert_eq!(health["database_connected"], false);
    }
}
