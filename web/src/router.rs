use crate::{controller::health_check_controller, params, response, AppState};
use axum::{
    routing::{get, post, put},
    Router,
};

use crate::controller::{
    client_controller, outbound_call_controller, session_controller, telephony_controller,
    trainer_controller,
};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Trainer Voice API"
        ),
        paths(
            health_check_controller::health_check,
            session_controller::upcoming,
            session_controller::reminders,
            session_controller::stats,
            session_controller::create,
            session_controller::reschedule,
            session_controller::cancel,
            session_controller::complete,
            session_controller::no_show,
            session_controller::confirm,
            client_controller::create,
            client_controller::sessions,
            client_controller::remaining_sessions,
            client_controller::add_package,
            trainer_controller::available_slots,
            outbound_call_controller::send_reminders,
            outbound_call_controller::test_call,
            outbound_call_controller::bulk_calls,
            telephony_controller::inbound,
            telephony_controller::outbound,
            telephony_controller::turn,
            telephony_controller::speech,
            telephony_controller::status,
        ),
        components(
            schemas(
                domain::clients::Model,
                domain::outbound_calls::Model,
                domain::sessions::Model,
                domain::trainers::Model,
                params::client::CreateParams,
                params::client::PackageParams,
                params::outbound_call::TestCallParams,
                params::outbound_call::BulkCallParams,
                params::session::CreateParams,
                params::session::RescheduleParams,
                params::session::CancelParams,
                response::Health,
                response::RemainingSessions,
                response::AvailableSlots,
                response::DispatchSummary,
                response::BulkCallOutcome,
                response::BulkCalls,
                response::SessionStats,
            )
        ),
        tags(
            (name = "trainer_voice", description = "Voice scheduling assistant for a personal training business")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes(app_state.clone()))
        .merge(session_routes(app_state.clone()))
        .merge(client_routes(app_state.clone()))
        .merge(trainer_routes(app_state.clone()))
        .merge(outbound_call_routes(app_state.clone()))
        .merge(telephony_routes(app_state))
        // **** FIXME: protect the OpenAPI web UI
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check_controller::health_check))
        .with_state(app_state)
}

fn session_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sessions", post(session_controller::create))
        .route("/sessions/upcoming", get(session_controller::upcoming))
        .route("/sessions/reminders", get(session_controller::reminders))
        .route("/sessions/stats", get(session_controller::stats))
        .route(
            "/sessions/{id}/reschedule",
            put(session_controller::reschedule),
        )
        .route("/sessions/{id}/cancel", put(session_controller::cancel))
        .route("/sessions/{id}/complete", put(session_controller::complete))
        .route("/sessions/{id}/no_show", put(session_controller::no_show))
        .route("/sessions/{id}/confirm", put(session_controller::confirm))
        .with_state(app_state)
}

fn client_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/clients", post(client_controller::create))
        .route(
            "/clients/{client_id}/sessions",
            get(client_controller::sessions),
        )
        .route(
            "/clients/{client_id}/remaining-sessions",
            get(client_controller::remaining_sessions),
        )
        .route(
            "/clients/{client_id}/package",
            put(client_controller::add_package),
        )
        .with_state(app_state)
}

fn trainer_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/trainers/{trainer_id}/available_slots",
            get(trainer_controller::available_slots),
        )
        .with_state(app_state)
}

fn outbound_call_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/sessions/send-reminders",
            post(outbound_call_controller::send_reminders),
        )
        .route(
            "/test/outbound-call",
            post(outbound_call_controller::test_call),
        )
        .route(
            "/outbound-calls/bulk",
            post(outbound_call_controller::bulk_calls),
        )
        .with_state(app_state)
}

// Called by Twilio. Requests are checked against the Twilio signature by the form extractor.
fn telephony_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/telephony/inbound", post(telephony_controller::inbound))
        .route(
            "/telephony/outbound/{call_id}",
            post(telephony_controller::outbound),
        )
        .route("/telephony/turn", post(telephony_controller::turn))
        .route("/telephony/speech", get(telephony_controller::speech))
        .route("/telephony/status", post(telephony_controller::status))
        .with_state(app_state)
}
