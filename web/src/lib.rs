use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use domain::agent::AgentKind;
use domain::gateway::VoiceServices;
use domain::outbound::Dispatcher;
use domain::settings::Settings;
use log::*;
use provider_auth::webhook::TwilioSignatureValidator;
use sea_orm::DatabaseConnection;
use secrecy::SecretString;
use service::config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub use self::error::{Error, Result};

mod controller;
mod error;
mod extractors;
mod params;
mod response;
pub mod router;

/// Everything a request handler may need. Cheap to clone: every field is shared.
#[derive(Clone)]
pub struct AppState {
    pub service_state: service::AppState,
    pub settings: Arc<Settings>,
    pub agent: AgentKind,
    pub voice: VoiceServices,
    pub dispatcher: Arc<Dispatcher>,
    /// Present when telephony webhooks must carry a valid Twilio signature.
    pub signature_validator: Option<Arc<TwilioSignatureValidator>>,
}

impl AppState {
    pub fn new(
        service_state: service::AppState,
        settings: Arc<Settings>,
        voice: VoiceServices,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        let config = &service_state.config;
        let signature_validator = match config.twilio_auth_token() {
            Some(token) if config.enforce_twilio_signature() => Some(Arc::new(
                TwilioSignatureValidator::new(SecretString::new(token)),
            )),
            _ => {
                warn!("Telephony webhook signatures are not being validated");
                None
            }
        };

        Self {
            agent: AgentKind::from_settings(&settings),
            service_state,
            settings,
            voice,
            dispatcher,
            signature_validator,
        }
    }

    pub fn db_conn_ref(&self) -> &DatabaseConnection {
        self.service_state.db_conn_ref()
    }

    pub fn config(&self) -> &Config {
        &self.service_state.config
    }
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let config = app_state.config().clone();
    let host = config.interface.as_deref().unwrap_or("127.0.0.1");
    let server_url = format!("{}:{}", host, config.port);
    let listener = TcpListener::bind(&server_url).await?;

    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    info!("CORS allowed origins: {allowed_origins:?}");

    let cors_layer = CorsLayer::new()
        .allow_methods([Method::DELETE, Method::GET, Method::POST, Method::PUT])
        .allow_credentials(true)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_origin(allowed_origins);

    info!(
        "Server starting... listening for connections on http://{server_url} (agent: {})",
        app_state.agent.name()
    );

    axum::serve(
        listener,
        router::define_routes(app_state).layer(cors_layer),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for the shutdown signal: {err}");
        return;
    }
    info!("Shutdown signal received, draining connections");
}
