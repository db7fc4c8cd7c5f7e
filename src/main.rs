use domain::gateway::VoiceServices;
use domain::outbound::{spawn_dispatcher, Dispatcher};
use domain::settings::Settings;
use log::{error, info};
use migration::{Migrator, MigratorTrait};
use service::{config::Config, logging::Logger};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!(
        "Starting up trainer_voice_rs ({:?} environment)...",
        config.runtime_env
    );

    let db = match service::init_database(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = Migrator::up(db.as_ref(), None).await {
        error!("Failed to apply database migrations: {e}");
        std::process::exit(1);
    }

    let settings = match Settings::from_config(&config) {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            error!("Invalid scheduling configuration: {e}");
            std::process::exit(1);
        }
    };

    let voice = match VoiceServices::from_config(&config) {
        Ok(voice) => voice,
        Err(e) => {
            error!("Failed to set up voice providers: {e}");
            std::process::exit(1);
        }
    };

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&db),
        Arc::clone(&settings),
        Arc::clone(&voice.telephony),
    ));
    let dispatcher_task = spawn_dispatcher(Arc::clone(&dispatcher));

    let app_state = web::AppState::new(
        service::AppState::new(config, &db),
        settings,
        voice,
        dispatcher,
    );

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped with an error: {e}");
    }

    dispatcher_task.abort();
    info!("trainer_voice_rs stopped");
}
