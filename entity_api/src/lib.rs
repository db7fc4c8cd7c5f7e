use chrono::{Duration, Utc};
use error::Error;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

pub use entity::{
    call_purpose, call_status, clients, outbound_calls, session_status, sessions, trainers, Id,
};

pub mod client;
pub mod error;
pub mod outbound_call;
pub mod session;
pub mod trainer;

pub(crate) fn uuid_parse_str(uuid_str: &str) -> Result<Id, error::Error> {
    Id::parse_str(uuid_str).map_err(|_| error::Error {
        source: None,
        error_kind: error::EntityApiErrorKind::InvalidQueryTerm,
    })
}

/// Parses an id handed over from an outer layer (path segment, config value).
pub fn parse_id(id_str: &str) -> Result<Id, error::Error> {
    uuid_parse_str(id_str.trim())
}

/// Seeds a development database with one trainer, a couple of clients and a few
/// upcoming sessions so the voice flow has something to talk about.
pub async fn seed_database(db: &DatabaseConnection) -> Result<(), Error> {
    let now = Utc::now();

    let trainer = trainers::ActiveModel {
        name: Set("Sam Okafor".to_owned()),
        phone: Set(Some("+15555550100".to_owned())),
        email: Set(Some("sam@example.com".to_owned())),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let jordan = clients::ActiveModel {
        name: Set("Jordan Reyes".to_owned()),
        phone: Set("+15555550123".to_owned()),
        email: Set(Some("jordan@example.com".to_owned())),
        notes: Set("Prefers mornings".to_owned()),
        trainer_id: Set(Some(trainer.id)),
        package_size: Set(10),
        sessions_remaining: Set(6),
        last_session_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let casey = clients::ActiveModel {
        name: Set("Casey Lin".to_owned()),
        phone: Set("+15555550124".to_owned()),
        email: Set(None),
        notes: Set(String::new()),
        trainer_id: Set(Some(trainer.id)),
        package_size: Set(5),
        sessions_remaining: Set(1),
        last_session_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    // Whole hours from now keep the seeded sessions off each other.
    for (client, hours_ahead) in [(&jordan, 20), (&casey, 44), (&jordan, 7 * 24)] {
        let start = now + Duration::hours(hours_ahead);
        sessions::ActiveModel {
            client_id: Set(client.id),
            client_name: Set(client.name.clone()),
            trainer_id: Set(trainer.id),
            date_time: Set(start.into()),
            ends_at: Set((start + Duration::minutes(60)).into()),
            duration_minutes: Set(60),
            location: Set("Gym".to_owned()),
            status: Set(session_status::SessionStatus::Scheduled),
            reminder_sent: Set(false),
            reminder_sent_at: Set(None),
            confirmation_received: Set(false),
            notes: Set(String::new()),
            idempotency_key: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    log::info!(
        "Seeded trainer {} with clients {} and {}",
        trainer.id,
        jordan.id,
        casey.id
    );

    Ok(())
}
