use crate::clients::Model;
use crate::error::Error;
use crate::retry::read_with_backoff;
use crate::Id;
use entity_api::client;
use log::*;
use sea_orm::DatabaseConnection;

/// Fields accepted when registering a client.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClient {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub notes: String,
    pub trainer_id: Option<Id>,
    pub package_size: i32,
}

/// Normalizes a phone number to `+<digits>`.
///
/// Spaces, dashes, dots and parentheses are ignored. Ten-digit numbers are assumed to be
/// North American and get a `+1` prefix. Anything outside 10 to 15 digits is rejected.
pub fn normalize_phone(raw: &str) -> Result<String, Error> {
    let raw = raw.trim();
    let invalid = || Error::validation(format!("'{raw}' is not a valid phone number"));

    if raw
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '(' | ')' | '+')))
    {
        return Err(invalid());
    }

    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        10 if !raw.starts_with('+') => Ok(format!("+1{digits}")),
        10..=15 => Ok(format!("+{digits}")),
        _ => Err(invalid()),
    }
}

pub async fn create(db: &DatabaseConnection, new_client: NewClient) -> Result<Model, Error> {
    let name = new_client.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::validation("A client name is required"));
    }
    if new_client.package_size < 0 {
        return Err(Error::validation("Package size cannot be negative"));
    }
    let phone = normalize_phone(&new_client.phone)?;

    if client::find_by_phone(db, &phone).await?.is_some() {
        return Err(Error::conflict(format!(
            "A client with phone number {phone} already exists"
        )));
    }

    let now = chrono::Utc::now().fixed_offset();
    let model = Model {
        id: Id::nil(),
        name,
        phone: phone.clone(),
        email: new_client.email.filter(|email| !email.trim().is_empty()),
        notes: new_client.notes,
        trainer_id: new_client.trainer_id,
        package_size: new_client.package_size,
        sessions_remaining: new_client.package_size,
        last_session_at: None,
        created_at: now,
        updated_at: now,
    };

    match client::create(db, model).await {
        Ok(client) => {
            info!("Created client {} ({})", client.id, client.phone);
            Ok(client)
        }
        // Lost a race with a concurrent registration of the same number.
        Err(err) => {
            let err: Error = err.into();
            if err.is_conflict() {
                Err(Error::conflict(format!(
                    "A client with phone number {phone} already exists"
                )))
            } else {
                Err(err)
            }
        }
    }
}

pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    read_with_backoff("find client", move || async move {
        Ok(client::find_by_id(db, id).await?)
    })
    .await
}

/// Looks a client up by any reasonable spelling of their phone number.
pub async fn find_by_phone(db: &DatabaseConnection, phone: &str) -> Result<Option<Model>, Error> {
    let phone = normalize_phone(phone)?;
    let phone = phone.as_str();
    read_with_backoff("find client by phone", move || async move {
        Ok(client::find_by_phone(db, phone).await?)
    })
    .await
}

pub async fn sessions_remaining(db: &DatabaseConnection, id: Id) -> Result<i32, Error> {
    Ok(find_by_id(db, id).await?.sessions_remaining)
}

/// Records the purchase of a package of `sessions`.
pub async fn add_package(db: &DatabaseConnection, id: Id, sessions: i32) -> Result<Model, Error> {
    if sessions <= 0 {
        return Err(Error::validation("A package must contain at least one session"));
    }

    let client = client::add_package(db, id, sessions).await?;
    info!(
        "Client {} bought {} sessions; {} remaining",
        client.id, sessions, client.sessions_remaining
    );
    Ok(client)
}

/// Uses one session from the client's package and returns what is left.
///
/// The count never goes below zero: a client already at zero is logged and left alone.
pub async fn decrement_sessions_remaining(db: &DatabaseConnection, id: Id) -> Result<i32, Error> {
    let now = chrono::Utc::now().fixed_offset();
    let rows = client::decrement_sessions_remaining(db, id, now).await?;

    let client = find_by_id(db, id).await?;
    if rows == 0 {
        warn!(
            "Client {} has no sessions remaining in their package; not decrementing",
            client.id
        );
    }

    Ok(client.sessions_remaining)
}


#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod store_tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn client_model(sessions_remaining: i32) -> Model {
        let now = chrono::Utc::now().fixed_offset();
        Model {
            id: Id::new_v4(),
            name: "Jordan Reyes".to_string(),
            phone: "+15555550123".to_string(),
            email: None,
            notes: String::new(),
            trainer_id: None,
            package_size: 10,
            sessions_remaining,
            last_session_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn new_client() -> NewClient {
        NewClient {
            name: "Jordan Reyes".to_string(),
            phone: "555-555-0123".to_string(),
            email: None,
            notes: String::new(),
            trainer_id: None,
            package_size: 10,
        }
    }

    #[tokio::test]
    async fn create_rejects_a_duplicate_phone_number() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![client_model(10)]])
            .into_connection();

        let err = create(&db, new_client()).await.unwrap_err();

        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn create_requires_a_name() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let mut client = new_client();
        client.name = "  ".to_string();

        assert!(create(&db, client).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn create_starts_with_a_full_package() -> Result<(), Error> {
        let created = client_model(10);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new()])
            .append_query_results(vec![vec![created.clone()]])
            .into_connection();

        let client = create(&db, new_client()).await?;

        assert_eq!(client.sessions_remaining, 10);
        Ok(())
    }

    #[tokio::test]
    async fn add_package_is_applied_by_the_store_in_one_update() -> Result<(), Error> {
        let mut topped_up = client_model(14);
        topped_up.package_size = 10;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![topped_up.clone()]])
            .into_connection();

        let client = add_package(&db, topped_up.id, 10).await?;

        assert_eq!(client.sessions_remaining, 14);
        let sql: Vec<String> = db
            .into_transaction_log()
            .iter()
            .flat_map(|txn| txn.statements().iter().map(|stmt| stmt.sql.clone()))
            .collect();
        assert_eq!(sql.len(), 1);
        assert!(sql[0].contains(r#""sessions_remaining" = "sessions_remaining" + "#));
        Ok(())
    }

    #[tokio::test]
    async fn add_package_for_unknown_client_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new()])
            .into_connection();

        assert!(add_package(&db, Id::new_v4(), 10)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn decrement_at_zero_returns_zero() -> Result<(), Error> {
        let client = client_model(0);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results(vec![vec![client.clone()]])
            .into_connection();

        assert_eq!(decrement_sessions_remaining(&db, client.id).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn decrement_returns_the_new_count() -> Result<(), Error> {
        let client = client_model(3);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results(vec![vec![client.clone()]])
            .into_connection();

        assert_eq!(decrement_sessions_remaining(&db, client.id).await?, 3);
        Ok(())
    }

    #[tokio::test]
    async fn decrement_for_unknown_client_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results(vec![Vec::<Model>::new()])
            .into_connection();

        let err = decrement_sessions_remaining(&db, Id::new_v4())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
