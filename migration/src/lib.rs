pub use sea_orm_migration::prelude::*;

mod m20250901_000000_create_schema;
mod m20250901_000100_create_clients_and_trainers;
mod m20250901_000200_create_sessions;
mod m20250915_000000_add_session_query_indexes;
mod m20251002_000000_create_outbound_calls;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250901_000000_create_schema::Migration),
            Box::new(m20250901_000100_create_clients_and_trainers::Migration),
            Box::new(m20250901_000200_create_sessions::Migration),
            Box::new(m20250915_000000_add_session_query_indexes::Migration),
            Box::new(m20251002_000000_create_outbound_calls::Migration),
        ]
    }
}
