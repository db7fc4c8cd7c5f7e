use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS trainer_voice;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("SET search_path TO trainer_voice, public;")
            .await?;

        // gen_random_uuid() for primary keys
        manager
            .get_connection()
            .execute_unprepared("CREATE EXTENSION IF NOT EXISTS pgcrypto;")
            .await?;

        // Needed to mix uuid equality with range overlap in the sessions exclusion constraint
        manager
            .get_connection()
            .execute_unprepared("CREATE EXTENSION IF NOT EXISTS btree_gist;")
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // CASCADE removes every table and type created by later migrations
        manager
            .get_connection()
            .execute_unprepared("DROP SCHEMA IF EXISTS trainer_voice CASCADE;")
            .await?;

        Ok(())
    }
}
