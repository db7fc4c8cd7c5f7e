use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let create_trainers_sql = r#"
            CREATE TABLE IF NOT EXISTS trainer_voice.trainers (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name VARCHAR(255) NOT NULL,
                phone VARCHAR(32),
                email VARCHAR(255),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_trainers_sql)
            .await?;

        let create_clients_sql = r#"
            CREATE TABLE IF NOT EXISTS trainer_voice.clients (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name VARCHAR(255) NOT NULL,
                phone VARCHAR(32) NOT NULL,
                email VARCHAR(255),
                notes TEXT NOT NULL DEFAULT '',
                trainer_id UUID REFERENCES trainer_voice.trainers(id) ON DELETE SET NULL,
                package_size INTEGER NOT NULL DEFAULT 0,
                sessions_remaining INTEGER NOT NULL DEFAULT 0,
                last_session_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT clients_phone_unique UNIQUE(phone),
                CONSTRAINT clients_sessions_remaining_non_negative CHECK (sessions_remaining >= 0)
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_clients_sql)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS trainer_voice.clients")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS trainer_voice.trainers")
            .await?;

        Ok(())
    }
}
