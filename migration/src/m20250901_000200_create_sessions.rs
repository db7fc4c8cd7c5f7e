use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE trainer_voice.session_status AS ENUM (
                    'scheduled',
                    'completed',
                    'cancelled',
                    'no_show'
                )",
            )
            .await?;

        let create_sessions_sql = r#"
            CREATE TABLE IF NOT EXISTS trainer_voice.sessions (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                client_id UUID NOT NULL
                    REFERENCES trainer_voice.clients(id) ON DELETE CASCADE,
                client_name VARCHAR(255) NOT NULL,
                trainer_id UUID NOT NULL
                    REFERENCES trainer_voice.trainers(id) ON DELETE CASCADE,
                date_time TIMESTAMPTZ NOT NULL,
                ends_at TIMESTAMPTZ NOT NULL,
                duration_minutes INTEGER NOT NULL DEFAULT 60,
                location VARCHAR(255) NOT NULL DEFAULT 'Gym',
                status trainer_voice.session_status NOT NULL DEFAULT 'scheduled',
                reminder_sent BOOLEAN NOT NULL DEFAULT FALSE,
                reminder_sent_at TIMESTAMPTZ,
                confirmation_received BOOLEAN NOT NULL DEFAULT FALSE,
                notes TEXT NOT NULL DEFAULT '',
                idempotency_key VARCHAR(255),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT sessions_idempotency_key_unique UNIQUE(idempotency_key),
                CONSTRAINT sessions_duration_positive CHECK (duration_minutes > 0),
                CONSTRAINT sessions_ends_after_start CHECK (ends_at > date_time)
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_sessions_sql)
            .await?;

        // Two concurrent bookings that both pass the application-level conflict check
        // still cannot both commit: the loser gets SQLSTATE 23P01.
        manager
            .get_connection()
            .execute_unprepared(
                "ALTER TABLE trainer_voice.sessions
                    ADD CONSTRAINT sessions_trainer_no_overlap
                    EXCLUDE USING gist (
                        trainer_id WITH =,
                        tstzrange(date_time, ends_at, '[)') WITH &&
                    ) WHERE (status = 'scheduled')",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS trainer_voice.sessions")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP TYPE IF EXISTS trainer_voice.session_status")
            .await?;

        Ok(())
    }
}
