use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE trainer_voice.call_status AS ENUM (
                    'pending',
                    'dialing',
                    'completed',
                    'failed',
                    'no_answer',
                    'abandoned'
                )",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE trainer_voice.call_purpose AS ENUM (
                    'reminder',
                    'follow_up',
                    'scheduling'
                )",
            )
            .await?;

        let create_outbound_calls_sql = r#"
            CREATE TABLE IF NOT EXISTS trainer_voice.outbound_calls (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                purpose trainer_voice.call_purpose NOT NULL,
                session_id UUID REFERENCES trainer_voice.sessions(id) ON DELETE SET NULL,
                client_id UUID REFERENCES trainer_voice.clients(id) ON DELETE SET NULL,
                to_phone VARCHAR(32) NOT NULL,
                status trainer_voice.call_status NOT NULL DEFAULT 'pending',
                attempts INTEGER NOT NULL DEFAULT 0,
                call_sid VARCHAR(64),
                next_attempt_at TIMESTAMPTZ,
                dialed_at TIMESTAMPTZ,
                last_error TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT outbound_calls_call_sid_unique UNIQUE(call_sid)
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_outbound_calls_sql)
            .await?;

        // Retry sweep: WHERE status IN ('failed', 'no_answer') AND next_attempt_at <= ?
        manager
            .create_index(
                Index::create()
                    .name("outbound_calls_status_next_attempt_at")
                    .table((Alias::new("trainer_voice"), Alias::new("outbound_calls")))
                    .col(Alias::new("status"))
                    .col(Alias::new("next_attempt_at"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("outbound_calls_session_id")
                    .table((Alias::new("trainer_voice"), Alias::new("outbound_calls")))
                    .col(Alias::new("session_id"))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS trainer_voice.outbound_calls")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP TYPE IF EXISTS trainer_voice.call_purpose")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP TYPE IF EXISTS trainer_voice.call_status")
            .await?;

        Ok(())
    }
}
