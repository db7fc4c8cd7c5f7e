use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const SCHEMA: &str = "trainer_voice";
const TABLE: &str = "sessions";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // NOTE: SeaORM wraps migrations in transactions, preventing CONCURRENT index creation

        // Client history listing: WHERE client_id = ? ORDER BY date_time
        manager
            .create_index(
                Index::create()
                    .name("sessions_client_date_time")
                    .table((Alias::new(SCHEMA), Alias::new(TABLE)))
                    .col(Alias::new("client_id"))
                    .col(Alias::new("date_time"))
                    .to_owned(),
            )
            .await?;

        // Reminder scan: WHERE reminder_sent = false AND status = 'scheduled' AND date_time <= ?
        manager
            .create_index(
                Index::create()
                    .name("sessions_reminder_sent_status_date_time")
                    .table((Alias::new(SCHEMA), Alias::new(TABLE)))
                    .col(Alias::new("reminder_sent"))
                    .col(Alias::new("status"))
                    .col(Alias::new("date_time"))
                    .to_owned(),
            )
            .await?;

        // Availability and upcoming listings per trainer
        manager
            .create_index(
                Index::create()
                    .name("sessions_trainer_date_time")
                    .table((Alias::new(SCHEMA), Alias::new(TABLE)))
                    .col(Alias::new("trainer_id"))
                    .col(Alias::new("date_time"))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "sessions_trainer_date_time",
            "sessions_reminder_sent_status_date_time",
            "sessions_client_date_time",
        ] {
            manager
                .drop_index(
                    Index::drop()
                        .name(name)
                        .table((Alias::new(SCHEMA), Alias::new(TABLE)))
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }
}
