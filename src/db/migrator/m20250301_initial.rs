use crate::entities::prelude::*;
use crate::entities::{devices, verification_codes};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Devices)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // One binding per (user, machine): the registry relies on this index
        // to arbitrate concurrent registrations.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_devices_user_machine")
                    .table(Devices)
                    .col(devices::Column::UserId)
                    .col(devices::Column::MachineId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(VerificationCodes)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // The expiry sweep filters on expires_at every minute.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_verification_codes_expires_at")
                    .table(VerificationCodes)
                    .col(verification_codes::Column::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(SystemConfig)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SystemConfig).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VerificationCodes).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Devices).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}
