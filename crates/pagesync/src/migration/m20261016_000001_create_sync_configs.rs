//! Create the `sync_configs` table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncConfigs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SyncConfigs::Name).string().not_null())
                    .col(ColumnDef::new(SyncConfigs::Provider).string().not_null())
                    .col(
                        ColumnDef::new(SyncConfigs::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(SyncConfigs::Schedule)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(SyncConfigs::SourceConfig)
                            .json()
                            .not_null()
                            .default(Expr::cust("'{}'")),
                    )
                    .col(ColumnDef::new(SyncConfigs::SpaceId).string().not_null())
                    .col(ColumnDef::new(SyncConfigs::ParentPageId).string().null())
                    .col(
                        ColumnDef::new(SyncConfigs::UpdateExisting)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(SyncConfigs::Credentials)
                            .json()
                            .not_null()
                            .default(Expr::cust("'{}'")),
                    )
                    .col(
                        ColumnDef::new(SyncConfigs::SyncedPages)
                            .json()
                            .not_null()
                            .default(Expr::cust("'[]'")),
                    )
                    .col(
                        ColumnDef::new(SyncConfigs::LastSync)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SyncConfigs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SyncConfigs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // The staleness trigger looks configs up by target space.
        manager
            .create_index(
                Index::create()
                    .name("idx_sync_configs_space_id")
                    .table(SyncConfigs::Table)
                    .col(SyncConfigs::SpaceId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncConfigs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncConfigs {
    Table,
    Id,
    Name,
    Provider,
    Enabled,
    Schedule,
    SourceConfig,
    SpaceId,
    ParentPageId,
    UpdateExisting,
    Credentials,
    SyncedPages,
    LastSync,
    CreatedAt,
    UpdatedAt,
}
