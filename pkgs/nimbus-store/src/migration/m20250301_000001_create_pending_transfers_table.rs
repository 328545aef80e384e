use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum PendingTransfers {
    Table,
    Id,
    TransferType,
    NodeIdentifier,
    UriPath,
    AppData,
    IsHighPriority,
    State,
    FileName,
    StartedFiles,
    AlreadyTransferred,
    CreatedAt,
}

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000001_create_pending_transfers_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PendingTransfers::Table)
                    .col(
                        ColumnDef::new(PendingTransfers::Id)
                            .integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(
                        ColumnDef::new(PendingTransfers::TransferType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PendingTransfers::NodeIdentifier)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PendingTransfers::UriPath).string().not_null())
                    .col(
                        ColumnDef::new(PendingTransfers::AppData)
                            .string()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(PendingTransfers::IsHighPriority)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PendingTransfers::State)
                            .string()
                            .not_null()
                            .default("not_sent_to_sdk"),
                    )
                    .col(ColumnDef::new(PendingTransfers::FileName).string())
                    .col(
                        ColumnDef::new(PendingTransfers::StartedFiles)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PendingTransfers::AlreadyTransferred)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PendingTransfers::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pending_transfers_type_state")
                    .table(PendingTransfers::Table)
                    .col(PendingTransfers::TransferType)
                    .col(PendingTransfers::State)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PendingTransfers::Table).to_owned())
            .await
    }
}
