use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum CompletedTransfers {
    Table,
    Id,
    FileName,
    TransferType,
    State,
    Size,
    NodeIdentifier,
    Path,
    Timestamp,
    Error,
    AppData,
}

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000003_create_completed_transfers_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CompletedTransfers::Table)
                    .col(
                        ColumnDef::new(CompletedTransfers::Id)
                            .integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(
                        ColumnDef::new(CompletedTransfers::FileName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CompletedTransfers::TransferType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CompletedTransfers::State).string().not_null())
                    .col(
                        ColumnDef::new(CompletedTransfers::Size)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CompletedTransfers::NodeIdentifier)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CompletedTransfers::Path).string().not_null())
                    .col(
                        ColumnDef::new(CompletedTransfers::Timestamp)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CompletedTransfers::Error).string())
                    .col(
                        ColumnDef::new(CompletedTransfers::AppData)
                            .string()
                            .not_null()
                            .default("[]"),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_completed_transfers_timestamp")
                    .table(CompletedTransfers::Table)
                    .col(CompletedTransfers::Timestamp)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CompletedTransfers::Table).to_owned())
            .await
    }
}
