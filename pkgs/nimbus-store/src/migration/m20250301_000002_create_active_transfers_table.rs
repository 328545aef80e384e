use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum ActiveTransfers {
    Table,
    Tag,
    TransferType,
    FileName,
    TotalBytes,
    TransferredBytes,
    IsFinished,
    IsFolder,
    IsPaused,
    IsAlreadyTransferred,
    IsCancelled,
    AppData,
    UpdatedAt,
}

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000002_create_active_transfers_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ActiveTransfers::Table)
                    .col(
                        ColumnDef::new(ActiveTransfers::Tag)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ActiveTransfers::TransferType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ActiveTransfers::FileName).string().not_null())
                    .col(
                        ColumnDef::new(ActiveTransfers::TotalBytes)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActiveTransfers::TransferredBytes)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActiveTransfers::IsFinished)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ActiveTransfers::IsFolder)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ActiveTransfers::IsPaused)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ActiveTransfers::IsAlreadyTransferred)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ActiveTransfers::IsCancelled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ActiveTransfers::AppData)
                            .string()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(ActiveTransfers::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ActiveTransfers::Table).to_owned())
            .await
    }
}
