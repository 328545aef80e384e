//! Sea-ORM migrations for the nimbus-store schema

pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_pending_transfers_table;
mod m20250301_000002_create_active_transfers_table;
mod m20250301_000003_create_completed_transfers_table;
mod m20250301_000004_create_settings_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_pending_transfers_table::Migration),
            Box::new(m20250301_000002_create_active_transfers_table::Migration),
            Box::new(m20250301_000003_create_completed_transfers_table::Migration),
            Box::new(m20250301_000004_create_settings_table::Migration),
        ]
    }
}
