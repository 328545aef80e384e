//! Sea-ORM entities for nimbus-store

pub mod active_transfers;
pub mod completed_transfers;
pub mod pending_transfers;
pub mod settings;

pub use active_transfers::Entity as ActiveTransfers;
pub use completed_transfers::Entity as CompletedTransfers;
pub use pending_transfers::Entity as PendingTransfers;
pub use settings::Entity as Settings;
