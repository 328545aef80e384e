//! Pending transfer entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_transfers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub transfer_type: String,   // TransferType::as_str
    pub node_identifier: String, // NodeId as JSON
    pub uri_path: String,
    pub app_data: String, // Vec<AppData> as JSON
    pub is_high_priority: bool,
    pub state: String, // PendingTransferState::as_str
    pub file_name: Option<String>,
    pub started_files: i32,
    pub already_transferred: i32,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
