//! Transfer history entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "completed_transfers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub file_name: String,
    pub transfer_type: String,
    pub state: String, // "completed", "failed" or "cancelled"
    pub size: i64,
    pub node_identifier: String,
    pub path: String,
    pub timestamp: i64,
    pub error: Option<String>,
    pub app_data: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
