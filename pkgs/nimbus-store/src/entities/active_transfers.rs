//! Active transfer entity, keyed by the SDK transfer tag

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "active_transfers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tag: i32,
    pub transfer_type: String,
    pub file_name: String,
    pub total_bytes: i64,
    pub transferred_bytes: i64,
    pub is_finished: bool,
    pub is_folder: bool,
    pub is_paused: bool,
    pub is_already_transferred: bool,
    pub is_cancelled: bool,
    pub app_data: String,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
