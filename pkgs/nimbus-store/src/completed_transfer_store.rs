//! Transfer history

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use nimbus_transfers::{
    CompletedTransfer, CompletedTransferRepository, CompletedTransferState, TransferType,
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tracing::info;

use crate::entities::completed_transfers;
use crate::error::{Result, StoreError};

fn model_to_completed_transfer(model: completed_transfers::Model) -> Result<CompletedTransfer> {
    Ok(CompletedTransfer {
        id: Some(model.id),
        file_name: model.file_name,
        transfer_type: TransferType::parse(&model.transfer_type)
            .ok_or_else(|| StoreError::invalid("transfer_type", &model.transfer_type))?,
        state: CompletedTransferState::parse(&model.state)
            .ok_or_else(|| StoreError::invalid("state", &model.state))?,
        size: model.size.max(0) as u64,
        node_identifier: serde_json::from_str(&model.node_identifier)?,
        path: model.path,
        timestamp: Utc
            .timestamp_millis_opt(model.timestamp)
            .single()
            .ok_or_else(|| StoreError::invalid("timestamp", model.timestamp.to_string()))?,
        error: model.error,
        app_data: serde_json::from_str(&model.app_data)?,
    })
}

pub struct CompletedTransferStore {
    db: DatabaseConnection,
    history_limit: Option<u64>,
}

impl CompletedTransferStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            history_limit: None,
        }
    }

    /// Keep at most `limit` entries, dropping the oldest after each insert
    pub fn with_history_limit(mut self, limit: Option<u64>) -> Self {
        self.history_limit = limit;
        self
    }

    pub async fn add(&self, transfer: &CompletedTransfer) -> Result<i64> {
        let model = completed_transfers::ActiveModel {
            file_name: Set(transfer.file_name.clone()),
            transfer_type: Set(transfer.transfer_type.as_str().to_string()),
            state: Set(transfer.state.as_str().to_string()),
            size: Set(transfer.size as i64),
            node_identifier: Set(serde_json::to_string(&transfer.node_identifier)?),
            path: Set(transfer.path.clone()),
            timestamp: Set(transfer.timestamp.timestamp_millis()),
            error: Set(transfer.error.clone()),
            app_data: Set(serde_json::to_string(&transfer.app_data)?),
            ..Default::default()
        };
        let id = completed_transfers::Entity::insert(model)
            .exec(&self.db)
            .await?
            .last_insert_id;

        info!(
            "Recorded {} transfer of {} in history",
            transfer.state.as_str(),
            transfer.file_name
        );

        if let Some(limit) = self.history_limit {
            self.prune(limit).await?;
        }
        Ok(id)
    }

    /// Newest first
    pub async fn list(&self, limit: Option<u64>) -> Result<Vec<CompletedTransfer>> {
        let models = completed_transfers::Entity::find()
            .order_by_desc(completed_transfers::Column::Timestamp)
            .order_by_desc(completed_transfers::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;
        models
            .into_iter()
            .map(model_to_completed_transfer)
            .collect()
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(completed_transfers::Entity::find().count(&self.db).await?)
    }

    async fn prune(&self, limit: u64) -> Result<u64> {
        let keep: Vec<i64> = completed_transfers::Entity::find()
            .select_only()
            .column(completed_transfers::Column::Id)
            .order_by_desc(completed_transfers::Column::Timestamp)
            .order_by_desc(completed_transfers::Column::Id)
            .limit(limit)
            .into_tuple()
            .all(&self.db)
            .await?;

        let result = completed_transfers::Entity::delete_many()
            .filter(completed_transfers::Column::Id.is_not_in(keep))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[async_trait]
impl CompletedTransferRepository for CompletedTransferStore {
    async fn add_completed_transfer(
        &self,
        transfer: &CompletedTransfer,
    ) -> nimbus_transfers::Result<i64> {
        Ok(self.add(transfer).await?)
    }

    async fn get_completed_transfers(
        &self,
        limit: Option<u64>,
    ) -> nimbus_transfers::Result<Vec<CompletedTransfer>> {
        Ok(self.list(limit).await?)
    }
}
