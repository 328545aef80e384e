//! Active transfer store - records of transfers the SDK is currently tracking

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use nimbus_transfers::{ActiveTransfer, ActiveTransferRepository, TransferType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::{debug, info};

use crate::changes::ChangeNotifier;
use crate::entities::active_transfers;
use crate::error::{Result, StoreError};

fn model_to_active_transfer(model: active_transfers::Model) -> Result<ActiveTransfer> {
    Ok(ActiveTransfer {
        tag: model.tag,
        transfer_type: TransferType::parse(&model.transfer_type)
            .ok_or_else(|| StoreError::invalid("transfer_type", &model.transfer_type))?,
        file_name: model.file_name,
        total_bytes: model.total_bytes.max(0) as u64,
        transferred_bytes: model.transferred_bytes.max(0) as u64,
        is_finished: model.is_finished,
        is_folder: model.is_folder,
        is_paused: model.is_paused,
        is_already_transferred: model.is_already_transferred,
        is_cancelled: model.is_cancelled,
        app_data: serde_json::from_str(&model.app_data)?,
    })
}

pub struct ActiveTransferStore {
    db: DatabaseConnection,
    changes: ChangeNotifier,
}

impl ActiveTransferStore {
    pub fn new(db: DatabaseConnection, changes: ChangeNotifier) -> Self {
        Self { db, changes }
    }

    /// Store or update an active transfer, keyed by its tag
    pub async fn upsert(&self, transfer: &ActiveTransfer) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let app_data = serde_json::to_string(&transfer.app_data)?;

        let existing = active_transfers::Entity::find_by_id(transfer.tag)
            .one(&self.db)
            .await?;

        if let Some(existing) = existing {
            let mut active_model: active_transfers::ActiveModel = existing.into();
            active_model.transfer_type = Set(transfer.transfer_type.as_str().to_string());
            active_model.file_name = Set(transfer.file_name.clone());
            active_model.total_bytes = Set(transfer.total_bytes as i64);
            active_model.transferred_bytes = Set(transfer.transferred_bytes as i64);
            active_model.is_finished = Set(transfer.is_finished);
            active_model.is_folder = Set(transfer.is_folder);
            active_model.is_paused = Set(transfer.is_paused);
            active_model.is_already_transferred = Set(transfer.is_already_transferred);
            active_model.is_cancelled = Set(transfer.is_cancelled);
            active_model.app_data = Set(app_data);
            active_model.updated_at = Set(now);
            active_model.update(&self.db).await?;
        } else {
            let new_transfer = active_transfers::ActiveModel {
                tag: Set(transfer.tag),
                transfer_type: Set(transfer.transfer_type.as_str().to_string()),
                file_name: Set(transfer.file_name.clone()),
                total_bytes: Set(transfer.total_bytes as i64),
                transferred_bytes: Set(transfer.transferred_bytes as i64),
                is_finished: Set(transfer.is_finished),
                is_folder: Set(transfer.is_folder),
                is_paused: Set(transfer.is_paused),
                is_already_transferred: Set(transfer.is_already_transferred),
                is_cancelled: Set(transfer.is_cancelled),
                app_data: Set(app_data),
                updated_at: Set(now),
            };
            match new_transfer.insert(&self.db).await {
                Ok(_) | Err(DbErr::RecordNotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        self.changes.notify();
        debug!(
            "Stored active transfer {} ({}/{} bytes)",
            transfer.tag, transfer.transferred_bytes, transfer.total_bytes
        );
        Ok(())
    }

    pub async fn get_by_type(&self, transfer_type: TransferType) -> Result<Vec<ActiveTransfer>> {
        query_by_type(&self.db, transfer_type).await
    }

    pub async fn delete_finished(&self) -> Result<u64> {
        let result = active_transfers::Entity::delete_many()
            .filter(active_transfers::Column::IsFinished.eq(true))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            self.changes.notify();
            info!("Deleted {} finished active transfers", result.rows_affected);
        }
        Ok(result.rows_affected)
    }
}

async fn query_by_type(
    db: &DatabaseConnection,
    transfer_type: TransferType,
) -> Result<Vec<ActiveTransfer>> {
    let models = active_transfers::Entity::find()
        .filter(active_transfers::Column::TransferType.eq(transfer_type.as_str()))
        .order_by_asc(active_transfers::Column::Tag)
        .all(db)
        .await?;
    models.into_iter().map(model_to_active_transfer).collect()
}

#[async_trait]
impl ActiveTransferRepository for ActiveTransferStore {
    async fn insert_or_update_active_transfer(
        &self,
        transfer: &ActiveTransfer,
    ) -> nimbus_transfers::Result<()> {
        Ok(self.upsert(transfer).await?)
    }

    async fn get_active_transfers_by_type(
        &self,
        transfer_type: TransferType,
    ) -> nimbus_transfers::Result<Vec<ActiveTransfer>> {
        Ok(self.get_by_type(transfer_type).await?)
    }

    fn monitor_active_transfers_by_type(
        &self,
        transfer_type: TransferType,
    ) -> BoxStream<'static, nimbus_transfers::Result<Vec<ActiveTransfer>>> {
        let db = self.db.clone();
        self.changes
            .changes()
            .then(move |_| {
                let db = db.clone();
                async move { query_by_type(&db, transfer_type).await.map_err(Into::into) }
            })
            .boxed()
    }

    async fn delete_finished_active_transfers(&self) -> nimbus_transfers::Result<u64> {
        Ok(self.delete_finished().await?)
    }
}
