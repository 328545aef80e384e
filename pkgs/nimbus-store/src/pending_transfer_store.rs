//! Pending transfer store - transfers requested by the user but not yet owned by the SDK

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use nimbus_transfers::{
    InsertPendingTransferRequest, PendingTransfer, PendingTransferRepository,
    PendingTransferState, TransferType, UriPath,
};
use sea_orm::{
    prelude::Expr, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::{debug, info};

use crate::changes::ChangeNotifier;
use crate::entities::pending_transfers;
use crate::error::{Result, StoreError};

const ALL_STATES: [PendingTransferState; 4] = [
    PendingTransferState::NotSentToSdk,
    PendingTransferState::SdkScanning,
    PendingTransferState::SdkScanned,
    PendingTransferState::ErrorStarting,
];

fn model_to_pending_transfer(model: pending_transfers::Model) -> Result<PendingTransfer> {
    Ok(PendingTransfer {
        id: model.id,
        transfer_type: TransferType::parse(&model.transfer_type)
            .ok_or_else(|| StoreError::invalid("transfer_type", &model.transfer_type))?,
        node_identifier: serde_json::from_str(&model.node_identifier)?,
        uri_path: UriPath::parse(&model.uri_path),
        app_data: serde_json::from_str(&model.app_data)?,
        is_high_priority: model.is_high_priority,
        state: PendingTransferState::parse(&model.state)
            .ok_or_else(|| StoreError::invalid("state", &model.state))?,
        file_name: model.file_name,
        started_files: model.started_files.max(0) as u32,
        already_transferred: model.already_transferred.max(0) as u32,
    })
}

/// States from which a transfer may move to `target`
fn predecessors_of(target: PendingTransferState) -> Vec<&'static str> {
    ALL_STATES
        .iter()
        .filter(|state| state.can_transition_to(target))
        .map(|state| state.as_str())
        .collect()
}

pub struct PendingTransferStore {
    db: DatabaseConnection,
    changes: ChangeNotifier,
}

impl PendingTransferStore {
    pub fn new(db: DatabaseConnection, changes: ChangeNotifier) -> Self {
        Self { db, changes }
    }

    pub async fn get_by_type_and_state(
        &self,
        transfer_type: TransferType,
        state: PendingTransferState,
    ) -> Result<Vec<PendingTransfer>> {
        query_by_type_and_state(&self.db, transfer_type, state).await
    }

    pub async fn insert(
        &self,
        requests: Vec<InsertPendingTransferRequest>,
    ) -> Result<Vec<PendingTransfer>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let now = chrono::Utc::now().timestamp_millis();
        let txn = self.db.begin().await?;
        let mut ids = Vec::with_capacity(requests.len());

        for request in &requests {
            let model = pending_transfers::ActiveModel {
                transfer_type: Set(request.transfer_type.as_str().to_string()),
                node_identifier: Set(serde_json::to_string(&request.node_identifier)?),
                uri_path: Set(request.uri_path.to_string()),
                app_data: Set(serde_json::to_string(&request.app_data)?),
                is_high_priority: Set(request.is_high_priority),
                state: Set(PendingTransferState::NotSentToSdk.as_str().to_string()),
                file_name: Set(request.file_name.clone()),
                started_files: Set(0),
                already_transferred: Set(0),
                created_at: Set(now),
                ..Default::default()
            };
            let result = pending_transfers::Entity::insert(model)
                .exec(&txn)
                .await?;
            ids.push(result.last_insert_id);
        }

        txn.commit().await?;
        self.changes.notify();
        info!("Inserted {} pending transfers", ids.len());

        let models = pending_transfers::Entity::find()
            .filter(pending_transfers::Column::Id.is_in(ids))
            .order_by_asc(pending_transfers::Column::Id)
            .all(&self.db)
            .await?;
        models.into_iter().map(model_to_pending_transfer).collect()
    }

    pub async fn get(&self, id: i64) -> Result<Option<PendingTransfer>> {
        pending_transfers::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(model_to_pending_transfer)
            .transpose()
    }

    /// Only rows currently in a state that may move to `state` are updated.
    /// Returns the ids that actually moved.
    pub async fn update_state(
        &self,
        ids: &[i64],
        state: PendingTransferState,
    ) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let txn = self.db.begin().await?;
        let mut moved = Vec::with_capacity(ids.len());
        for &id in ids {
            let result = pending_transfers::Entity::update_many()
                .col_expr(pending_transfers::Column::State, Expr::value(state.as_str()))
                .filter(pending_transfers::Column::Id.eq(id))
                .filter(pending_transfers::Column::State.is_in(predecessors_of(state)))
                .exec(&txn)
                .await?;
            if result.rows_affected > 0 {
                moved.push(id);
            }
        }
        txn.commit().await?;

        if !moved.is_empty() {
            self.changes.notify();
        }
        debug!(
            "Moved {}/{} pending transfers to {}",
            moved.len(),
            ids.len(),
            state.as_str()
        );
        Ok(moved)
    }

    pub async fn update_started_count(
        &self,
        id: i64,
        started_files: u32,
        already_transferred: u32,
    ) -> Result<()> {
        pending_transfers::Entity::update_many()
            .col_expr(
                pending_transfers::Column::StartedFiles,
                Expr::value(started_files as i32),
            )
            .col_expr(
                pending_transfers::Column::AlreadyTransferred,
                Expr::value(already_transferred as i32),
            )
            .filter(pending_transfers::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        self.changes.notify();
        Ok(())
    }

    pub async fn delete_resolved(&self) -> Result<u64> {
        let terminal: Vec<&str> = ALL_STATES
            .iter()
            .filter(|state| state.is_terminal())
            .map(|state| state.as_str())
            .collect();

        let result = pending_transfers::Entity::delete_many()
            .filter(pending_transfers::Column::State.is_in(terminal))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            self.changes.notify();
            info!("Deleted {} resolved pending transfers", result.rows_affected);
        }
        Ok(result.rows_affected)
    }
}

async fn query_by_type_and_state(
    db: &DatabaseConnection,
    transfer_type: TransferType,
    state: PendingTransferState,
) -> Result<Vec<PendingTransfer>> {
    let models = pending_transfers::Entity::find()
        .filter(pending_transfers::Column::TransferType.eq(transfer_type.as_str()))
        .filter(pending_transfers::Column::State.eq(state.as_str()))
        .order_by_desc(pending_transfers::Column::IsHighPriority)
        .order_by_asc(pending_transfers::Column::Id)
        .all(db)
        .await?;
    models.into_iter().map(model_to_pending_transfer).collect()
}

#[async_trait]
impl PendingTransferRepository for PendingTransferStore {
    fn monitor_pending_transfers_by_type_and_state(
        &self,
        transfer_type: TransferType,
        state: PendingTransferState,
    ) -> BoxStream<'static, nimbus_transfers::Result<Vec<PendingTransfer>>> {
        let db = self.db.clone();
        self.changes
            .changes()
            .then(move |_| {
                let db = db.clone();
                async move {
                    query_by_type_and_state(&db, transfer_type, state)
                        .await
                        .map_err(Into::into)
                }
            })
            .boxed()
    }

    async fn insert_pending_transfers(
        &self,
        requests: Vec<InsertPendingTransferRequest>,
    ) -> nimbus_transfers::Result<Vec<PendingTransfer>> {
        Ok(self.insert(requests).await?)
    }

    async fn get_pending_transfer(
        &self,
        id: i64,
    ) -> nimbus_transfers::Result<Option<PendingTransfer>> {
        Ok(self.get(id).await?)
    }

    async fn update_pending_transfer_state(
        &self,
        ids: &[i64],
        state: PendingTransferState,
    ) -> nimbus_transfers::Result<Vec<i64>> {
        Ok(self.update_state(ids, state).await?)
    }

    async fn update_pending_transfer_started_count(
        &self,
        id: i64,
        started_files: u32,
        already_transferred: u32,
    ) -> nimbus_transfers::Result<()> {
        Ok(self
            .update_started_count(id, started_files, already_transferred)
            .await?)
    }

    async fn delete_resolved_pending_transfers(&self) -> nimbus_transfers::Result<u64> {
        Ok(self.delete_resolved().await?)
    }
}
