// In-memory collaborators shared by the use-case tests

#![allow(dead_code)]

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::stream::{self, BoxStream, StreamExt};
use nimbus_transfers::{
    ActiveTransfer, ActiveTransferRepository, AppData, CompletedTransfer,
    CompletedTransferRepository, Feature, FeatureFlagRepository, FileSystemRepository,
    InsertPendingTransferRequest, NodeId, NodeKind, NodeRepository, PendingTransfer,
    PendingTransferRepository, PendingTransferState, Result, StateFlow, Transfer,
    TransferDependencies, TransferError, TransferEvent, TransferFlags, TransferSdk,
    TransferServices, TransferType, TypedNode, UriPath,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub struct InMemoryPendingTransfers {
    transfers: StateFlow<Vec<PendingTransfer>>,
    next_id: Mutex<i64>,
    monitor_override: Mutex<Option<mpsc::UnboundedReceiver<Result<Vec<PendingTransfer>>>>>,
    pub fail_state_updates: Mutex<bool>,
}

impl InMemoryPendingTransfers {
    pub fn new() -> Self {
        Self {
            transfers: StateFlow::new(Vec::new()),
            next_id: Mutex::new(1),
            monitor_override: Mutex::new(None),
            fail_state_updates: Mutex::new(false),
        }
    }

    /// Replace the monitored batches with whatever the returned sender pushes
    pub fn script_batches(&self) -> mpsc::UnboundedSender<Result<Vec<PendingTransfer>>> {
        let (tx, rx) = mpsc::unbounded();
        *self.monitor_override.lock() = Some(rx);
        tx
    }

    pub fn seed(&self, pending: PendingTransfer) {
        self.transfers.update(|all| all.push(pending));
    }

    pub fn all(&self) -> Vec<PendingTransfer> {
        self.transfers.value()
    }

    pub fn get(&self, id: i64) -> Option<PendingTransfer> {
        self.all().into_iter().find(|p| p.id == id)
    }
}

#[async_trait]
impl PendingTransferRepository for InMemoryPendingTransfers {
    fn monitor_pending_transfers_by_type_and_state(
        &self,
        transfer_type: TransferType,
        state: PendingTransferState,
    ) -> BoxStream<'static, Result<Vec<PendingTransfer>>> {
        if let Some(scripted) = self.monitor_override.lock().take() {
            return scripted.boxed();
        }
        self.transfers
            .subscribe()
            .map(move |all| {
                Ok(all
                    .into_iter()
                    .filter(|p| p.transfer_type == transfer_type && p.state == state)
                    .collect())
            })
            .boxed()
    }

    async fn insert_pending_transfers(
        &self,
        requests: Vec<InsertPendingTransferRequest>,
    ) -> Result<Vec<PendingTransfer>> {
        let mut inserted = Vec::new();
        for request in requests {
            let id = {
                let mut next = self.next_id.lock();
                let id = *next;
                *next += 1;
                id
            };
            inserted.push(PendingTransfer {
                id,
                transfer_type: request.transfer_type,
                node_identifier: request.node_identifier,
                uri_path: request.uri_path,
                app_data: request.app_data,
                is_high_priority: request.is_high_priority,
                state: PendingTransferState::NotSentToSdk,
                file_name: request.file_name,
                started_files: 0,
                already_transferred: 0,
            });
        }
        let copy = inserted.clone();
        self.transfers.update(|all| all.extend(copy));
        Ok(inserted)
    }

    async fn get_pending_transfer(&self, id: i64) -> Result<Option<PendingTransfer>> {
        Ok(self.get(id))
    }

    async fn update_pending_transfer_state(
        &self,
        ids: &[i64],
        state: PendingTransferState,
    ) -> Result<Vec<i64>> {
        if *self.fail_state_updates.lock() {
            return Err(TransferError::Repository("state updates disabled".to_string()));
        }
        let mut moved = Vec::new();
        self.transfers.update(|all| {
            for pending in all.iter_mut().filter(|p| ids.contains(&p.id)) {
                if pending.state.can_transition_to(state) {
                    pending.state = state;
                    moved.push(pending.id);
                }
            }
        });
        Ok(moved)
    }

    async fn update_pending_transfer_started_count(
        &self,
        id: i64,
        started_files: u32,
        already_transferred: u32,
    ) -> Result<()> {
        self.transfers.update(|all| {
            if let Some(pending) = all.iter_mut().find(|p| p.id == id) {
                pending.started_files = started_files;
                pending.already_transferred = already_transferred;
            }
        });
        Ok(())
    }

    async fn delete_resolved_pending_transfers(&self) -> Result<u64> {
        let mut removed = 0;
        self.transfers.update(|all| {
            let before = all.len();
            all.retain(|p| !p.state.is_terminal());
            removed = (before - all.len()) as u64;
        });
        Ok(removed)
    }
}

pub struct InMemoryActiveTransfers {
    transfers: StateFlow<Vec<ActiveTransfer>>,
}

impl InMemoryActiveTransfers {
    pub fn new() -> Self {
        Self {
            transfers: StateFlow::new(Vec::new()),
        }
    }

    pub fn set(&self, transfers: Vec<ActiveTransfer>) {
        self.transfers.set(transfers);
    }

    pub fn all(&self) -> Vec<ActiveTransfer> {
        self.transfers.value()
    }
}

#[async_trait]
impl ActiveTransferRepository for InMemoryActiveTransfers {
    async fn insert_or_update_active_transfer(&self, transfer: &ActiveTransfer) -> Result<()> {
        let transfer = transfer.clone();
        self.transfers.update(|all| {
            match all.iter_mut().find(|t| t.tag == transfer.tag) {
                Some(existing) => *existing = transfer,
                None => all.push(transfer),
            }
        });
        Ok(())
    }

    async fn get_active_transfers_by_type(
        &self,
        transfer_type: TransferType,
    ) -> Result<Vec<ActiveTransfer>> {
        Ok(self
            .all()
            .into_iter()
            .filter(|t| t.transfer_type == transfer_type)
            .collect())
    }

    fn monitor_active_transfers_by_type(
        &self,
        transfer_type: TransferType,
    ) -> BoxStream<'static, Result<Vec<ActiveTransfer>>> {
        self.transfers
            .subscribe()
            .map(move |all| {
                Ok(all
                    .into_iter()
                    .filter(|t| t.transfer_type == transfer_type)
                    .collect())
            })
            .boxed()
    }

    async fn delete_finished_active_transfers(&self) -> Result<u64> {
        let mut removed = 0;
        self.transfers.update(|all| {
            let before = all.len();
            all.retain(|t| !t.is_finished);
            removed = (before - all.len()) as u64;
        });
        Ok(removed)
    }
}

#[derive(Default)]
pub struct InMemoryCompletedTransfers {
    transfers: Mutex<Vec<CompletedTransfer>>,
}

impl InMemoryCompletedTransfers {
    pub fn all(&self) -> Vec<CompletedTransfer> {
        self.transfers.lock().clone()
    }
}

#[async_trait]
impl CompletedTransferRepository for InMemoryCompletedTransfers {
    async fn add_completed_transfer(&self, transfer: &CompletedTransfer) -> Result<i64> {
        let mut all = self.transfers.lock();
        let id = all.len() as i64 + 1;
        let mut transfer = transfer.clone();
        transfer.id = Some(id);
        all.push(transfer);
        Ok(id)
    }

    async fn get_completed_transfers(&self, limit: Option<u64>) -> Result<Vec<CompletedTransfer>> {
        let all = self.all();
        Ok(match limit {
            Some(limit) => all.into_iter().take(limit as usize).collect(),
            None => all,
        })
    }
}

#[derive(Default)]
pub struct FakeNodes {
    nodes: Mutex<HashMap<NodeId, TypedNode>>,
    failing: Mutex<HashSet<NodeId>>,
}

impl FakeNodes {
    pub fn add_file(&self, handle: u64, name: &str, size: u64) -> NodeId {
        let id = NodeId::CloudDrive { handle };
        self.nodes.lock().insert(
            id.clone(),
            TypedNode {
                id: id.clone(),
                name: name.to_string(),
                kind: NodeKind::File { size },
            },
        );
        id
    }

    pub fn add_folder(&self, handle: u64, name: &str) -> NodeId {
        let id = NodeId::CloudDrive { handle };
        self.nodes.lock().insert(
            id.clone(),
            TypedNode {
                id: id.clone(),
                name: name.to_string(),
                kind: NodeKind::Folder,
            },
        );
        id
    }

    pub fn fail_lookup(&self, id: NodeId) {
        self.failing.lock().insert(id);
    }
}

#[async_trait]
impl NodeRepository for FakeNodes {
    async fn get_node(&self, id: &NodeId) -> Result<Option<TypedNode>> {
        if self.failing.lock().contains(id) {
            return Err(TransferError::Sdk(format!("lookup failed for {id}")));
        }
        Ok(self.nodes.lock().get(id).cloned())
    }
}

/// SDK double replaying a scripted event list per node
#[derive(Default)]
pub struct FakeSdk {
    scripts: Mutex<HashMap<NodeId, Vec<std::result::Result<TransferEvent, String>>>>,
    pub requests: Mutex<Vec<(NodeId, UriPath, Vec<AppData>, bool)>>,
}

impl FakeSdk {
    pub fn script(&self, id: NodeId, events: Vec<std::result::Result<TransferEvent, String>>) {
        self.scripts.lock().insert(id, events);
    }
}

impl TransferSdk for FakeSdk {
    fn download_node(
        &self,
        node: &TypedNode,
        destination: &UriPath,
        app_data: &[AppData],
        is_high_priority: bool,
    ) -> BoxStream<'static, Result<TransferEvent>> {
        self.requests.lock().push((
            node.id.clone(),
            destination.clone(),
            app_data.to_vec(),
            is_high_priority,
        ));
        let events = self
            .scripts
            .lock()
            .get(&node.id)
            .cloned()
            .unwrap_or_default();
        let app_data = app_data.to_vec();
        stream::iter(events.into_iter().map(move |event| {
            let mut event = event.map_err(TransferError::Sdk)?;
            // The SDK hands the requested app data back on every transfer it reports
            let (TransferEvent::Start { transfer }
            | TransferEvent::Update { transfer }
            | TransferEvent::Finish { transfer, .. }
            | TransferEvent::FolderUpdate { transfer, .. }
            | TransferEvent::TemporaryError { transfer, .. }
            | TransferEvent::Pause { transfer, .. }) = &mut event;
            if transfer.app_data.is_empty() {
                transfer.app_data = app_data.clone();
            }
            Ok(event)
        }))
        .boxed()
    }
}

pub struct FakeFileSystem {
    pub sd_card_root: PathBuf,
    pub cache_folder: Option<PathBuf>,
}

#[async_trait]
impl FileSystemRepository for FakeFileSystem {
    fn is_sd_card_path(&self, path: &Path) -> bool {
        path.starts_with(&self.sd_card_root)
    }

    fn is_sd_card_content_uri(&self, uri: &str) -> bool {
        uri.starts_with("content://com.android.externalstorage.documents/tree/1234-5678")
    }

    fn is_external_storage_content_uri(&self, uri: &str) -> bool {
        uri.starts_with("content://com.android.externalstorage.documents/tree/primary")
    }

    async fn get_or_create_sd_card_transfers_cache_folder(&self) -> Result<Option<PathBuf>> {
        Ok(self.cache_folder.clone())
    }
}

#[derive(Default)]
pub struct FakeFeatureFlags {
    pub enabled: Mutex<HashSet<Feature>>,
}

#[async_trait]
impl FeatureFlagRepository for FakeFeatureFlags {
    async fn is_enabled(&self, feature: Feature) -> Result<bool> {
        Ok(self.enabled.lock().contains(&feature))
    }
}

pub struct Harness {
    pub pending: Arc<InMemoryPendingTransfers>,
    pub active: Arc<InMemoryActiveTransfers>,
    pub completed: Arc<InMemoryCompletedTransfers>,
    pub nodes: Arc<FakeNodes>,
    pub sdk: Arc<FakeSdk>,
    pub file_system: Arc<FakeFileSystem>,
    pub feature_flags: Arc<FakeFeatureFlags>,
    pub services: TransferServices,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_file_system(FakeFileSystem {
            sd_card_root: PathBuf::from("/storage/1234-5678"),
            cache_folder: Some(PathBuf::from("/data/cache/sd_transfers")),
        })
    }

    pub fn with_file_system(file_system: FakeFileSystem) -> Self {
        let pending = Arc::new(InMemoryPendingTransfers::new());
        let active = Arc::new(InMemoryActiveTransfers::new());
        let completed = Arc::new(InMemoryCompletedTransfers::default());
        let nodes = Arc::new(FakeNodes::default());
        let sdk = Arc::new(FakeSdk::default());
        let file_system = Arc::new(file_system);
        let feature_flags = Arc::new(FakeFeatureFlags::default());

        let services = TransferServices::new(TransferDependencies {
            pending_transfers: pending.clone(),
            active_transfers: active.clone(),
            completed_transfers: completed.clone(),
            nodes: nodes.clone(),
            sdk: sdk.clone(),
            file_system: file_system.clone(),
            feature_flags: feature_flags.clone(),
            transfer_flags: StateFlow::new(TransferFlags::default()),
        });

        Self {
            pending,
            active,
            completed,
            nodes,
            sdk,
            file_system,
            feature_flags,
            services,
        }
    }
}

pub fn pending_download(id: i64, node: NodeId, app_data: Vec<AppData>) -> PendingTransfer {
    PendingTransfer {
        id,
        transfer_type: TransferType::Download,
        node_identifier: node,
        uri_path: UriPath::Path(PathBuf::from("/downloads")),
        app_data,
        is_high_priority: false,
        state: PendingTransferState::NotSentToSdk,
        file_name: None,
        started_files: 0,
        already_transferred: 0,
    }
}

pub fn sdk_transfer(tag: i32, name: &str, total: u64, transferred: u64) -> Transfer {
    Transfer {
        tag,
        transfer_type: TransferType::Download,
        file_name: name.to_string(),
        local_path: format!("/downloads/{name}"),
        node_handle: None,
        total_bytes: total,
        transferred_bytes: transferred,
        is_finished: total == transferred,
        is_folder: false,
        is_paused: false,
        is_already_transferred: false,
        is_cancelled: false,
        app_data: Vec::new(),
    }
}

/// Poll `condition` until it holds or two seconds pass
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
