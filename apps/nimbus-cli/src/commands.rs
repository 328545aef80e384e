//! Command implementations

use anyhow::{Context, Result};
use futures::StreamExt;
use nimbus_push::{LoginCoordinator, LoginMutex, PushMessage, PushMessageWorker, WorkResult};
use nimbus_store::TransferStore;
use nimbus_transfers::{
    AppData, CompletedTransferState, DownloadRequest, Feature, PendingTransferState, StateFlow,
    TransferDependencies, TransferFlags, TransferServices, TransferType, TransfersStatusInfo,
    UriPath,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::TransfersConfig;
use crate::copy_sdk::CopySdk;
use crate::local::{node_for_path, LocalFileSystem, LocalNodes};
use crate::push::{ConsoleNotifications, OfflineChat, StoredSession, SESSION_KEY};

pub async fn open_store(config: &TransfersConfig) -> Result<TransferStore> {
    TransferStore::open(&config.store)
        .await
        .with_context(|| format!("Failed to open {}", config.store.db_path.display()))
}

pub async fn build_services(
    store: &TransferStore,
    config: &TransfersConfig,
) -> Result<TransferServices> {
    let mut last_tag = 0;
    for transfer_type in TransferType::ALL {
        let transfers = store
            .active
            .get_by_type(transfer_type)
            .await
            .context("Failed to read active transfers")?;
        last_tag = transfers.iter().map(|t| t.tag).fold(last_tag, i32::max);
    }

    Ok(TransferServices::new(TransferDependencies {
        pending_transfers: store.pending.clone(),
        active_transfers: store.active.clone(),
        completed_transfers: store.completed.clone(),
        nodes: Arc::new(LocalNodes),
        sdk: Arc::new(CopySdk::new(last_tag + 1, config.chunk_size)),
        file_system: Arc::new(LocalFileSystem::new(
            config.sd_card_root.clone(),
            config.sd_card_cache_folder.clone(),
        )),
        feature_flags: store.settings.clone(),
        transfer_flags: StateFlow::new(TransferFlags::default()),
    }))
}

pub struct EnqueueOptions {
    pub sources: Vec<PathBuf>,
    pub destination: Option<String>,
    pub high_priority: bool,
    pub preview: bool,
}

pub async fn enqueue(config: &TransfersConfig, options: EnqueueOptions) -> Result<()> {
    let store = open_store(config).await?;
    let services = build_services(&store, config).await?;

    let nodes = options
        .sources
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned());
            node_for_path(path)
                .map(|node| (node, name))
                .with_context(|| format!("Cannot enqueue {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let destination = match options.destination {
        Some(destination) => UriPath::parse(&destination),
        None => UriPath::Path(config.download_root.clone()),
    };
    let app_data = if options.preview {
        vec![AppData::PreviewDownload]
    } else {
        Vec::new()
    };

    let inserted = services
        .add_pending_downloads
        .execute(DownloadRequest {
            nodes,
            destination,
            app_data,
            is_high_priority: options.high_priority,
        })
        .await
        .context("Failed to add pending downloads")?;

    for pending in inserted {
        println!(
            "#{} {} -> {}",
            pending.id,
            pending.file_name.as_deref().unwrap_or("?"),
            pending.uri_path
        );
    }
    Ok(())
}

/// Start every pending download and follow progress until nothing is left, or forever with `follow`
pub async fn start(config: &TransfersConfig, follow: bool) -> Result<()> {
    let store = open_store(config).await?;
    let services = build_services(&store, config).await?;
    run_until_idle(&store, &services, config.idle_timeout, follow).await?;

    let finished = store.active.delete_finished().await?;
    let resolved = store.pending.delete_resolved().await?;
    debug!(
        "Cleaned up {} finished and {} resolved transfers",
        finished, resolved
    );
    Ok(())
}

pub(crate) async fn run_until_idle(
    store: &TransferStore,
    services: &TransferServices,
    idle_timeout: Duration,
    follow: bool,
) -> Result<()> {
    let mut started = services.start_all_pending_downloads.execute();
    let mut status = services.monitor_transfers_status.execute();

    loop {
        tokio::select! {
            batch = started.next() => match batch {
                Some(0) => {}
                Some(count) => info!("Sent {} downloads to the SDK", count),
                None => {
                    warn!("Pending download monitor stopped");
                    break;
                }
            },
            info = status.next() => {
                let Some(info) = info else { break };
                print_status(&info);
                if !follow && info.pending_downloads == 0 && !has_unstarted(store).await? {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            _ = tokio::time::sleep(idle_timeout), if !follow => {
                warn!("No progress for {:?}, stopping", idle_timeout);
                break;
            }
        }
    }
    Ok(())
}

async fn has_unstarted(store: &TransferStore) -> Result<bool> {
    for state in [
        PendingTransferState::NotSentToSdk,
        PendingTransferState::SdkScanning,
    ] {
        if !store
            .pending
            .get_by_type_and_state(TransferType::Download, state)
            .await?
            .is_empty()
        {
            return Ok(true);
        }
    }
    Ok(false)
}

fn print_status(info: &TransfersStatusInfo) {
    let percent = if info.total_size_to_transfer == 0 {
        100.0
    } else {
        info.total_size_transferred as f64 * 100.0 / info.total_size_to_transfer as f64
    };
    let mut line = format!(
        "{:.1}% ({}/{} bytes), {} downloads and {} uploads pending",
        percent,
        info.total_size_transferred,
        info.total_size_to_transfer,
        info.pending_downloads,
        info.pending_uploads
    );
    if info.paused {
        line.push_str(", paused");
    }
    if info.transfers_over_quota {
        line.push_str(", transfer quota exceeded");
    }
    if info.storage_over_quota {
        line.push_str(", storage full");
    }
    println!("{line}");
}

pub async fn status(config: &TransfersConfig) -> Result<()> {
    let store = open_store(config).await?;
    let services = build_services(&store, config).await?;

    if let Some(info) = services.monitor_transfers_status.execute().next().await {
        print_status(&info);
    }

    for state in [
        PendingTransferState::NotSentToSdk,
        PendingTransferState::SdkScanning,
        PendingTransferState::SdkScanned,
        PendingTransferState::ErrorStarting,
    ] {
        let pending = store
            .pending
            .get_by_type_and_state(TransferType::Download, state)
            .await?;
        for transfer in pending {
            println!(
                "#{} [{}] {} -> {}",
                transfer.id,
                state.as_str(),
                transfer
                    .file_name
                    .unwrap_or_else(|| transfer.node_identifier.to_string()),
                transfer.uri_path
            );
        }
    }
    Ok(())
}

pub async fn history(config: &TransfersConfig, limit: u64) -> Result<()> {
    let store = open_store(config).await?;

    for transfer in store.completed.list(Some(limit)).await? {
        let outcome = match transfer.state {
            CompletedTransferState::Completed => "done".to_string(),
            CompletedTransferState::Cancelled => "cancelled".to_string(),
            CompletedTransferState::Failed => format!(
                "failed: {}",
                transfer.error.as_deref().unwrap_or("unknown error")
            ),
        };
        println!(
            "{} {} ({} bytes) {}",
            transfer.timestamp.format("%Y-%m-%d %H:%M:%S"),
            transfer.file_name,
            transfer.size,
            outcome
        );
    }
    Ok(())
}

pub async fn set_feature(config: &TransfersConfig, feature: Feature, enabled: bool) -> Result<()> {
    let store = open_store(config).await?;
    store.settings.set_feature(feature, enabled).await?;
    println!(
        "{} {}",
        feature.key(),
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

pub async fn set_session(config: &TransfersConfig, session: &str) -> Result<()> {
    let store = open_store(config).await?;
    store.settings.set(SESSION_KEY, session).await?;
    Ok(())
}

pub async fn push(config: &TransfersConfig, fields: &[(String, String)]) -> Result<()> {
    let store = open_store(config).await?;
    let payload: HashMap<String, String> = fields.iter().cloned().collect();

    let chat = Arc::new(OfflineChat);
    let notifications = Arc::new(ConsoleNotifications);
    let worker = PushMessageWorker::new(
        LoginCoordinator::new(
            LoginMutex::new(),
            Arc::new(StoredSession::new(store.settings.clone())),
        ),
        chat,
        notifications,
    );

    let result = worker.do_work(&payload).await;
    let watched_chat = PushMessage::from_payload(&payload)
        .ok()
        .and_then(|message| message.chat_id());
    if let Some(watch) = watched_chat.and_then(|chat_id| worker.take_call_watch(chat_id)) {
        let chat_id = watch.chat_id();
        let resolution = watch.resolution().await;
        debug!("Call watch for chat {} ended: {:?}", chat_id, resolution);
    }

    match result {
        WorkResult::Success => Ok(()),
        WorkResult::Failure => anyhow::bail!("Push could not be handled"),
    }
}
