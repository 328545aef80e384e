//! Transfer SDK that copies local files, reporting progress as SDK events

use futures::channel::mpsc;
use futures::stream::{BoxStream, StreamExt};
use nimbus_transfers::{
    AppData, Result, Transfer, TransferError, TransferEvent, TransferSdk, TransferStage,
    TransferType, TypedNode, UriPath,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::local::link_path;

type EventSender = mpsc::UnboundedSender<Result<TransferEvent>>;

pub struct CopySdk {
    next_tag: Arc<AtomicI32>,
    chunk_size: usize,
}

impl CopySdk {
    /// Tags start at `first_tag` so they do not collide with persisted active transfers
    pub fn new(first_tag: i32, chunk_size: usize) -> Self {
        Self {
            next_tag: Arc::new(AtomicI32::new(first_tag)),
            chunk_size: chunk_size.max(1),
        }
    }
}

impl TransferSdk for CopySdk {
    fn download_node(
        &self,
        node: &TypedNode,
        destination: &UriPath,
        app_data: &[AppData],
        is_high_priority: bool,
    ) -> BoxStream<'static, Result<TransferEvent>> {
        let (tx, rx) = mpsc::unbounded();

        let source = link_path(&node.id);
        let target_dir = destination.as_path().cloned();
        let (Some(source), Some(target_dir)) = (source, target_dir) else {
            let _ = tx.unbounded_send(Err(TransferError::Sdk(format!(
                "Cannot copy {} into {}",
                node.id, destination
            ))));
            return rx.boxed();
        };

        let job = CopyJob {
            tag: self.next_tag.fetch_add(1, Ordering::SeqCst),
            name: node.name.clone(),
            target: target_dir.join(&node.name),
            source,
            is_folder: node.is_folder(),
            app_data: app_data.to_vec(),
            chunk_size: self.chunk_size,
        };
        debug!(
            "Copy job {} for {} (high priority: {})",
            job.tag, job.name, is_high_priority
        );

        tokio::spawn(async move {
            if let Err(e) = job.run(&tx).await {
                let _ = tx.unbounded_send(Err(e));
            }
        });
        rx.boxed()
    }
}

struct CopyJob {
    tag: i32,
    name: String,
    source: PathBuf,
    target: PathBuf,
    is_folder: bool,
    app_data: Vec<AppData>,
    chunk_size: usize,
}

fn io_error(path: &Path, e: std::io::Error) -> TransferError {
    TransferError::Sdk(format!("{}: {}", path.display(), e))
}

impl CopyJob {
    fn transfer(&self, total_bytes: u64) -> Transfer {
        Transfer {
            tag: self.tag,
            transfer_type: TransferType::Download,
            file_name: self.name.clone(),
            local_path: self.target.display().to_string(),
            node_handle: None,
            total_bytes,
            transferred_bytes: 0,
            is_finished: false,
            is_folder: self.is_folder,
            is_paused: false,
            is_already_transferred: false,
            is_cancelled: false,
            app_data: self.app_data.clone(),
        }
    }

    async fn run(&self, tx: &EventSender) -> Result<()> {
        let files = if self.is_folder {
            let files = collect_files(&self.source).await?;
            let total = files.iter().map(|(_, size)| size).sum();
            let folder_count = files
                .iter()
                .filter_map(|(path, _)| path.parent())
                .collect::<std::collections::BTreeSet<_>>()
                .len() as u64;
            send(
                tx,
                TransferEvent::FolderUpdate {
                    transfer: self.transfer(total),
                    stage: TransferStage::TransferringFiles,
                    folder_count,
                    created_folder_count: folder_count,
                    file_count: files.len() as u64,
                },
            )?;
            files
        } else {
            let size = tokio::fs::metadata(&self.source)
                .await
                .map_err(|e| io_error(&self.source, e))?
                .len();
            vec![(self.source.clone(), size)]
        };

        let total: u64 = files.iter().map(|(_, size)| size).sum();
        let mut transfer = self.transfer(total);
        send(
            tx,
            TransferEvent::Start {
                transfer: transfer.clone(),
            },
        )?;

        if !self.is_folder && already_present(&self.target, total).await {
            info!("{} already present at {}", self.name, self.target.display());
            transfer.transferred_bytes = total;
            transfer.is_finished = true;
            transfer.is_already_transferred = true;
            return send(
                tx,
                TransferEvent::Finish {
                    transfer,
                    error: None,
                },
            );
        }

        for (file, _) in &files {
            let target = match file.strip_prefix(&self.source) {
                Ok(relative) if !relative.as_os_str().is_empty() => self.target.join(relative),
                _ => self.target.clone(),
            };
            self.copy_file(file, &target, &mut transfer, tx).await?;
        }

        self.relocate_from_cache().await;

        transfer.is_finished = true;
        send(
            tx,
            TransferEvent::Finish {
                transfer,
                error: None,
            },
        )
    }

    async fn copy_file(
        &self,
        source: &Path,
        target: &Path,
        transfer: &mut Transfer,
        tx: &EventSender,
    ) -> Result<()> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        let mut reader = tokio::fs::File::open(source)
            .await
            .map_err(|e| io_error(source, e))?;
        let mut writer = tokio::fs::File::create(target)
            .await
            .map_err(|e| io_error(target, e))?;

        let mut buffer = vec![0u8; self.chunk_size];
        loop {
            let read = reader
                .read(&mut buffer)
                .await
                .map_err(|e| io_error(source, e))?;
            if read == 0 {
                break;
            }
            writer
                .write_all(&buffer[..read])
                .await
                .map_err(|e| io_error(target, e))?;
            transfer.transferred_bytes += read as u64;
            send(
                tx,
                TransferEvent::Update {
                    transfer: transfer.clone(),
                },
            )?;
        }
        writer.flush().await.map_err(|e| io_error(target, e))
    }

    /// Removable storage downloads land in the cache folder first and move afterwards
    async fn relocate_from_cache(&self) {
        let final_target = self.app_data.iter().find_map(|data| match data {
            AppData::SdCardDownload {
                final_target_uri, ..
            } => UriPath::parse(final_target_uri).as_path().cloned(),
            _ => None,
        });
        let Some(final_dir) = final_target else {
            return;
        };

        let destination = final_dir.join(&self.name);
        let moved = match tokio::fs::create_dir_all(&final_dir).await {
            Ok(()) => tokio::fs::rename(&self.target, &destination).await,
            Err(e) => Err(e),
        };
        match moved {
            Ok(()) => info!("Moved {} to {}", self.name, destination.display()),
            Err(e) => warn!(
                "Leaving {} in cache folder, move to {} failed: {}",
                self.name,
                destination.display(),
                e
            ),
        }
    }
}

fn send(tx: &EventSender, event: TransferEvent) -> Result<()> {
    tx.unbounded_send(Ok(event))
        .map_err(|_| TransferError::Sdk("transfer listener went away".to_string()))
}

async fn already_present(target: &Path, size: u64) -> bool {
    match tokio::fs::metadata(target).await {
        Ok(metadata) => metadata.is_file() && metadata.len() == size,
        Err(_) => false,
    }
}

/// Every regular file below `root` with its size, in path order
async fn collect_files(root: &Path) -> Result<Vec<(PathBuf, u64)>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
            let metadata = entry.metadata().await.map_err(|e| io_error(&dir, e))?;
            if metadata.is_dir() {
                pending.push(entry.path());
            } else if metadata.is_file() {
                files.push((entry.path(), metadata.len()));
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::node_for_path;
    use nimbus_transfers::{NodeId, NodeKind};

    async fn events(sdk: &CopySdk, node: TypedNode, destination: &Path) -> Vec<TransferEvent> {
        sdk.download_node(
            &node,
            &UriPath::Path(destination.to_path_buf()),
            &[],
            false,
        )
        .map(|event| event.unwrap())
        .collect()
        .await
    }

    #[tokio::test]
    async fn test_file_copy_reports_start_updates_and_finish() {
        let source_dir = tempfile::tempdir().unwrap();
        let target_dir = tempfile::tempdir().unwrap();
        let source = source_dir.path().join("data.bin");
        std::fs::write(&source, vec![7u8; 10]).unwrap();

        let node = TypedNode {
            id: node_for_path(&source).unwrap(),
            name: "data.bin".to_string(),
            kind: NodeKind::File { size: 10 },
        };
        let sdk = CopySdk::new(100, 4);
        let events = events(&sdk, node, target_dir.path()).await;

        assert!(matches!(events[0], TransferEvent::Start { .. }));
        let updates = events
            .iter()
            .filter(|e| matches!(e, TransferEvent::Update { .. }))
            .count();
        assert!(updates >= 3);
        match events.last().unwrap() {
            TransferEvent::Finish { transfer, error } => {
                assert!(error.is_none());
                assert_eq!(transfer.tag, 100);
                assert_eq!(transfer.transferred_bytes, 10);
                assert!(transfer.is_finished);
            }
            other => panic!("Expected finish, got {:?}", other),
        }
        assert_eq!(
            std::fs::read(target_dir.path().join("data.bin")).unwrap(),
            vec![7u8; 10]
        );
    }

    #[tokio::test]
    async fn test_existing_file_is_reported_as_already_transferred() {
        let source_dir = tempfile::tempdir().unwrap();
        let target_dir = tempfile::tempdir().unwrap();
        let source = source_dir.path().join("a.txt");
        std::fs::write(&source, b"abc").unwrap();
        std::fs::write(target_dir.path().join("a.txt"), b"xyz").unwrap();

        let node = TypedNode {
            id: node_for_path(&source).unwrap(),
            name: "a.txt".to_string(),
            kind: NodeKind::File { size: 3 },
        };
        let events = events(&CopySdk::new(1, 1024), node, target_dir.path()).await;

        assert_eq!(events.len(), 2);
        match &events[1] {
            TransferEvent::Finish { transfer, .. } => assert!(transfer.is_already_transferred),
            other => panic!("Expected finish, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_folder_copy_reports_file_count_before_start() {
        let source_dir = tempfile::tempdir().unwrap();
        let target_dir = tempfile::tempdir().unwrap();
        let album = source_dir.path().join("album");
        std::fs::create_dir_all(album.join("raw")).unwrap();
        std::fs::write(album.join("1.jpg"), b"one").unwrap();
        std::fs::write(album.join("2.jpg"), b"two").unwrap();
        std::fs::write(album.join("raw").join("1.dng"), b"raw").unwrap();

        let node = TypedNode {
            id: node_for_path(&album).unwrap(),
            name: "album".to_string(),
            kind: NodeKind::Folder,
        };
        let events = events(&CopySdk::new(1, 1024), node, target_dir.path()).await;

        match &events[0] {
            TransferEvent::FolderUpdate {
                stage, file_count, ..
            } => {
                assert_eq!(*stage, TransferStage::TransferringFiles);
                assert_eq!(*file_count, 3);
            }
            other => panic!("Expected folder update, got {:?}", other),
        }
        assert!(target_dir.path().join("album/raw/1.dng").exists());
    }

    #[tokio::test]
    async fn test_missing_source_is_an_sdk_error() {
        let target_dir = tempfile::tempdir().unwrap();
        let node = TypedNode {
            id: NodeId::FileLink {
                url: "file:///definitely/not/here.txt".to_string(),
            },
            name: "here.txt".to_string(),
            kind: NodeKind::File { size: 1 },
        };

        let results: Vec<Result<TransferEvent>> = CopySdk::new(1, 16)
            .download_node(
                &node,
                &UriPath::Path(target_dir.path().to_path_buf()),
                &[],
                false,
            )
            .collect()
            .await;

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(TransferError::Sdk(_))));
    }
}
