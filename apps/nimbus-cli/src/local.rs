//! Node lookup and storage classification backed by the local file system

use async_trait::async_trait;
use nimbus_transfers::{
    FileSystemRepository, NodeId, NodeKind, NodeRepository, Result, TransferError, TypedNode,
};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

const EXTERNAL_STORAGE_TREE: &str = "content://com.android.externalstorage.documents/tree/";
const PRIMARY_VOLUME: &str = "primary";

/// Resolve a `file://` link to the path it names
pub fn link_path(id: &NodeId) -> Option<PathBuf> {
    match id {
        NodeId::FileLink { url } => Url::parse(url).ok()?.to_file_path().ok(),
        _ => None,
    }
}

/// Node identifier for a local file or folder
pub fn node_for_path(path: &Path) -> anyhow::Result<NodeId> {
    let absolute = std::fs::canonicalize(path)?;
    let url = Url::from_file_path(&absolute)
        .map_err(|_| anyhow::anyhow!("Cannot express {} as a file URL", absolute.display()))?;
    Ok(NodeId::FileLink {
        url: url.to_string(),
    })
}

/// Serves `file://` links as nodes; other identifiers are unknown here
pub struct LocalNodes;

#[async_trait]
impl NodeRepository for LocalNodes {
    async fn get_node(&self, id: &NodeId) -> Result<Option<TypedNode>> {
        let Some(path) = link_path(id) else {
            debug!("No local node for {}", id);
            return Ok(None);
        };

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TransferError::Sdk(e.to_string())),
        };

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let kind = if metadata.is_dir() {
            NodeKind::Folder
        } else {
            NodeKind::File {
                size: metadata.len(),
            }
        };

        Ok(Some(TypedNode {
            id: id.clone(),
            name,
            kind,
        }))
    }
}

pub struct LocalFileSystem {
    sd_card_root: Option<PathBuf>,
    cache_folder: PathBuf,
}

impl LocalFileSystem {
    pub fn new(sd_card_root: Option<PathBuf>, cache_folder: PathBuf) -> Self {
        Self {
            sd_card_root,
            cache_folder,
        }
    }

    fn tree_volume(uri: &str) -> Option<&str> {
        let tree = uri.strip_prefix(EXTERNAL_STORAGE_TREE)?;
        // Volume ids end at the encoded ':' separating them from the folder
        Some(tree.split(['/', '%', ':']).next().unwrap_or(tree))
    }
}

#[async_trait]
impl FileSystemRepository for LocalFileSystem {
    fn is_sd_card_path(&self, path: &Path) -> bool {
        self.sd_card_root
            .as_ref()
            .is_some_and(|root| path.starts_with(root))
    }

    fn is_sd_card_content_uri(&self, uri: &str) -> bool {
        Self::tree_volume(uri).is_some_and(|volume| !volume.is_empty() && volume != PRIMARY_VOLUME)
    }

    fn is_external_storage_content_uri(&self, uri: &str) -> bool {
        Self::tree_volume(uri) == Some(PRIMARY_VOLUME)
    }

    async fn get_or_create_sd_card_transfers_cache_folder(&self) -> Result<Option<PathBuf>> {
        match tokio::fs::create_dir_all(&self.cache_folder).await {
            Ok(()) => Ok(Some(self.cache_folder.clone())),
            Err(e) => {
                tracing::warn!(
                    "Cannot create cache folder {}: {}",
                    self.cache_folder.display(),
                    e
                );
                Ok(None)
            }
        }
    }
}
