//! Runtime configuration

use nimbus_store::StoreConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the transfer host
#[derive(Debug, Clone)]
pub struct TransfersConfig {
    pub store: StoreConfig,

    /// Default destination for downloads without an explicit one
    pub download_root: PathBuf,

    /// Mount point treated as removable storage; downloads there go through the cache folder
    pub sd_card_root: Option<PathBuf>,

    /// Staging folder for removable storage downloads
    pub sd_card_cache_folder: PathBuf,

    /// Bytes copied between two progress updates (default: 64 KiB)
    pub chunk_size: usize,

    /// How long `start` waits without progress before giving up (default: 30s)
    pub idle_timeout: Duration,
}

impl Default for TransfersConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            download_root: PathBuf::from("downloads"),
            sd_card_root: None,
            sd_card_cache_folder: PathBuf::from(".nimbus/sd_transfers"),
            chunk_size: 64 * 1024,
            idle_timeout: Duration::from_secs(30),
        }
    }
}
