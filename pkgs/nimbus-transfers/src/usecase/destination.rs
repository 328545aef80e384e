//! Download destination resolution

use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, TransferError};
use crate::repository::{Feature, FeatureFlagRepository, FileSystemRepository};
use crate::types::{AppData, UriPath};

/// Where the SDK should write, plus the marker needed to relocate the file afterwards
#[derive(Debug, Clone, PartialEq)]
pub struct FileDestination {
    pub destination: UriPath,
    pub app_data: Option<AppData>,
}

impl FileDestination {
    fn unchanged(destination: &UriPath) -> Self {
        Self {
            destination: destination.clone(),
            app_data: None,
        }
    }
}

#[derive(Clone)]
pub struct GetFileDestinationAndAppDataForDownload {
    file_system: Arc<dyn FileSystemRepository>,
    feature_flags: Arc<dyn FeatureFlagRepository>,
}

impl GetFileDestinationAndAppDataForDownload {
    pub fn new(
        file_system: Arc<dyn FileSystemRepository>,
        feature_flags: Arc<dyn FeatureFlagRepository>,
    ) -> Self {
        Self {
            file_system,
            feature_flags,
        }
    }

    pub async fn execute(&self, destination: &UriPath) -> Result<FileDestination> {
        let raw = destination.to_string();

        if destination.is_content_uri()
            && self.file_system.is_external_storage_content_uri(&raw)
            && self
                .feature_flags
                .is_enabled(Feature::ChooseDownloadDestination)
                .await?
        {
            return Ok(FileDestination::unchanged(destination));
        }

        let is_sd_card = match destination {
            UriPath::Path(path) => self.file_system.is_sd_card_path(path),
            UriPath::Url(url) => self.file_system.is_sd_card_content_uri(url.as_str()),
        };
        if !is_sd_card && !destination.is_content_uri() {
            return Ok(FileDestination::unchanged(destination));
        }

        let cache_folder = self
            .file_system
            .get_or_create_sd_card_transfers_cache_folder()
            .await?
            .ok_or_else(|| TransferError::CacheFolderUnavailable(raw.clone()))?;
        debug!(
            "Redirecting download for {} into cache folder {}",
            raw,
            cache_folder.display()
        );

        Ok(FileDestination {
            app_data: Some(AppData::SdCardDownload {
                target_path: cache_folder.to_string_lossy().into_owned(),
                final_target_uri: raw,
            }),
            destination: UriPath::Path(cache_folder),
        })
    }
}
