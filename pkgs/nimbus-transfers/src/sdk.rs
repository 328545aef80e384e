//! Seam towards the native transfer SDK

use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::{AppData, TransferEvent, TypedNode, UriPath};

/// The part of the native SDK that performs transfers.
///
/// The SDK owns scheduling, encryption and networking; this crate only reacts
/// to the events it reports.
pub trait TransferSdk: Send + Sync {
    /// Start downloading `node` into `destination`.
    ///
    /// The stream ends once the SDK stops reporting on this transfer. An `Err`
    /// item means the SDK refused or aborted the request.
    fn download_node(
        &self,
        node: &TypedNode,
        destination: &UriPath,
        app_data: &[AppData],
        is_high_priority: bool,
    ) -> BoxStream<'static, Result<TransferEvent>>;
}
