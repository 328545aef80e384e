//! Change notification for monitored queries

use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Revision counter bumped after every write; monitors re-query when it moves
#[derive(Clone)]
pub struct ChangeNotifier {
    revision: Arc<watch::Sender<u64>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            revision: Arc::new(revision),
        }
    }

    pub fn notify(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Emits once immediately, then once per observed revision change.
    /// Revisions that pile up while the consumer is busy collapse into one emission.
    pub fn changes(&self) -> BoxStream<'static, ()> {
        WatchStream::new(self.revision.subscribe())
            .map(|_| ())
            .boxed()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
