//! Follows a ringing call until it no longer needs an incoming-call notification

use futures::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::sdk::{CallStatus, CallUpdate, ChatSdk, NotificationSink};

/// Why a watcher stopped following a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallResolution {
    Connected,
    Destroyed,
    StoppedRinging,
    ParticipatingElsewhere,
    Cancelled,
    UpdatesEnded,
}

impl CallResolution {
    fn from_update(update: &CallUpdate) -> Option<Self> {
        if update.participating_elsewhere {
            return Some(CallResolution::ParticipatingElsewhere);
        }
        match update.status {
            CallStatus::InProgress | CallStatus::Joining => Some(CallResolution::Connected),
            CallStatus::Destroyed | CallStatus::TerminatingUserParticipation => {
                Some(CallResolution::Destroyed)
            }
            _ if !update.is_ringing => Some(CallResolution::StoppedRinging),
            _ => None,
        }
    }
}

pub struct CallWatch {
    chat_id: u64,
    token: CancellationToken,
    task: JoinHandle<CallResolution>,
}

impl CallWatch {
    pub fn chat_id(&self) -> u64 {
        self.chat_id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.token.is_cancelled() || self.task.is_finished()
    }

    pub async fn resolution(self) -> CallResolution {
        self.task.await.unwrap_or(CallResolution::Cancelled)
    }
}

#[derive(Clone)]
pub struct CallStatusWatcher {
    chat: Arc<dyn ChatSdk>,
    notifications: Arc<dyn NotificationSink>,
}

impl CallStatusWatcher {
    pub fn new(chat: Arc<dyn ChatSdk>, notifications: Arc<dyn NotificationSink>) -> Self {
        Self {
            chat,
            notifications,
        }
    }

    /// Spawn a task following `chat_id`'s call; it cancels its own token once resolved
    pub fn watch(&self, chat_id: u64) -> CallWatch {
        let token = CancellationToken::new();
        let mut updates = self.chat.monitor_call_updates(chat_id);
        let notifications = self.notifications.clone();
        let task_token = token.clone();

        let task = tokio::spawn(async move {
            let resolution = loop {
                tokio::select! {
                    _ = task_token.cancelled() => break CallResolution::Cancelled,
                    update = updates.next() => match update {
                        Some(update) => {
                            if let Some(resolution) = CallResolution::from_update(&update) {
                                break resolution;
                            }
                            debug!("Call in chat {} still ringing: {:?}", chat_id, update.status);
                        }
                        None => break CallResolution::UpdatesEnded,
                    },
                }
            };

            if resolution != CallResolution::Cancelled {
                notifications.dismiss_incoming_call(chat_id).await;
                task_token.cancel();
            }
            info!("Stopped watching call in chat {}: {:?}", chat_id, resolution);
            resolution
        });

        CallWatch {
            chat_id,
            token,
            task,
        }
    }
}
