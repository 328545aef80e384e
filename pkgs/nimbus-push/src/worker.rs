//! Background work triggered by an inbound push

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::call_watcher::{CallStatusWatcher, CallWatch};
use crate::error::{PushError, Result};
use crate::login::LoginCoordinator;
use crate::message::PushMessage;
use crate::sdk::{ChatSdk, Credentials, NotificationSink};

/// Outcome reported back to the platform work scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkResult {
    Success,
    Failure,
}

pub struct PushMessageWorker {
    login: LoginCoordinator,
    chat: Arc<dyn ChatSdk>,
    notifications: Arc<dyn NotificationSink>,
    call_watcher: CallStatusWatcher,
    call_watches: Mutex<HashMap<u64, CallWatch>>,
}

impl PushMessageWorker {
    pub fn new(
        login: LoginCoordinator,
        chat: Arc<dyn ChatSdk>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        let call_watcher = CallStatusWatcher::new(chat.clone(), notifications.clone());
        Self {
            login,
            chat,
            notifications,
            call_watcher,
            call_watches: Mutex::new(HashMap::new()),
        }
    }

    pub async fn do_work(&self, payload: &HashMap<String, String>) -> WorkResult {
        match self.handle(payload).await {
            Ok(()) => WorkResult::Success,
            Err(err) => {
                error!("Push handling failed: {}", err);
                WorkResult::Failure
            }
        }
    }

    async fn handle(&self, payload: &HashMap<String, String>) -> Result<()> {
        let message = PushMessage::from_payload(payload)?;
        debug!("Handling push {:?}", message);

        let (_, credentials) = self.login.ensure_logged_in().await?;
        self.retry_pending_connections(credentials).await?;
        self.dispatch(message).await;
        Ok(())
    }

    async fn retry_pending_connections(&self, credentials: Option<Credentials>) -> Result<()> {
        match self.chat.retry_pending_connections().await {
            Ok(()) => Ok(()),
            Err(PushError::ChatNotInitialized) => {
                warn!("Chat engine not initialized, initializing before retrying");
                let credentials = match credentials {
                    Some(credentials) => credentials,
                    None => self
                        .login
                        .credentials()
                        .await?
                        .ok_or(PushError::NoCredentials)?,
                };
                self.chat.init_chat(&credentials).await?;
                self.chat.retry_pending_connections().await
            }
            Err(err) => Err(err),
        }
    }

    async fn dispatch(&self, message: PushMessage) {
        match message {
            PushMessage::Chat {
                chat_id,
                message_id,
                silent,
            } => {
                self.notifications
                    .show_chat_message(chat_id, message_id, silent)
                    .await
            }
            PushMessage::Call { chat_id } => {
                self.notifications.show_incoming_call(chat_id).await;
                self.start_call_watch(chat_id);
            }
            PushMessage::ScheduledMeeting {
                chat_id,
                scheduled_meeting_id,
                title,
                start,
                end,
            } => {
                self.notifications
                    .show_scheduled_meeting(chat_id, scheduled_meeting_id, &title, start, end)
                    .await
            }
            PushMessage::Promo {
                id,
                title,
                description,
                redirect_link,
            } => {
                self.notifications
                    .show_promo(id, &title, &description, redirect_link.as_deref())
                    .await
            }
        }
    }

    /// One watcher per chat; a new call push replaces a watcher that already resolved
    fn start_call_watch(&self, chat_id: u64) {
        let mut watches = self.call_watches.lock();
        watches.retain(|_, watch| !watch.is_finished());
        if watches.contains_key(&chat_id) {
            debug!("Call in chat {} is already watched", chat_id);
            return;
        }
        info!("Watching call status in chat {}", chat_id);
        watches.insert(chat_id, self.call_watcher.watch(chat_id));
    }

    /// Chats whose calls are still being followed
    pub fn watched_calls(&self) -> Vec<u64> {
        let mut watches = self.call_watches.lock();
        watches.retain(|_, watch| !watch.is_finished());
        let mut chats: Vec<u64> = watches.keys().copied().collect();
        chats.sort_unstable();
        chats
    }

    pub fn take_call_watch(&self, chat_id: u64) -> Option<CallWatch> {
        self.call_watches.lock().remove(&chat_id)
    }

    pub fn cancel_call_watches(&self) {
        for (_, watch) in self.call_watches.lock().drain() {
            watch.cancel();
        }
    }
}

impl Drop for PushMessageWorker {
    fn drop(&mut self) {
        self.cancel_call_watches();
    }
}
