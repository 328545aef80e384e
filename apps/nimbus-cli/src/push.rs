//! Console-backed push collaborators

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use nimbus_push::{
    AccountSession, CallUpdate, ChatSdk, Credentials, NotificationSink, PushError, Result,
};
use nimbus_store::SettingsManager;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub const SESSION_KEY: &str = "account.session";

/// Session kept in the settings table
pub struct StoredSession {
    settings: Arc<SettingsManager>,
    logged_in: AtomicBool,
}

impl StoredSession {
    pub fn new(settings: Arc<SettingsManager>) -> Self {
        Self {
            settings,
            logged_in: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl AccountSession for StoredSession {
    fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    async fn stored_credentials(&self) -> Result<Option<Credentials>> {
        let session = self
            .settings
            .get(SESSION_KEY)
            .await
            .map_err(|e| PushError::Sdk(e.to_string()))?;
        Ok(session.map(|session| Credentials { session }))
    }

    async fn fast_login(&self, credentials: &Credentials) -> Result<()> {
        if credentials.session.trim().is_empty() {
            return Err(PushError::Login("empty session".to_string()));
        }
        self.logged_in.store(true, Ordering::SeqCst);
        info!("Resumed stored session");
        Ok(())
    }
}

/// Chat engine without live connections; calls never report updates
pub struct OfflineChat;

#[async_trait]
impl ChatSdk for OfflineChat {
    async fn retry_pending_connections(&self) -> Result<()> {
        Ok(())
    }

    async fn init_chat(&self, _credentials: &Credentials) -> Result<()> {
        Ok(())
    }

    fn monitor_call_updates(&self, _chat_id: u64) -> BoxStream<'static, CallUpdate> {
        stream::empty().boxed()
    }
}

pub struct ConsoleNotifications;

#[async_trait]
impl NotificationSink for ConsoleNotifications {
    async fn show_chat_message(&self, chat_id: u64, message_id: u64, silent: bool) {
        let marker = if silent { " (silent)" } else { "" };
        println!("New message {message_id} in chat {chat_id}{marker}");
    }

    async fn show_incoming_call(&self, chat_id: u64) {
        println!("Incoming call in chat {chat_id}");
    }

    async fn dismiss_incoming_call(&self, chat_id: u64) {
        println!("Call notification for chat {chat_id} dismissed");
    }

    async fn show_scheduled_meeting(
        &self,
        chat_id: u64,
        _scheduled_meeting_id: u64,
        title: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) {
        println!(
            "Meeting \"{title}\" in chat {chat_id}: {} - {}",
            start.format("%Y-%m-%d %H:%M"),
            end.format("%H:%M")
        );
    }

    async fn show_promo(
        &self,
        _id: u64,
        title: &str,
        description: &str,
        redirect_link: Option<&str>,
    ) {
        println!("{title}: {description}");
        if let Some(link) = redirect_link {
            println!("  {link}");
        }
    }
}
