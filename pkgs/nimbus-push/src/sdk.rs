//! Collaborators the push worker drives: account session, chat engine and notifications

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::error::Result;

/// Session persisted by a previous interactive login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub session: String,
}

#[async_trait]
pub trait AccountSession: Send + Sync {
    fn is_logged_in(&self) -> bool;

    async fn stored_credentials(&self) -> Result<Option<Credentials>>;

    /// Resume the stored session without user interaction
    async fn fast_login(&self, credentials: &Credentials) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Initial,
    UserNoPresent,
    Connecting,
    Joining,
    InProgress,
    TerminatingUserParticipation,
    Destroyed,
}

/// A change on a chat call as reported by the chat engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallUpdate {
    pub chat_id: u64,
    pub status: CallStatus,
    pub is_ringing: bool,
    /// The current user already takes part in the call from another client
    pub participating_elsewhere: bool,
}

#[async_trait]
pub trait ChatSdk: Send + Sync {
    /// Reconnect chat connections that dropped while the app was idle
    async fn retry_pending_connections(&self) -> Result<()>;

    async fn init_chat(&self, credentials: &Credentials) -> Result<()>;

    fn monitor_call_updates(&self, chat_id: u64) -> BoxStream<'static, CallUpdate>;
}

/// Renders what a push leads to; implementations own platform notification APIs
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn show_chat_message(&self, chat_id: u64, message_id: u64, silent: bool);

    async fn show_incoming_call(&self, chat_id: u64);

    async fn dismiss_incoming_call(&self, chat_id: u64);

    async fn show_scheduled_meeting(
        &self,
        chat_id: u64,
        scheduled_meeting_id: u64,
        title: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    );

    async fn show_promo(
        &self,
        id: u64,
        title: &str,
        description: &str,
        redirect_link: Option<&str>,
    );
}
