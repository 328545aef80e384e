// Fakes for the push collaborators

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::channel::mpsc;
use futures::stream::{BoxStream, StreamExt};
use nimbus_push::{
    AccountSession, CallUpdate, ChatSdk, Credentials, NotificationSink, PushError, Result,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub struct FakeSession {
    pub logged_in: AtomicBool,
    pub credentials: Mutex<Option<Credentials>>,
    pub login_error: Mutex<Option<PushError>>,
    pub login_delay: Duration,
    pub login_calls: AtomicUsize,
}

impl FakeSession {
    pub fn logged_out() -> Self {
        Self {
            logged_in: AtomicBool::new(false),
            credentials: Mutex::new(Some(Credentials {
                session: "stored-session".to_string(),
            })),
            login_error: Mutex::new(None),
            login_delay: Duration::ZERO,
            login_calls: AtomicUsize::new(0),
        }
    }

    pub fn logged_in() -> Self {
        let session = Self::logged_out();
        session.logged_in.store(true, Ordering::SeqCst);
        session
    }
}

#[async_trait]
impl AccountSession for FakeSession {
    fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    async fn stored_credentials(&self) -> Result<Option<Credentials>> {
        Ok(self.credentials.lock().clone())
    }

    async fn fast_login(&self, _credentials: &Credentials) -> Result<()> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        if !self.login_delay.is_zero() {
            tokio::time::sleep(self.login_delay).await;
        }
        if let Some(err) = self.login_error.lock().clone() {
            return Err(err);
        }
        self.logged_in.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeChat {
    /// Results handed out by successive retry calls; empty means success
    pub retry_results: Mutex<VecDeque<Result<()>>>,
    pub retry_calls: AtomicUsize,
    pub init_calls: Mutex<Vec<Credentials>>,
    call_updates: Mutex<HashMap<u64, mpsc::UnboundedReceiver<CallUpdate>>>,
}

impl FakeChat {
    /// Sender feeding the call updates of `chat_id`
    pub fn call_updates(&self, chat_id: u64) -> mpsc::UnboundedSender<CallUpdate> {
        let (tx, rx) = mpsc::unbounded();
        self.call_updates.lock().insert(chat_id, rx);
        tx
    }
}

#[async_trait]
impl ChatSdk for FakeChat {
    async fn retry_pending_connections(&self) -> Result<()> {
        self.retry_calls.fetch_add(1, Ordering::SeqCst);
        self.retry_results.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn init_chat(&self, credentials: &Credentials) -> Result<()> {
        self.init_calls.lock().push(credentials.clone());
        Ok(())
    }

    fn monitor_call_updates(&self, chat_id: u64) -> BoxStream<'static, CallUpdate> {
        match self.call_updates.lock().remove(&chat_id) {
            Some(rx) => rx.boxed(),
            None => futures::stream::pending().boxed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shown {
    ChatMessage {
        chat_id: u64,
        message_id: u64,
        silent: bool,
    },
    IncomingCall(u64),
    DismissedCall(u64),
    ScheduledMeeting {
        chat_id: u64,
        title: String,
    },
    Promo {
        id: u64,
        redirect_link: Option<String>,
    },
}

#[derive(Default)]
pub struct RecordingNotifications {
    pub shown: Mutex<Vec<Shown>>,
}

impl RecordingNotifications {
    pub fn all(&self) -> Vec<Shown> {
        self.shown.lock().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifications {
    async fn show_chat_message(&self, chat_id: u64, message_id: u64, silent: bool) {
        self.shown.lock().push(Shown::ChatMessage {
            chat_id,
            message_id,
            silent,
        });
    }

    async fn show_incoming_call(&self, chat_id: u64) {
        self.shown.lock().push(Shown::IncomingCall(chat_id));
    }

    async fn dismiss_incoming_call(&self, chat_id: u64) {
        self.shown.lock().push(Shown::DismissedCall(chat_id));
    }

    async fn show_scheduled_meeting(
        &self,
        chat_id: u64,
        _scheduled_meeting_id: u64,
        title: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) {
        self.shown.lock().push(Shown::ScheduledMeeting {
            chat_id,
            title: title.to_string(),
        });
    }

    async fn show_promo(
        &self,
        id: u64,
        _title: &str,
        _description: &str,
        redirect_link: Option<&str>,
    ) {
        self.shown.lock().push(Shown::Promo {
            id,
            redirect_link: redirect_link.map(str::to_string),
        });
    }
}

pub fn payload(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Poll `condition` until it holds or two seconds pass
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
