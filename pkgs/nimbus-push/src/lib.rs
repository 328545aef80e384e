//! Nimbus Push - routing of chat push messages
//!
//! A push arrives as a flat key/value payload. [`PushMessageWorker`] maps it to a
//! [`PushMessage`], makes sure the account is logged in (serialised through a
//! shared [`LoginMutex`]), brings chat connections back up and hands the message
//! to a [`NotificationSink`]. Incoming calls additionally get a
//! [`CallStatusWatcher`] that dismisses the notification once the call no longer rings.

pub mod call_watcher;
pub mod error;
pub mod login;
pub mod message;
pub mod sdk;
pub mod worker;

pub use call_watcher::{CallResolution, CallStatusWatcher, CallWatch};
pub use error::{PushError, Result};
pub use login::{LoginCoordinator, LoginMutex, LoginOutcome};
pub use message::PushMessage;
pub use sdk::{AccountSession, CallStatus, CallUpdate, ChatSdk, Credentials, NotificationSink};
pub use worker::{PushMessageWorker, WorkResult};
