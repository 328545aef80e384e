//! Serialised fast-login

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{PushError, Result};
use crate::sdk::{AccountSession, Credentials};

/// Process-wide lock every login path must hold; clone it into each component that logs in
#[derive(Clone, Default)]
pub struct LoginMutex(Arc<Mutex<()>>);

impl LoginMutex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    AlreadyLoggedIn,
    LoggedIn,
}

#[derive(Clone)]
pub struct LoginCoordinator {
    mutex: LoginMutex,
    session: Arc<dyn AccountSession>,
}

impl LoginCoordinator {
    pub fn new(mutex: LoginMutex, session: Arc<dyn AccountSession>) -> Self {
        Self { mutex, session }
    }

    /// Log in with the stored session unless someone already did.
    /// Returns the credentials used so the caller can bring the chat engine up with them.
    pub async fn ensure_logged_in(&self) -> Result<(LoginOutcome, Option<Credentials>)> {
        if self.session.is_logged_in() {
            return Ok((LoginOutcome::AlreadyLoggedIn, None));
        }

        let _guard = self.mutex.0.lock().await;
        // Another caller may have finished logging in while we waited
        if self.session.is_logged_in() {
            debug!("Login completed by another caller");
            return Ok((LoginOutcome::AlreadyLoggedIn, None));
        }

        let credentials = self
            .session
            .stored_credentials()
            .await?
            .ok_or(PushError::NoCredentials)?;

        match self.session.fast_login(&credentials).await {
            Ok(()) => {
                info!("Fast login succeeded");
                Ok((LoginOutcome::LoggedIn, Some(credentials)))
            }
            Err(err) => {
                warn!("Fast login failed: {}", err);
                Err(match err {
                    PushError::Login(_) => err,
                    other => PushError::Login(other.to_string()),
                })
            }
        }
    }

    pub async fn credentials(&self) -> Result<Option<Credentials>> {
        self.session.stored_credentials().await
    }
}
