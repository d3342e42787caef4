//! services/client/src/app/session.rs
//!
//! The session manager: the single owner of the current identity. It restores a
//! persisted session at startup, follows the backend's session-change stream in a
//! background task, and performs sign-in, sign-up and sign-out.

use crate::app::state::AppState;
use crate::error::ActionError;
use futures::StreamExt;
use note_cycle_core::domain::Identity;
use note_cycle_core::ports::PortError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct SessionManager {
    state: Arc<AppState>,
    identity: Arc<watch::Sender<Option<Identity>>>,
    /// Set once the change stream has delivered anything; the startup lookup
    /// must not overwrite a newer event.
    event_seen: Arc<AtomicBool>,
    cancel: CancellationToken,
    listener: Option<JoinHandle<()>>,
}

impl SessionManager {
    pub fn new(state: Arc<AppState>) -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            state,
            identity: Arc::new(identity),
            event_seen: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            listener: None,
        }
    }

    /// Subscribes to session changes, then restores any persisted session.
    ///
    /// A failed lookup leaves the user signed out; browsing anonymously is valid.
    pub async fn start(&mut self) {
        if self.listener.is_none() {
            self.listener = Some(self.spawn_listener());
        }

        match self.state.bounded(self.state.auth.get_session()).await {
            Ok(found) => {
                let seen = &self.event_seen;
                self.identity.send_if_modified(|current| {
                    if seen.load(Ordering::Acquire) || *current == found {
                        return false;
                    }
                    *current = found;
                    true
                });
                if let Some(identity) = self.current() {
                    info!("Restored session for {}", identity.email);
                }
            }
            Err(e) => warn!("Could not restore a previous session: {}", e),
        }
    }

    fn spawn_listener(&self) -> JoinHandle<()> {
        let mut events = self.state.auth.on_session_change();
        let identity = self.identity.clone();
        let seen = self.event_seen.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    event = events.next() => match event {
                        Some(event) => {
                            debug!("Session event {:?}", event.kind);
                            seen.store(true, Ordering::Release);
                            identity.send_replace(event.identity);
                        }
                        None => break,
                    },
                }
            }
            debug!("Session listener stopped.");
        })
    }

    /// The identity as of now.
    pub fn current(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.borrow().is_some()
    }

    /// A receiver that observes every identity change.
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ActionError> {
        let identity = self
            .state
            .bounded(self.state.auth.sign_in_with_password(email, password))
            .await
            .map_err(authentication_error)?;
        info!("Signed in as {}", identity.email);
        self.identity.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    /// Returns `None` when the account still has to be confirmed by email.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Identity>, ActionError> {
        let identity = self
            .state
            .bounded(self.state.auth.sign_up(email, password))
            .await
            .map_err(authentication_error)?;
        match &identity {
            Some(identity) => {
                info!("Signed up as {}", identity.email);
                self.identity.send_replace(Some(identity.clone()));
            }
            None => info!("Sign-up for {} needs email confirmation", email),
        }
        Ok(identity)
    }

    /// Signs out locally even if the backend call fails.
    pub async fn sign_out(&self) {
        if let Err(e) = self.state.bounded(self.state.auth.sign_out()).await {
            warn!("Sign-out request failed: {}", e);
        }
        self.identity.send_replace(None);
    }

    /// Stops the session listener and waits for it to finish.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(listener) = self.listener.take() {
            if let Err(e) = listener.await {
                warn!("Session listener ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn authentication_error(e: PortError) -> ActionError {
    match e {
        PortError::Rejected(message) => ActionError::Authentication(message),
        other => ActionError::Authentication(other.to_string()),
    }
}
