//! services/client/src/adapters/auth.rs
//!
//! This module contains the auth adapter, which implements the `AuthService`
//! port against the backend's `/auth/v1` endpoints. The session is persisted to a
//! JSON file so a restarted client comes back signed in.

use crate::adapters::session_store::SessionRecord;
use crate::adapters::supabase::SupabaseClient;
use async_trait::async_trait;
use note_cycle_core::domain::{Identity, SessionEvent, SessionEventKind};
use note_cycle_core::ports::{AuthService, PortError, PortResult, SessionEvents};
use reqwest::Method;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `AuthService` port over HTTP.
///
/// The session itself lives on the shared `SupabaseClient`, so a token the
/// table or storage adapter refreshes is seen here too.
pub struct SupabaseAuthAdapter {
    client: SupabaseClient,
}

impl SupabaseAuthAdapter {
    /// Creates a new `SupabaseAuthAdapter`.
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn start_session(&self, record: SessionRecord) -> Identity {
        let identity = self.client.session().activate(record).await;
        self.client
            .session()
            .emit(SessionEventKind::SignedIn, Some(identity.clone()));
        identity
    }
}

/// Adapts a broadcast receiver into an owned session event stream.
pub(crate) fn broadcast_stream(mut rx: broadcast::Receiver<SessionEvent>) -> SessionEvents {
    Box::pin(async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => yield event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Session listener fell behind; skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

//=========================================================================================
// `AuthService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthService for SupabaseAuthAdapter {
    async fn get_session(&self) -> PortResult<Option<Identity>> {
        let session = self.client.session();
        let Some(record) = session.load_persisted().await else {
            return Ok(None);
        };

        if record.is_fresh() {
            debug!("Restored persisted session for {}", record.user.id);
            return Ok(Some(session.activate(record).await));
        }

        info!("Persisted session expired");
        match self.client.refresh_session(&record).await {
            Ok(refreshed) => Ok(Some(refreshed.user.to_domain())),
            Err(PortError::Rejected(_)) | Err(PortError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn on_session_change(&self) -> SessionEvents {
        broadcast_stream(self.client.session().subscribe())
    }

    async fn sign_up(&self, email: &str, password: &str) -> PortResult<Option<Identity>> {
        let url = self.client.endpoint(["auth", "v1", "signup"])?;
        let response = self
            .client
            .send_anonymous(
                self.client
                    .request(Method::POST, url)
                    .json(&PasswordCredentials { email, password }),
            )
            .await?;
        let body: serde_json::Value = self.client.json(response).await?;

        // Without auto-confirmation the backend answers with a bare user and no session.
        if body.get("access_token").is_none() {
            info!("Sign-up for {} awaits email confirmation", email);
            return Ok(None);
        }
        let record: SessionRecord = serde_json::from_value(body)
            .map_err(|e| PortError::Unexpected(format!("Malformed sign-up response: {}", e)))?;
        Ok(Some(self.start_session(record.stamped()).await))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> PortResult<Identity> {
        let record = self
            .client
            .token_request("password", &PasswordCredentials { email, password })
            .await?;
        Ok(self.start_session(record).await)
    }

    async fn sign_out(&self) -> PortResult<()> {
        if self.client.access_token().is_some() {
            let url = self.client.endpoint(["auth", "v1", "logout"])?;
            if let Err(e) = self.client.send(self.client.request(Method::POST, url)).await {
                // The local session goes away regardless.
                warn!("Backend sign-out failed: {}", e);
            }
        }
        let session = self.client.session();
        session.forget().await;
        session.emit(SessionEventKind::SignedOut, None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::session_store::tests::record;
    use crate::config::Config;
    use chrono::Utc;
    use futures::StreamExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn adapter(file: PathBuf) -> SupabaseAuthAdapter {
        let mut config = Config::new("http://127.0.0.1:9", "anon");
        config.session_file = file;
        SupabaseAuthAdapter::new(SupabaseClient::new(&config).unwrap())
    }

    fn temp_session_file() -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let file = dir.path().join("nested").join("session.json");
        (dir, file)
    }

    async fn write_session(file: &PathBuf, record: &SessionRecord) {
        tokio::fs::create_dir_all(file.parent().unwrap()).await.unwrap();
        tokio::fs::write(file, serde_json::to_vec(record).unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn fresh_persisted_session_is_restored_without_network() {
        let (_dir, file) = temp_session_file();
        write_session(&file, &record("access", Utc::now().timestamp() + 3600)).await;
        let auth = adapter(file);

        let identity = auth.get_session().await.unwrap();
        assert_eq!(
            identity,
            Some(Identity {
                id: "u1".to_string(),
                email: "a@x.edu".to_string()
            })
        );
        assert_eq!(auth.client.access_token().as_deref(), Some("access"));
    }

    #[tokio::test]
    async fn missing_or_corrupt_session_file_means_signed_out() {
        let (_dir, file) = temp_session_file();
        let auth = adapter(file.clone());
        assert_eq!(auth.get_session().await.unwrap(), None);

        tokio::fs::create_dir_all(file.parent().unwrap()).await.unwrap();
        tokio::fs::write(&file, b"not json").await.unwrap();
        assert_eq!(auth.get_session().await.unwrap(), None);
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn expired_session_with_unreachable_backend_is_an_error() {
        let (_dir, file) = temp_session_file();
        write_session(&file, &record("stale", Utc::now().timestamp() - 60)).await;
        let auth = adapter(file.clone());

        assert!(matches!(auth.get_session().await, Err(PortError::Unexpected(_))));
        // A transport failure is not a refusal, so the refresh token is kept.
        assert!(file.exists());
    }

    #[tokio::test]
    async fn sign_out_clears_local_session_and_notifies() {
        let (_dir, file) = temp_session_file();
        let auth = adapter(file);
        let mut events = auth.on_session_change();

        // Signed out already, so no request reaches the unreachable backend.
        auth.sign_out().await.unwrap();

        let event = events.next().await.unwrap();
        assert_eq!(event.kind, SessionEventKind::SignedOut);
        assert_eq!(event.identity, None);
    }
}
