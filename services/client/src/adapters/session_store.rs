//! services/client/src/adapters/session_store.rs
//!
//! The signed-in session shared by every backend adapter: the current tokens,
//! their copy on disk and the session change notifications.

use chrono::Utc;
use note_cycle_core::domain::{Identity, SessionEvent, SessionEventKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::RwLock;
use tokio::sync::{broadcast, Mutex};
use tracing::warn;

/// Access tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 10;

//=========================================================================================
// Wire Records
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct UserRecord {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) email: Option<String>,
}

impl UserRecord {
    pub(crate) fn to_domain(&self) -> Identity {
        Identity {
            id: self.id.clone(),
            email: self.email.clone().unwrap_or_default(),
        }
    }
}

/// The session as issued by the token endpoint and as persisted on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SessionRecord {
    pub(crate) access_token: String,
    pub(crate) refresh_token: String,
    #[serde(default)]
    pub(crate) expires_in: Option<i64>,
    #[serde(default)]
    pub(crate) expires_at: Option<i64>,
    pub(crate) user: UserRecord,
}

impl SessionRecord {
    /// Fills in `expires_at` from `expires_in` when the backend only sent the latter.
    pub(crate) fn stamped(mut self) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self.expires_in.map(|secs| Utc::now().timestamp() + secs);
        }
        self
    }

    pub(crate) fn is_fresh(&self) -> bool {
        match self.expires_at {
            Some(at) => at - EXPIRY_MARGIN_SECS > Utc::now().timestamp(),
            None => true,
        }
    }
}

//=========================================================================================
// The Store
//=========================================================================================

pub(crate) struct SessionStore {
    file: PathBuf,
    current: RwLock<Option<SessionRecord>>,
    /// Serializes refresh-token exchanges; a refresh token is single use.
    refresh_gate: Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub(crate) fn new(file: PathBuf) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            file,
            current: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            events,
        }
    }

    pub(crate) fn current(&self) -> Option<SessionRecord> {
        self.current.read().map(|s| s.clone()).unwrap_or_default()
    }

    pub(crate) fn access_token(&self) -> Option<String> {
        self.current().map(|s| s.access_token)
    }

    pub(crate) fn refresh_gate(&self) -> &Mutex<()> {
        &self.refresh_gate
    }

    fn replace(&self, record: Option<SessionRecord>) {
        if let Ok(mut slot) = self.current.write() {
            *slot = record;
        }
    }

    /// Makes `record` the active session and writes it to disk.
    pub(crate) async fn activate(&self, record: SessionRecord) -> Identity {
        let identity = record.user.to_domain();
        if let Err(e) = self.persist(&record).await {
            warn!("Could not persist the session to {:?}: {}", self.file, e);
        }
        self.replace(Some(record));
        identity
    }

    async fn persist(&self, record: &SessionRecord) -> std::io::Result<()> {
        if let Some(dir) = self.file.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&self.file, json).await
    }

    pub(crate) async fn load_persisted(&self) -> Option<SessionRecord> {
        let bytes = match tokio::fs::read(&self.file).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Could not read the session file {:?}: {}", self.file, e);
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Discarding unreadable session file {:?}: {}", self.file, e);
                self.forget().await;
                None
            }
        }
    }

    /// Drops the session from memory and disk.
    pub(crate) async fn forget(&self) {
        self.replace(None);
        match tokio::fs::remove_file(&self.file).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove the session file {:?}: {}", self.file, e),
        }
    }

    pub(crate) fn emit(&self, kind: SessionEventKind, identity: Option<Identity>) {
        // No subscribers is fine; nobody is listening yet.
        let _ = self.events.send(SessionEvent { kind, identity });
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn record(access_token: &str, expires_at: i64) -> SessionRecord {
        SessionRecord {
            access_token: access_token.to_string(),
            refresh_token: format!("refresh-{}", access_token),
            expires_in: None,
            expires_at: Some(expires_at),
            user: UserRecord {
                id: "u1".to_string(),
                email: Some("a@x.edu".to_string()),
            },
        }
    }

    #[test]
    fn expires_in_is_stamped() {
        let mut r = record("access", 0);
        r.expires_at = None;
        r.expires_in = Some(3600);
        assert!(r.stamped().is_fresh());
        assert!(!record("access", Utc::now().timestamp()).is_fresh());
    }

    #[tokio::test]
    async fn activate_persists_and_forget_removes() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));

        let identity = store.activate(record("access", Utc::now().timestamp() + 3600)).await;
        assert_eq!(identity.id, "u1");
        assert_eq!(store.access_token().as_deref(), Some("access"));
        let restored = store.load_persisted().await.unwrap();
        assert_eq!(restored.access_token, "access");

        store.forget().await;
        assert_eq!(store.access_token(), None);
        assert!(store.load_persisted().await.is_none());
    }
}
