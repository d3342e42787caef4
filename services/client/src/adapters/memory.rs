//! services/client/src/adapters/memory.rs
//!
//! An in-process backend implementing all three ports. It keeps users, notes and
//! objects in memory, counts every call per operation, and can be told to fail
//! the next call of an operation or to answer slowly.

use crate::adapters::auth::broadcast_stream;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use note_cycle_core::domain::{Identity, NewNote, Note, NoteId, SessionEvent, SessionEventKind};
use note_cycle_core::ports::{
    AuthService, NoteRepository, ObjectStorage, PortError, PortResult, SessionEvents,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

const URL_SCHEME: &str = "memory://";

/// The backend calls the in-process backend can count and fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetSession,
    SignUp,
    SignIn,
    SignOut,
    ListNotes,
    InsertNote,
    DeleteNote,
    Upload,
    Remove,
}

#[derive(Default)]
struct Inner {
    /// email -> (identity, password)
    users: HashMap<String, (Identity, String)>,
    session: Option<Identity>,
    notes: Vec<Note>,
    objects: HashMap<String, Bytes>,
    failures: HashMap<Operation, PortError>,
    calls: HashMap<Operation, usize>,
    last_created: Option<DateTime<Utc>>,
}

pub struct InMemoryBackend {
    inner: Mutex<Inner>,
    events: broadcast::Sender<SessionEvent>,
    bucket: String,
    latency: Option<Duration>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Mutex::new(Inner::default()),
            events,
            bucket: "notes-pdfs".to_string(),
            latency: None,
        }
    }

    /// Every call sleeps for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panicking test thread must not poison every later assertion.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Creates an account without signing it in.
    pub fn register_user(&self, email: &str, password: &str) -> Identity {
        let identity = Identity {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
        };
        self.lock()
            .users
            .insert(email.to_string(), (identity.clone(), password.to_string()));
        identity
    }

    /// Pretends a previous run left this session behind.
    pub fn persist_session(&self, identity: Identity) {
        self.lock().session = Some(identity);
    }

    /// Pushes a session event to every subscriber, as a token refresh would.
    pub fn emit(&self, kind: SessionEventKind, identity: Option<Identity>) {
        let _ = self.events.send(SessionEvent { kind, identity });
    }

    /// Inserts a note and its file directly, bypassing call counting.
    pub fn seed_note(&self, note: NewNote, bytes: Bytes) -> Note {
        let mut inner = self.lock();
        inner.objects.insert(note.file_path.clone(), bytes);
        Self::store_note(&mut inner, note)
    }

    /// Makes the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: Operation, error: PortError) {
        self.lock().failures.insert(op, error);
    }

    pub fn calls(&self, op: Operation) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.lock().objects.get(key).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }

    /// Resolves a URL handed out by `public_url`.
    pub fn fetch_url(&self, url: &str) -> Option<Bytes> {
        let rest = url.strip_prefix(URL_SCHEME)?;
        let key = rest.strip_prefix(self.bucket.as_str())?.strip_prefix('/')?;
        self.object(key)
    }

    pub fn stored_notes(&self) -> Vec<Note> {
        self.lock().notes.clone()
    }

    async fn enter(&self, op: Operation) -> PortResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut inner = self.lock();
        *inner.calls.entry(op).or_insert(0) += 1;
        match inner.failures.remove(&op) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn store_note(inner: &mut Inner, note: NewNote) -> Note {
        // Strictly increasing timestamps keep newest-first ordering stable.
        let now = Utc::now();
        let created_at = match inner.last_created {
            Some(last) if now <= last => last + ChronoDuration::milliseconds(1),
            _ => now,
        };
        inner.last_created = Some(created_at);

        let stored = Note {
            id: NoteId(Uuid::new_v4().to_string()),
            title: note.title,
            description: note.description,
            course: note.course,
            major: note.major,
            file_path: note.file_path,
            file_url: note.file_url,
            user_id: note.user_id,
            user_email: note.user_email,
            created_at,
        };
        inner.notes.push(stored.clone());
        stored
    }
}

#[async_trait]
impl AuthService for InMemoryBackend {
    async fn get_session(&self) -> PortResult<Option<Identity>> {
        self.enter(Operation::GetSession).await?;
        Ok(self.lock().session.clone())
    }

    fn on_session_change(&self) -> SessionEvents {
        broadcast_stream(self.events.subscribe())
    }

    async fn sign_up(&self, email: &str, password: &str) -> PortResult<Option<Identity>> {
        self.enter(Operation::SignUp).await?;
        if self.lock().users.contains_key(email) {
            return Err(PortError::Rejected("User already registered".to_string()));
        }
        let identity = self.register_user(email, password);
        self.lock().session = Some(identity.clone());
        self.emit(SessionEventKind::SignedIn, Some(identity.clone()));
        Ok(Some(identity))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> PortResult<Identity> {
        self.enter(Operation::SignIn).await?;
        let identity = {
            let mut inner = self.lock();
            let identity = match inner.users.get(email) {
                Some((identity, stored)) if stored == password => identity.clone(),
                _ => return Err(PortError::Rejected("Invalid login credentials".to_string())),
            };
            inner.session = Some(identity.clone());
            identity
        };
        self.emit(SessionEventKind::SignedIn, Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> PortResult<()> {
        self.enter(Operation::SignOut).await?;
        self.lock().session = None;
        self.emit(SessionEventKind::SignedOut, None);
        Ok(())
    }
}

#[async_trait]
impl NoteRepository for InMemoryBackend {
    async fn list_notes(&self) -> PortResult<Vec<Note>> {
        self.enter(Operation::ListNotes).await?;
        let mut notes = self.lock().notes.clone();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes)
    }

    async fn insert_note(&self, note: NewNote) -> PortResult<Note> {
        self.enter(Operation::InsertNote).await?;
        Ok(Self::store_note(&mut self.lock(), note))
    }

    async fn delete_note(&self, id: &NoteId) -> PortResult<()> {
        self.enter(Operation::DeleteNote).await?;
        let mut inner = self.lock();
        let before = inner.notes.len();
        inner.notes.retain(|n| &n.id != id);
        if inner.notes.len() == before {
            return Err(PortError::NotFound(format!("Note {} not found", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for InMemoryBackend {
    async fn upload(&self, key: &str, bytes: Bytes, _content_type: &str) -> PortResult<()> {
        self.enter(Operation::Upload).await?;
        let mut inner = self.lock();
        if inner.objects.contains_key(key) {
            return Err(PortError::Rejected("The resource already exists".to_string()));
        }
        inner.objects.insert(key.to_string(), bytes);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}{}/{}", URL_SCHEME, self.bucket, key)
    }

    async fn remove(&self, keys: &[String]) -> PortResult<()> {
        self.enter(Operation::Remove).await?;
        let mut inner = self.lock();
        for key in keys {
            inner.objects.remove(key);
        }
        Ok(())
    }
}
