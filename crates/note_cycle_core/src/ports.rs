//! crates/note_cycle_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete backend-as-a-service it talks to.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use crate::domain::{Identity, NewNote, Note, NoteId, SessionEvent};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., HTTP, storage).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The backend refused the request; the message is its own wording.
    #[error("{0}")]
    Rejected(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("The backend did not answer within {0:?}")]
    Timeout(std::time::Duration),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// An owned stream of session changes. Dropping it releases the subscription.
pub type SessionEvents = Pin<Box<dyn Stream<Item = SessionEvent> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Looks up a persisted session and returns its user, if any.
    async fn get_session(&self) -> PortResult<Option<Identity>>;

    /// Subscribes to sign-in, sign-out and token refresh notifications.
    fn on_session_change(&self) -> SessionEvents;

    /// Registers a new account. Returns `None` when the backend requires
    /// email confirmation before a session is issued.
    async fn sign_up(&self, email: &str, password: &str) -> PortResult<Option<Identity>>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> PortResult<Identity>;

    async fn sign_out(&self) -> PortResult<()>;
}

#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Every note, newest `created_at` first.
    async fn list_notes(&self) -> PortResult<Vec<Note>>;

    async fn insert_note(&self, note: NewNote) -> PortResult<Note>;

    async fn delete_note(&self, id: &NoteId) -> PortResult<()>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, key: &str, bytes: Bytes, content_type: &str) -> PortResult<()>;

    /// Resolves the public link of a stored key. Derivable without a network call.
    fn public_url(&self, key: &str) -> String;

    async fn remove(&self, keys: &[String]) -> PortResult<()>;
}
