//! services/client/src/app/directory.rs
//!
//! The notes directory: the single owner of the fetched note collection.

use crate::app::state::AppState;
use crate::config::FetchFailurePolicy;
use note_cycle_core::domain::{filter_notes, MajorFilter, Note, NoteId};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error};

/// What the notes grid renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryState {
    /// Newest first, exactly as the backend returned them.
    pub notes: Vec<Note>,
    /// A fetch is in flight; render a placeholder instead of the grid.
    pub loading: bool,
    /// Only ever set under `FetchFailurePolicy::Notify`.
    pub last_error: Option<String>,
}

pub struct NotesDirectory {
    state: Arc<AppState>,
    store: watch::Sender<DirectoryState>,
}

impl NotesDirectory {
    /// Starts out loading, since nothing has been fetched yet.
    pub fn new(state: Arc<AppState>) -> Self {
        let (store, _) = watch::channel(DirectoryState {
            loading: true,
            ..DirectoryState::default()
        });
        Self { state, store }
    }

    /// Replaces the collection with every note, newest first.
    ///
    /// On failure the previous notes stay in place. Returns whether the fetch succeeded.
    pub async fn fetch_all(&self) -> bool {
        self.store.send_modify(|s| s.loading = true);

        let result = self.state.bounded(self.state.notes.list_notes()).await;
        let policy = self.state.config.fetch_failure_policy;

        match result {
            Ok(notes) => {
                debug!("Fetched {} notes", notes.len());
                self.store.send_modify(|s| {
                    s.notes = notes;
                    s.loading = false;
                    s.last_error = None;
                });
                true
            }
            Err(e) => {
                error!("Error fetching notes: {}", e);
                self.store.send_modify(|s| {
                    s.loading = false;
                    if policy == FetchFailurePolicy::Notify {
                        s.last_error = Some(format!("Could not refresh notes: {}", e));
                    }
                });
                false
            }
        }
    }

    pub fn snapshot(&self) -> DirectoryState {
        self.store.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DirectoryState> {
        self.store.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.store.borrow().loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.store.borrow().last_error.clone()
    }

    pub fn notes(&self) -> Vec<Note> {
        self.store.borrow().notes.clone()
    }

    /// The notes of one major, or all of them, in collection order.
    pub fn filter(&self, filter: &MajorFilter) -> Vec<Note> {
        filter_notes(&self.store.borrow().notes, filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn find(&self, id: &NoteId) -> Option<Note> {
        self.store.borrow().notes.iter().find(|n| &n.id == id).cloned()
    }
}
