//! services/client/src/app/delete.rs
//!
//! The delete orchestrator. Only a note's creator may delete it, only after
//! saying yes, and the stored file goes first: a note record is never removed
//! while its file is still reachable.

use crate::app::directory::NotesDirectory;
use crate::app::state::{AppState, BusyGuard};
use crate::error::ActionError;
use async_trait::async_trait;
use note_cycle_core::domain::{Identity, Note};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

pub const DELETE_CONFIRMATION: &str = "Are you sure you want to delete this note?";

/// An interactive yes/no gate.
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The user said no; nothing was touched.
    Cancelled,
}

pub struct DeleteOrchestrator {
    state: Arc<AppState>,
    prompt: Arc<dyn ConfirmationPrompt>,
    busy: AtomicBool,
}

impl DeleteOrchestrator {
    pub fn new(state: Arc<AppState>, prompt: Arc<dyn ConfirmationPrompt>) -> Self {
        Self {
            state,
            prompt,
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn delete(
        &self,
        note: &Note,
        identity: Option<&Identity>,
        directory: &NotesDirectory,
    ) -> Result<DeleteOutcome, ActionError> {
        if !identity.is_some_and(|identity| note.is_owned_by(identity)) {
            return Err(ActionError::Authorization(
                "You can only delete your own notes".to_string(),
            ));
        }

        let _busy = BusyGuard::acquire(&self.busy).ok_or(ActionError::Busy("delete"))?;

        if !self.prompt.confirm(DELETE_CONFIRMATION).await {
            info!("Deletion of note {} cancelled", note.id);
            return Ok(DeleteOutcome::Cancelled);
        }

        let keys = [note.file_path.clone()];
        self.state
            .bounded(self.state.storage.remove(&keys))
            .await
            .map_err(|e| {
                error!("Error deleting file of note {}: {}", note.id, e);
                ActionError::StorageDelete(e)
            })?;

        self.state
            .bounded(self.state.notes.delete_note(&note.id))
            .await
            .map_err(|e| {
                error!(
                    "File {} is gone but note {} could not be deleted: {}",
                    note.file_path, note.id, e
                );
                ActionError::MetadataDelete(e)
            })?;

        info!("Deleted note {}", note.id);
        directory.fetch_all().await;
        Ok(DeleteOutcome::Deleted)
    }
}
