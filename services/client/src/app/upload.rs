//! services/client/src/app/upload.rs
//!
//! The upload orchestrator. Owns the upload form and drives the two-step
//! upload: store the file, then record its metadata. A metadata write the
//! backend refused removes the file it just stored. A write whose outcome is
//! unknown is checked against the listing first, since removing the file of a
//! recorded note would leave a record pointing at nothing.

use crate::app::directory::NotesDirectory;
use crate::app::state::{AppState, BusyGuard};
use crate::error::{ActionError, ValidationError};
use bytes::Bytes;
use chrono::Utc;
use note_cycle_core::domain::{storage_key, CourseCatalog, Identity, Major, NewNote, Note};
use note_cycle_core::ports::PortError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Types the file by its content: PDFs start with `%PDF-`.
    pub fn sniffed(name: impl Into<String>, bytes: Bytes) -> Self {
        let content_type = if bytes.starts_with(b"%PDF-") {
            PDF_CONTENT_TYPE
        } else {
            "application/octet-stream"
        };
        Self::new(name, content_type, bytes)
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type == PDF_CONTENT_TYPE
    }
}

/// The fields behind the upload surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadForm {
    pub title: String,
    pub description: String,
    pub course: String,
    major: Major,
    file: Option<UploadFile>,
}

impl UploadForm {
    pub fn major(&self) -> Major {
        self.major
    }

    /// Switching majors clears the course, which belonged to the old major.
    pub fn set_major(&mut self, major: Major) {
        if self.major != major {
            self.major = major;
            self.course.clear();
        }
    }

    pub fn file(&self) -> Option<&UploadFile> {
        self.file.as_ref()
    }

    /// Accepts PDFs only; anything else keeps the previous selection.
    pub fn choose_file(&mut self, file: UploadFile) -> Result<(), ValidationError> {
        if !file.is_pdf() {
            return Err(ValidationError::NotPdf);
        }
        self.file = Some(file);
        Ok(())
    }

    /// Checks everything that can be checked without the network.
    pub fn validate<'a>(
        &'a self,
        catalog: &CourseCatalog,
        identity: Option<&'a Identity>,
    ) -> Result<(&'a UploadFile, &'a Identity), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        if self.course.is_empty() {
            return Err(ValidationError::MissingCourse);
        }
        if !catalog.contains(self.major, &self.course) {
            return Err(ValidationError::CourseNotInMajor {
                course: self.course.clone(),
                major: self.major.to_string(),
            });
        }
        let file = self.file.as_ref().ok_or(ValidationError::MissingFile)?;
        if !file.is_pdf() {
            return Err(ValidationError::NotPdf);
        }
        let identity = identity.ok_or(ValidationError::NotAuthenticated)?;
        Ok((file, identity))
    }
}

pub struct UploadOrchestrator {
    state: Arc<AppState>,
    form: Mutex<UploadForm>,
    busy: AtomicBool,
}

impl UploadOrchestrator {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            form: Mutex::new(UploadForm::default()),
            busy: AtomicBool::new(false),
        }
    }

    /// True while a submission is in flight; the submit control is disabled meanwhile.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn lock_form(&self) -> MutexGuard<'_, UploadForm> {
        self.form.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn form(&self) -> UploadForm {
        self.lock_form().clone()
    }

    pub fn edit_form<R>(&self, edit: impl FnOnce(&mut UploadForm) -> R) -> R {
        let mut form = self.lock_form();
        edit(&mut *form)
    }

    pub fn reset_form(&self) {
        *self.lock_form() = UploadForm::default();
    }

    /// Uploads the form's file and records it as a note.
    ///
    /// On success the directory is refreshed and the form reset.
    pub async fn submit(
        &self,
        identity: Option<&Identity>,
        directory: &NotesDirectory,
    ) -> Result<Note, ActionError> {
        let _busy = BusyGuard::acquire(&self.busy).ok_or(ActionError::Busy("upload"))?;

        let form = self.form();
        let (file, identity) = form.validate(&self.state.catalog, identity)?;

        let key = storage_key(
            form.major,
            &form.course,
            &file.name,
            Utc::now().timestamp_millis(),
            &random_suffix(),
        );

        info!("Uploading {} to {}", file.name, key);
        self.state
            .bounded(self.state.storage.upload(&key, file.bytes.clone(), &file.content_type))
            .await
            .map_err(|e| {
                error!("Error uploading note file: {}", e);
                ActionError::StorageWrite(e)
            })?;

        let file_url = self.state.storage.public_url(&key);
        let description = form.description.trim();
        let new_note = NewNote {
            title: form.title.trim().to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            course: form.course.clone(),
            major: form.major,
            file_path: key.clone(),
            file_url,
            user_id: identity.id.clone(),
            user_email: identity.email.clone(),
        };

        let note = match self.state.bounded(self.state.notes.insert_note(new_note)).await {
            Ok(note) => note,
            Err(e) => {
                error!("Error recording note metadata: {}", e);
                match self.settle_failed_insert(&key, &e).await {
                    Some(note) => note,
                    None => return Err(ActionError::MetadataWrite(e)),
                }
            }
        };
        info!("Note {} recorded", note.id);

        directory.fetch_all().await;
        self.reset_form();
        Ok(note)
    }

    /// Decides what a failed metadata write leaves behind.
    ///
    /// Returns the note when the write landed after all.
    async fn settle_failed_insert(&self, key: &str, error: &PortError) -> Option<Note> {
        match error {
            PortError::Rejected(_) | PortError::Unauthorized | PortError::NotFound(_) => {
                self.discard_orphan(key).await;
                None
            }
            PortError::Timeout(_) | PortError::Unexpected(_) => {
                match self.state.bounded(self.state.notes.list_notes()).await {
                    Ok(notes) => match notes.into_iter().find(|n| n.file_path == key) {
                        Some(note) => {
                            warn!("Note metadata for {} was recorded despite the error", key);
                            Some(note)
                        }
                        None => {
                            self.discard_orphan(key).await;
                            None
                        }
                    },
                    Err(e) => {
                        warn!("Keeping {}: could not tell whether its note was recorded: {}", key, e);
                        None
                    }
                }
            }
        }
    }

    /// Compensates a failed metadata write by removing the stored file.
    async fn discard_orphan(&self, key: &str) {
        let keys = [key.to_string()];
        match self.state.bounded(self.state.storage.remove(&keys)).await {
            Ok(()) => info!("Removed orphaned file {}", key),
            Err(e) => warn!("Could not remove orphaned file {}: {}", key, e),
        }
    }
}

/// Six base-36 characters, enough to keep keys from one millisecond apart.
fn random_suffix() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut n = Uuid::new_v4().as_u128();
    (0..6)
        .map(|_| {
            let c = ALPHABET[(n % 36) as usize] as char;
            n /= 36;
            c
        })
        .collect()
}
