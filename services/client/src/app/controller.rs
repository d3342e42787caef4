//! services/client/src/app/controller.rs
//!
//! `NoteCycle` wires the session manager, the notes directory, both
//! orchestrators and the view router into the one component the front end
//! drives. It owns the browse filter; everything else lives in the parts.

use crate::app::delete::{ConfirmationPrompt, DeleteOrchestrator, DeleteOutcome};
use crate::app::directory::NotesDirectory;
use crate::app::router::{AuthMode, Navigation, View, ViewRouter};
use crate::app::session::SessionManager;
use crate::app::state::AppState;
use crate::app::upload::{UploadForm, UploadOrchestrator};
use crate::error::ActionError;
use note_cycle_core::domain::{CourseCatalog, Identity, MajorFilter, Note};
use std::sync::Arc;
use tracing::info;

pub struct NoteCycle {
    state: Arc<AppState>,
    session: SessionManager,
    directory: NotesDirectory,
    upload: UploadOrchestrator,
    delete: DeleteOrchestrator,
    router: ViewRouter,
    selected_major: MajorFilter,
}

impl NoteCycle {
    pub fn new(state: Arc<AppState>, prompt: Arc<dyn ConfirmationPrompt>) -> Self {
        Self {
            session: SessionManager::new(state.clone()),
            directory: NotesDirectory::new(state.clone()),
            upload: UploadOrchestrator::new(state.clone()),
            delete: DeleteOrchestrator::new(state.clone(), prompt),
            router: ViewRouter::default(),
            selected_major: MajorFilter::All,
            state,
        }
    }

    /// Restores the session and loads the notes. Anonymous browsing needs no identity.
    pub async fn start(&mut self) {
        self.session.start().await;
        self.directory.fetch_all().await;
    }

    pub async fn shutdown(&mut self) {
        self.session.shutdown().await;
    }

    // --- Read Access ---

    pub fn identity(&self) -> Option<Identity> {
        self.session.current()
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn directory(&self) -> &NotesDirectory {
        &self.directory
    }

    pub fn catalog(&self) -> &CourseCatalog {
        &self.state.catalog
    }

    pub fn router(&self) -> &ViewRouter {
        &self.router
    }

    pub fn view(&self) -> View {
        self.router.view(self.session.is_authenticated())
    }

    pub fn selected_major(&self) -> MajorFilter {
        self.selected_major
    }

    /// The notes grid under the current filter.
    pub fn visible_notes(&self) -> Vec<Note> {
        self.directory.filter(&self.selected_major)
    }

    // --- Navigation and Browsing ---

    pub fn navigate(&mut self, navigation: Navigation) {
        self.router.navigate(navigation);
    }

    pub fn select_major(&mut self, filter: MajorFilter) {
        self.selected_major = filter;
    }

    pub async fn refresh(&self) -> bool {
        self.directory.fetch_all().await
    }

    // --- Authentication ---

    pub fn open_auth(&mut self, mode: AuthMode) {
        self.router.open_auth(mode);
    }

    pub fn close_auth(&mut self) {
        self.router.close_auth();
    }

    pub fn toggle_auth_mode(&mut self) {
        if let Some(modal) = self.router.auth_modal_mut() {
            modal.toggle_mode();
        }
    }

    /// Fills in the open auth form.
    pub fn fill_auth(&mut self, email: &str, password: &str) {
        if let Some(modal) = self.router.auth_modal_mut() {
            modal.email = email.to_string();
            modal.password = password.to_string();
        }
    }

    /// Submits the open auth form. Errors are also kept on the form for display.
    ///
    /// Returns the new identity, or `None` for a sign-up awaiting email confirmation.
    pub async fn submit_auth(&mut self) -> Result<Option<Identity>, ActionError> {
        let Some(modal) = self.router.auth_modal_mut() else {
            return Ok(self.session.current());
        };
        modal.error = None;
        if let Err(e) = modal.validate() {
            modal.error = Some(e.to_string());
            return Err(e.into());
        }
        modal.loading = true;
        let (mode, email, password) = (modal.mode, modal.email.trim().to_string(), modal.password.clone());

        let result = match mode {
            AuthMode::SignIn => self.session.sign_in(&email, &password).await.map(Some),
            AuthMode::SignUp => self.session.sign_up(&email, &password).await,
        };

        match result {
            Ok(identity) => {
                self.router.on_authenticated();
                Ok(identity)
            }
            Err(e) => {
                if let Some(modal) = self.router.auth_modal_mut() {
                    modal.loading = false;
                    modal.error = Some(e.to_string());
                }
                Err(e)
            }
        }
    }

    pub async fn sign_out(&mut self) {
        self.session.sign_out().await;
        self.router.on_signed_out();
        self.selected_major = MajorFilter::All;
        info!("Signed out");
    }

    // --- Upload ---

    /// Opens the upload surface, or the sign-up form when signed out.
    pub fn open_upload(&mut self) -> bool {
        self.router.open_upload(self.session.is_authenticated())
    }

    pub fn close_upload(&mut self) {
        self.router.close_upload();
    }

    pub fn upload_form(&self) -> UploadForm {
        self.upload.form()
    }

    pub fn edit_upload_form<R>(&self, edit: impl FnOnce(&mut UploadForm) -> R) -> R {
        self.upload.edit_form(edit)
    }

    pub fn is_uploading(&self) -> bool {
        self.upload.is_busy()
    }

    /// Submits the upload form; on success the surface closes.
    pub async fn submit_upload(&mut self) -> Result<Note, ActionError> {
        let identity = self.session.current();
        let note = self.upload.submit(identity.as_ref(), &self.directory).await?;
        self.router.close_upload();
        Ok(note)
    }

    // --- Delete ---

    /// Deletes one of the caller's notes. Signed-out callers are sent to the sign-in form.
    pub async fn delete_note(&mut self, note: &Note) -> Result<DeleteOutcome, ActionError> {
        let identity = self.session.current();
        let result = self.delete.delete(note, identity.as_ref(), &self.directory).await;
        if identity.is_none() && matches!(result, Err(ActionError::Authorization(_))) {
            self.router.open_auth(AuthMode::SignIn);
        }
        result
    }

    pub fn is_deleting(&self) -> bool {
        self.delete.is_busy()
    }
}
