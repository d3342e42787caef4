//! services/client/src/app/router.rs
//!
//! The view router: which page is showing and which overlays sit on top of it.
//! The page is derived from the navigation choice and the auth state, so two
//! pages can never be active at once.

use crate::error::ValidationError;

/// Shortest password the auth backend accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

/// The user's last explicit navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Navigation {
    #[default]
    Home,
    About,
    Notes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Landing,
    About,
    Main,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    SignIn,
    SignUp,
}

/// The sign-in / sign-up overlay and its form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthModal {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub error: Option<String>,
    pub loading: bool,
}

impl AuthModal {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            email: String::new(),
            password: String::new(),
            error: None,
            loading: false,
        }
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        };
        self.error = None;
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.email.trim().is_empty() {
            return Err(ValidationError::MissingEmail);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LEN));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ViewRouter {
    navigation: Navigation,
    auth_modal: Option<AuthModal>,
    upload_open: bool,
}

impl ViewRouter {
    pub fn view(&self, authenticated: bool) -> View {
        match self.navigation {
            Navigation::About => View::About,
            Navigation::Notes => View::Main,
            Navigation::Home if authenticated => View::Main,
            Navigation::Home => View::Landing,
        }
    }

    pub fn navigation(&self) -> Navigation {
        self.navigation
    }

    pub fn navigate(&mut self, navigation: Navigation) {
        self.navigation = navigation;
    }

    pub fn auth_modal(&self) -> Option<&AuthModal> {
        self.auth_modal.as_ref()
    }

    pub fn auth_modal_mut(&mut self) -> Option<&mut AuthModal> {
        self.auth_modal.as_mut()
    }

    /// Opens the auth overlay in `mode`, keeping any form already open.
    pub fn open_auth(&mut self, mode: AuthMode) {
        match &mut self.auth_modal {
            Some(modal) if modal.mode != mode => modal.toggle_mode(),
            Some(_) => {}
            None => self.auth_modal = Some(AuthModal::new(mode)),
        }
    }

    /// Dismisses the auth overlay, discarding its form and error.
    pub fn close_auth(&mut self) {
        self.auth_modal = None;
    }

    pub fn is_upload_open(&self) -> bool {
        self.upload_open
    }

    /// Opens the upload overlay, or the sign-up overlay when signed out.
    /// Returns whether the upload overlay opened.
    pub fn open_upload(&mut self, authenticated: bool) -> bool {
        if authenticated {
            self.upload_open = true;
        } else {
            self.open_auth(AuthMode::SignUp);
        }
        authenticated
    }

    pub fn close_upload(&mut self) {
        self.upload_open = false;
    }

    /// Successful sign-in or sign-up.
    pub fn on_authenticated(&mut self) {
        self.close_auth();
    }

    /// The upload overlay cannot outlive the session.
    pub fn on_signed_out(&mut self) {
        self.upload_open = false;
    }
}
