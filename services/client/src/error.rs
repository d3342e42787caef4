//! services/client/src/error.rs
//!
//! Defines the error types of the client: the startup error of the binary and
//! the user-facing errors of the note actions.

use crate::config::ConfigError;
use note_cycle_core::ports::PortError;

/// The primary error type for starting and running the client.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents a standard Input/Output error (e.g., reading the terminal).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// A form field is missing or invalid. Reported next to the field; no network call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter a title")]
    MissingTitle,
    #[error("Please choose a course")]
    MissingCourse,
    #[error("{course} is not a {major} course")]
    CourseNotInMajor { course: String, major: String },
    #[error("Please select a PDF file")]
    MissingFile,
    #[error("Please select a PDF file")]
    NotPdf,
    #[error("Please log in to upload notes")]
    NotAuthenticated,
    #[error("Please enter your email")]
    MissingEmail,
    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),
}

/// The errors a user action can end in.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Sign-in or sign-up refused; carries the backend's message verbatim.
    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("Error uploading note: {0}")]
    StorageWrite(PortError),

    #[error("Error uploading note: {0}")]
    MetadataWrite(PortError),

    #[error("Error deleting note: {0}")]
    StorageDelete(PortError),

    #[error("Error deleting note: {0}")]
    MetadataDelete(PortError),

    /// Another action of the same kind is still in flight.
    #[error("Please wait for the current {0} to finish")]
    Busy(&'static str),
}
