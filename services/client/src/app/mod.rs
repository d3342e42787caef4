pub mod controller;
pub mod delete;
pub mod directory;
pub mod protocol;
pub mod render;
pub mod router;
pub mod session;
pub mod state;
pub mod terminal;
pub mod upload;

// Re-export the pieces the binary and the integration tests build the client from.
pub use controller::NoteCycle;
pub use delete::{ConfirmationPrompt, DeleteOutcome, DELETE_CONFIRMATION};
pub use state::AppState;
pub use terminal::Terminal;
