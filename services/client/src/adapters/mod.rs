pub mod auth;
pub mod db;
pub mod memory;
mod session_store;
pub mod storage;
pub mod supabase;

pub use auth::SupabaseAuthAdapter;
pub use db::SupabaseNotesAdapter;
pub use memory::{InMemoryBackend, Operation};
pub use storage::SupabaseStorageAdapter;
pub use supabase::SupabaseClient;
