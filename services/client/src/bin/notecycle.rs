//! services/client/src/bin/notecycle.rs

use notecycle_lib::{
    adapters::{SupabaseAuthAdapter, SupabaseClient, SupabaseNotesAdapter, SupabaseStorageAdapter},
    app::{terminal, AppState, NoteCycle, Terminal},
    config::Config,
    error::AppError,
};
use note_cycle_core::domain::CourseCatalog;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    // Logs go to stderr so they never interleave with the pages on stdout.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded. Starting NoteCycle...");

    // --- 2. Initialize Backend Adapters ---
    let client = SupabaseClient::new(&config)?;
    let auth = Arc::new(SupabaseAuthAdapter::new(client.clone()));
    let notes = Arc::new(SupabaseNotesAdapter::new(client.clone(), config.notes_table.clone()));
    let storage = Arc::new(SupabaseStorageAdapter::new(client, config.notes_bucket.clone()));
    info!("Using backend at {}", config.supabase_url);

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        auth,
        notes,
        storage,
        catalog: Arc::new(CourseCatalog::default()),
        config: config.clone(),
    });

    // --- 4. Restore the Session & Load the Notes ---
    let term = Arc::new(Terminal::new());
    let mut app = NoteCycle::new(app_state, term.clone());
    app.start().await;

    // --- 5. Run the Prompt Until Quit ---
    let result = terminal::run(&mut app, &term).await;
    app.shutdown().await;
    info!("Goodbye.");

    result.map_err(AppError::from)
}
