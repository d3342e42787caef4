//! services/client/src/app/state.rs
//!
//! Defines the application's shared state and the helpers every orchestrator
//! uses around backend calls.

use crate::config::Config;
use note_cycle_core::domain::CourseCatalog;
use note_cycle_core::ports::{AuthService, NoteRepository, ObjectStorage, PortError, PortResult};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared by Every Component)
//=========================================================================================

/// The shared application state, created once at startup and passed to every component.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthService>,
    pub notes: Arc<dyn NoteRepository>,
    pub storage: Arc<dyn ObjectStorage>,
    pub catalog: Arc<CourseCatalog>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Builds the state around a single backend that serves all three ports.
    pub fn from_backend<B>(backend: Arc<B>, config: Config) -> Self
    where
        B: AuthService + NoteRepository + ObjectStorage + 'static,
    {
        Self {
            auth: backend.clone(),
            notes: backend.clone(),
            storage: backend,
            catalog: Arc::new(CourseCatalog::default()),
            config: Arc::new(config),
        }
    }

    /// Runs a backend call under the configured timeout.
    pub async fn bounded<T, F>(&self, call: F) -> PortResult<T>
    where
        F: Future<Output = PortResult<T>>,
    {
        let limit = self.config.backend_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(PortError::Timeout(limit)))
    }
}

//=========================================================================================
// Busy Guard
//=========================================================================================

/// Holds a busy flag for as long as it lives.
pub(crate) struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    /// Sets the flag, or returns `None` when it is already set.
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
