//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use passkey_core::PasskeyManager;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Ceremony engine with its credential and ceremony state stores
    pub passkeys: Arc<PasskeyManager>,
    /// Whether credentials survive a restart
    pub persistent_storage: bool,
}

impl AppState {
    pub fn new(passkeys: PasskeyManager, persistent_storage: bool) -> Self {
        Self {
            passkeys: Arc::new(passkeys),
            persistent_storage,
        }
    }
}
