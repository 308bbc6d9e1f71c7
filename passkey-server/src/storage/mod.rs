//! Credential storage selection
//!
//! PostgreSQL when `DATABASE_URL` is set, otherwise the in-memory store from
//! `passkey_core` (development only: credentials are lost on restart).
//! Ceremony states always live in memory.

mod postgres;

pub use postgres::PostgresCredentialStore;

use std::sync::Arc;

use passkey_core::{CredentialStore, MemoryCredentialStore, StoreError};

use crate::config::Config;

/// Open the configured credential store, running migrations for PostgreSQL.
pub async fn open_credential_store(
    config: &Config,
) -> Result<Arc<dyn CredentialStore>, StoreError> {
    match config.database_url.as_deref() {
        Some(url) => {
            let store =
                PostgresCredentialStore::connect(url, config.database_max_connections).await?;
            store.migrate().await?;
            tracing::info!("Using PostgreSQL credential storage");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set, using in-memory credential storage (credentials will be lost on restart)"
            );
            Ok(Arc::new(MemoryCredentialStore::new()))
        }
    }
}
