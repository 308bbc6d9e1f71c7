//! Storage contracts consumed by the ceremonies
//!
//! - **Credentials** are durable. Inserts are unique on credential id and the
//!   sign counter is only ever written through a compare-and-swap.
//! - **Ceremony states** are short-lived and consumed at most once. Expired
//!   entries are dropped by [`CeremonyStateStore::purge_expired`].
//!
//! In-memory implementations live in [`memory`]; the server crate provides a
//! PostgreSQL credential store.

pub mod memory;

use async_trait::async_trait;

use crate::credential::Credential;
use crate::state::CeremonyState;

pub use memory::{MemoryCeremonyStateStore, MemoryCredentialStore};

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Credential id already exists")]
    Duplicate,

    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Database migration error: {0}")]
    Migration(String),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// All credentials owned by `username`, oldest first.
    async fn find_by_username(&self, username: &str) -> Result<Vec<Credential>, StoreError>;

    async fn find_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<Credential>, StoreError>;

    /// Insert a new credential. Fails with [`StoreError::Duplicate`] if the
    /// credential id is taken; existing records are never overwritten.
    async fn insert(&self, credential: Credential) -> Result<(), StoreError>;

    /// Set `sign_count = new` only if it currently equals `expected`.
    ///
    /// Returns `false` when the credential is gone or the counter moved.
    async fn update_sign_count(
        &self,
        credential_id: &[u8],
        expected: u32,
        new: u32,
    ) -> Result<bool, StoreError>;

    async fn check_health(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
pub trait CeremonyStateStore: Send + Sync {
    /// Store `state` and return the opaque token that retrieves it.
    async fn put(&self, state: CeremonyState) -> Result<String, StoreError>;

    /// Remove and return the state for `token`.
    ///
    /// The entry is removed even when it has expired, in which case `None`
    /// is returned.
    async fn take(&self, token: &str) -> Result<Option<CeremonyState>, StoreError>;

    /// Drop expired states. Returns how many were removed.
    async fn purge_expired(&self) -> Result<usize, StoreError>;
}
