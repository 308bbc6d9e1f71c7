//! In-memory stores backed by `DashMap`
//!
//! Credentials kept here are lost on restart; use them for development and
//! tests.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::{CeremonyStateStore, CredentialStore, StoreError};
use crate::credential::Credential;
use crate::state::CeremonyState;

#[derive(Default)]
pub struct MemoryCredentialStore {
    credentials: DashMap<Vec<u8>, Credential>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Vec<Credential>, StoreError> {
        let mut found: Vec<Credential> = self
            .credentials
            .iter()
            .filter(|entry| entry.owner_username == username)
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|c| c.created_at);
        Ok(found)
    }

    async fn find_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<Credential>, StoreError> {
        Ok(self
            .credentials
            .get(credential_id)
            .map(|entry| entry.value().clone()))
    }

    async fn insert(&self, credential: Credential) -> Result<(), StoreError> {
        match self.credentials.entry(credential.credential_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate),
            Entry::Vacant(slot) => {
                slot.insert(credential);
                Ok(())
            }
        }
    }

    async fn update_sign_count(
        &self,
        credential_id: &[u8],
        expected: u32,
        new: u32,
    ) -> Result<bool, StoreError> {
        // The shard write lock makes the compare and the swap atomic.
        match self.credentials.get_mut(credential_id) {
            Some(mut entry) if entry.sign_count == expected => {
                entry.sign_count = new;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl std::fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCredentialStore")
            .field("credentials", &self.credentials.len())
            .finish()
    }
}

/// Ceremony states keyed by random UUID token
#[derive(Default)]
pub struct MemoryCeremonyStateStore {
    states: DashMap<String, CeremonyState>,
}

impl MemoryCeremonyStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending states, expired ones included
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[async_trait]
impl CeremonyStateStore for MemoryCeremonyStateStore {
    async fn put(&self, state: CeremonyState) -> Result<String, StoreError> {
        let token = Uuid::new_v4().to_string();
        self.states.insert(token.clone(), state);
        Ok(token)
    }

    async fn take(&self, token: &str) -> Result<Option<CeremonyState>, StoreError> {
        let Some((_, state)) = self.states.remove(token) else {
            return Ok(None);
        };
        if state.is_expired() {
            Ok(None)
        } else {
            Ok(Some(state))
        }
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = Utc::now();
        let before = self.states.len();
        self.states.retain(|_, state| !state.is_expired_at(now));
        Ok(before.saturating_sub(self.states.len()))
    }
}

impl std::fmt::Debug for MemoryCeremonyStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCeremonyStateStore")
            .field("states", &self.states.len())
            .finish()
    }
}
