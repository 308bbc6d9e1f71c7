//! Ceremony entry points keyed by opaque state tokens
//!
//! [`PasskeyManager`] pairs both ceremonies with a [`CeremonyStateStore`]:
//! `*_begin` stores the ceremony state and hands back its token,
//! `*_complete` takes the state out of the store before verifying, so a
//! token is good for one attempt only.

use std::sync::Arc;

use serde::Serialize;

use crate::authentication::AuthenticationCeremony;
use crate::credential::{AuthResult, CredentialSummary};
use crate::error::{CeremonyError, Result};
use crate::options::{CreationOptions, PublicKeyOptions, RequestOptions};
use crate::registration::RegistrationCeremony;
use crate::relying_party::{CeremonyPolicy, RelyingParty};
use crate::response::{AuthenticationResponse, RegistrationResponse};
use crate::state::CeremonyState;
use crate::store::{
    CeremonyStateStore, CredentialStore, MemoryCeremonyStateStore, MemoryCredentialStore,
};

/// Options for the client plus the token identifying the pending ceremony
#[derive(Debug, Clone, Serialize)]
pub struct BegunCeremony<T> {
    pub state_token: String,
    #[serde(flatten)]
    pub options: PublicKeyOptions<T>,
}

pub struct PasskeyManager {
    rp: Arc<RelyingParty>,
    registration: RegistrationCeremony,
    authentication: AuthenticationCeremony,
    credentials: Arc<dyn CredentialStore>,
    states: Arc<dyn CeremonyStateStore>,
}

impl PasskeyManager {
    pub fn new(
        rp: RelyingParty,
        policy: CeremonyPolicy,
        credentials: Arc<dyn CredentialStore>,
        states: Arc<dyn CeremonyStateStore>,
    ) -> Self {
        let rp = Arc::new(rp);
        Self {
            registration: RegistrationCeremony::new(rp.clone(), policy, credentials.clone()),
            authentication: AuthenticationCeremony::new(rp.clone(), policy, credentials.clone()),
            rp,
            credentials,
            states,
        }
    }

    /// Manager with in-memory credential and state stores
    pub fn in_memory(rp: RelyingParty, policy: CeremonyPolicy) -> Self {
        Self::new(
            rp,
            policy,
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemoryCeremonyStateStore::new()),
        )
    }

    pub fn relying_party(&self) -> &RelyingParty {
        &self.rp
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub async fn register_begin(
        &self,
        username: &str,
        display_name: Option<&str>,
    ) -> Result<BegunCeremony<CreationOptions>> {
        let (options, state) = self.registration.begin(username, display_name).await?;
        let state_token = self.put_state(state).await?;
        Ok(BegunCeremony {
            state_token,
            options: options.into(),
        })
    }

    pub async fn register_complete(
        &self,
        state_token: &str,
        response: &RegistrationResponse,
    ) -> Result<CredentialSummary> {
        let state = self.take_state(state_token).await?;
        self.registration.complete(state, response).await
    }

    pub async fn authenticate_begin(&self, username: &str) -> Result<BegunCeremony<RequestOptions>> {
        let (options, state) = self.authentication.begin(username).await?;
        let state_token = self.put_state(state).await?;
        Ok(BegunCeremony {
            state_token,
            options: options.into(),
        })
    }

    pub async fn authenticate_complete(
        &self,
        state_token: &str,
        response: &AuthenticationResponse,
    ) -> Result<AuthResult> {
        let state = self.take_state(state_token).await?;
        self.authentication.complete(state, response).await
    }

    /// Drop expired ceremony states. Meant to be called periodically.
    pub async fn purge_expired_states(&self) -> Result<usize> {
        let purged = self
            .states
            .purge_expired()
            .await
            .map_err(CeremonyError::from_store)?;
        if purged > 0 {
            tracing::debug!(purged, "Purged expired ceremony states");
        }
        Ok(purged)
    }

    async fn put_state(&self, state: CeremonyState) -> Result<String> {
        self.states.put(state).await.map_err(CeremonyError::from_store)
    }

    async fn take_state(&self, state_token: &str) -> Result<CeremonyState> {
        self.states
            .take(state_token)
            .await
            .map_err(CeremonyError::from_store)?
            .ok_or_else(|| {
                tracing::warn!("Unknown, expired or already used ceremony state token");
                CeremonyError::StateExpired
            })
    }
}

impl std::fmt::Debug for PasskeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasskeyManager")
            .field("rp_id", &self.rp.id())
            .finish()
    }
}
