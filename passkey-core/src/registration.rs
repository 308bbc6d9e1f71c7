//! Registration ceremony
//!
//! `begin` issues creation options and a ceremony state; `complete` checks
//! the attestation response against that state and persists the new
//! credential.

use std::sync::Arc;

use chrono::Utc;

use crate::attestation::AttestationObject;
use crate::client_data::{ClientDataType, CollectedClientData};
use crate::credential::{validate_username, Credential, CredentialSummary};
use crate::encoding::{base64_url_encode, Base64UrlBytes};
use crate::error::{CeremonyError, Result};
use crate::options::{CreationOptions, CredentialDescriptor, RelyingPartyEntity, UserEntity};
use crate::random::{random_bytes, CHALLENGE_LEN, USER_HANDLE_LEN};
use crate::relying_party::{CeremonyPolicy, RelyingParty};
use crate::response::RegistrationResponse;
use crate::state::{CeremonyKind, CeremonyState, CeremonySubject};
use crate::store::CredentialStore;

pub struct RegistrationCeremony {
    rp: Arc<RelyingParty>,
    policy: CeremonyPolicy,
    credentials: Arc<dyn CredentialStore>,
}

impl RegistrationCeremony {
    pub fn new(
        rp: Arc<RelyingParty>,
        policy: CeremonyPolicy,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            rp,
            policy,
            credentials,
        }
    }

    /// Issue creation options for `username`.
    ///
    /// A user that already has credentials keeps its user handle and gets
    /// its existing credentials listed in `excludeCredentials`. Nothing is
    /// persisted.
    #[tracing::instrument(skip_all, fields(username = %username))]
    pub async fn begin(
        &self,
        username: &str,
        display_name: Option<&str>,
    ) -> Result<(CreationOptions, CeremonyState)> {
        let username = validate_username(username)?;
        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(username)
            .to_string();

        let existing = self
            .credentials
            .find_by_username(username)
            .await
            .map_err(CeremonyError::from_store)?;

        let user_handle = match existing.first() {
            Some(credential) => credential.user_handle.clone(),
            None => random_bytes(USER_HANDLE_LEN)?,
        };
        let exclude_credentials = existing
            .iter()
            .map(|credential| CredentialDescriptor::new(credential.credential_id.clone()))
            .collect();

        let challenge = random_bytes(CHALLENGE_LEN)?;

        let options = CreationOptions::new(
            RelyingPartyEntity {
                id: self.rp.id().to_string(),
                name: self.rp.name().to_string(),
            },
            UserEntity {
                id: Base64UrlBytes(user_handle.clone()),
                name: username.to_string(),
                display_name: display_name.clone(),
            },
            challenge.clone(),
            self.policy.timeout_ms(),
            self.policy.user_verification,
            exclude_credentials,
        )?;

        let state = CeremonyState::new(
            challenge,
            self.rp.id(),
            self.policy.timeout,
            CeremonySubject::Registration {
                username: username.to_string(),
                user_handle: Base64UrlBytes(user_handle),
                display_name,
            },
        )?;

        tracing::debug!(
            existing_credentials = existing.len(),
            "Registration ceremony started"
        );
        Ok((options, state))
    }

    /// Verify an attestation response and store the new credential.
    ///
    /// `state` is consumed whatever the outcome. On failure nothing is
    /// written.
    #[tracing::instrument(skip_all, fields(username = %state.username()))]
    pub async fn complete(
        &self,
        state: CeremonyState,
        response: &RegistrationResponse,
    ) -> Result<CredentialSummary> {
        let result = self.verify_and_store(state, response).await;
        if let Err(e) = &result {
            tracing::warn!(kind = %e.kind(), error = %e, "Registration rejected");
        }
        result
    }

    async fn verify_and_store(
        &self,
        state: CeremonyState,
        response: &RegistrationResponse,
    ) -> Result<CredentialSummary> {
        if state.kind() != CeremonyKind::Registration
            || state.is_expired()
            || state.rp_id != self.rp.id()
        {
            return Err(CeremonyError::StateExpired);
        }
        let CeremonySubject::Registration {
            username,
            user_handle,
            display_name,
        } = state.subject
        else {
            return Err(CeremonyError::StateExpired);
        };

        if !response.is_public_key() {
            return Err(CeremonyError::attestation(format!(
                "unexpected credential type {}",
                response.type_
            )));
        }

        let client_data =
            CollectedClientData::from_bytes(response.response.client_data_json.as_slice())?;
        client_data.verify(ClientDataType::Create, state.challenge.as_slice(), &self.rp)?;

        let attestation =
            AttestationObject::from_bytes(response.response.attestation_object.as_slice())?;
        let auth_data = attestation.auth_data;

        if auth_data.rp_id_hash != self.rp.rp_id_hash() {
            return Err(CeremonyError::RelyingPartyMismatch {
                rp_id: self.rp.id().to_string(),
            });
        }
        if !auth_data.flags.user_present() {
            return Err(CeremonyError::UserNotPresent);
        }
        if self.policy.requires_user_verification() && !auth_data.flags.user_verified() {
            return Err(CeremonyError::UserNotVerified);
        }

        let attested = auth_data
            .attested_credential
            .ok_or_else(|| CeremonyError::attestation("no attested credential data"))?;

        let claimed = response.credential_id().ok_or_else(|| {
            CeremonyError::attestation("credential id is not base64url or disagrees with rawId")
        })?;
        if claimed != attested.credential_id {
            return Err(CeremonyError::attestation(
                "response id does not match attested credential id",
            ));
        }

        if self
            .credentials
            .find_by_credential_id(&attested.credential_id)
            .await
            .map_err(CeremonyError::from_store)?
            .is_some()
        {
            return Err(CeremonyError::DuplicateCredential);
        }

        let user_handle = self.settle_user_handle(&username, user_handle.into_inner()).await?;

        let credential = Credential {
            credential_id: attested.credential_id,
            public_key: attested.public_key,
            sign_count: auth_data.counter,
            owner_username: username,
            user_handle,
            display_name,
            created_at: Utc::now(),
        };
        let summary = CredentialSummary {
            credential_id: Base64UrlBytes(credential.credential_id.clone()),
            username: credential.owner_username.clone(),
        };
        let algorithm = credential.public_key.algorithm();
        let sign_count = credential.sign_count;

        // Unique insert: a concurrent registration of the same id loses here.
        self.credentials
            .insert(credential)
            .await
            .map_err(CeremonyError::from_store)?;

        tracing::info!(
            credential_id = %base64_url_encode(summary.credential_id.as_slice()),
            algorithm = ?algorithm,
            aaguid = %hex::encode(attested.aaguid),
            sign_count,
            fmt = %attestation.fmt,
            "Credential registered"
        );
        Ok(summary)
    }

    /// Handle the new credential is stored under.
    ///
    /// Two first registrations for one username can begin before either
    /// completes, each with a fresh handle. The later one to complete adopts
    /// the handle already on record so a user never ends up with two. Two
    /// completions racing between this lookup and the insert can still split.
    async fn settle_user_handle(&self, username: &str, issued: Vec<u8>) -> Result<Vec<u8>> {
        let existing = self
            .credentials
            .find_by_username(username)
            .await
            .map_err(CeremonyError::from_store)?;
        match existing.into_iter().next() {
            Some(credential) if credential.user_handle != issued => {
                tracing::debug!("Adopting user handle already on record");
                Ok(credential.user_handle)
            }
            _ => Ok(issued),
        }
    }
}
