//! Authentication ceremony
//!
//! Verification order in `complete`:
//!
//! 1. ceremony state kind and expiry
//! 2. credential lookup and ownership
//! 3. `clientDataJSON` type, challenge and origin
//! 4. authenticator data and RP id hash
//! 5. signature over `authenticatorData || SHA-256(clientDataJSON)`
//! 6. user presence / verification flags
//! 7. sign counter, then a compare-and-swap of the stored counter
//!
//! The stored credential is only written in step 7.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::authenticator_data::AuthenticatorData;
use crate::client_data::{ClientDataType, CollectedClientData};
use crate::cose::verify_signature;
use crate::credential::{validate_username, AuthResult, Credential};
use crate::encoding::{base64_url_encode, Base64UrlBytes};
use crate::error::{CeremonyError, Result};
use crate::options::{CredentialDescriptor, RequestOptions};
use crate::random::{random_bytes, CHALLENGE_LEN};
use crate::relying_party::{CeremonyPolicy, RelyingParty};
use crate::response::AuthenticationResponse;
use crate::state::{CeremonyKind, CeremonyState, CeremonySubject};
use crate::store::CredentialStore;

pub struct AuthenticationCeremony {
    rp: Arc<RelyingParty>,
    policy: CeremonyPolicy,
    credentials: Arc<dyn CredentialStore>,
}

impl AuthenticationCeremony {
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

    /// Issue request options listing every credential `username` owns.
    #[tracing::instrument(skip_all, fields(username = %username))]
    pub async fn begin(&self, username: &str) -> Result<(RequestOptions, CeremonyState)> {
        let username = validate_username(username)?;

        let owned = self
            .credentials
            .find_by_username(username)
            .await
            .map_err(CeremonyError::from_store)?;
        if owned.is_empty() {
            tracing::info!("Authentication requested for user without credentials");
            return Err(CeremonyError::UnknownUser(username.to_string()));
        }

        let challenge = random_bytes(CHALLENGE_LEN)?;
        let allow_credentials = owned
            .iter()
            .map(|credential| CredentialDescriptor::new(credential.credential_id.clone()))
            .collect();

        let options = RequestOptions::new(
            self.rp.id(),
            challenge.clone(),
            self.policy.timeout_ms(),
            self.policy.user_verification,
            allow_credentials,
        )?;

        let state = CeremonyState::new(
            challenge,
            self.rp.id(),
            self.policy.timeout,
            CeremonySubject::Authentication {
                username: username.to_string(),
                allowed_credential_ids: owned
                    .into_iter()
                    .map(|credential| Base64UrlBytes(credential.credential_id))
                    .collect(),
            },
        )?;

        tracing::debug!(
            allowed_credentials = options.allow_credentials.len(),
            "Authentication ceremony started"
        );
        Ok((options, state))
    }

    /// Verify an assertion and advance the stored sign counter.
    ///
    /// `state` is consumed whatever the outcome. Failures leave the stored
    /// credential untouched.
    #[tracing::instrument(skip_all, fields(username = %state.username()))]
    pub async fn complete(
        &self,
        state: CeremonyState,
        response: &AuthenticationResponse,
    ) -> Result<AuthResult> {
        let result = self.verify(state, response).await;
        if let Err(e) = &result {
            tracing::warn!(kind = %e.kind(), error = %e, "Authentication rejected");
        }
        result
    }

    async fn verify(
        &self,
        state: CeremonyState,
        response: &AuthenticationResponse,
    ) -> Result<AuthResult> {
        if state.kind() != CeremonyKind::Authentication
            || state.is_expired()
            || state.rp_id != self.rp.id()
        {
            return Err(CeremonyError::StateExpired);
        }
        let CeremonySubject::Authentication {
            username,
            allowed_credential_ids,
        } = state.subject
        else {
            return Err(CeremonyError::StateExpired);
        };

        if !response.is_public_key() {
            return Err(CeremonyError::assertion(format!(
                "unexpected credential type {}",
                response.type_
            )));
        }

        let credential = self
            .lookup_credential(response, &username, &allowed_credential_ids)
            .await?;

        let assertion = &response.response;
        let client_data = CollectedClientData::from_bytes(assertion.client_data_json.as_slice())?;
        client_data.verify(ClientDataType::Get, state.challenge.as_slice(), &self.rp)?;

        let raw_auth_data = assertion.authenticator_data.as_slice();
        let auth_data = AuthenticatorData::parse(raw_auth_data)
            .map_err(|e| CeremonyError::assertion(e.to_string()))?;
        if auth_data.rp_id_hash != self.rp.rp_id_hash() {
            return Err(CeremonyError::RelyingPartyMismatch {
                rp_id: self.rp.id().to_string(),
            });
        }

        let mut signed = Vec::with_capacity(raw_auth_data.len() + 32);
        signed.extend_from_slice(raw_auth_data);
        signed.extend_from_slice(&Sha256::digest(assertion.client_data_json.as_slice()));
        if !verify_signature(&credential.public_key, &signed, assertion.signature.as_slice()) {
            return Err(CeremonyError::SignatureInvalid);
        }

        if !auth_data.flags.user_present() {
            return Err(CeremonyError::UserNotPresent);
        }
        if self.policy.requires_user_verification() && !auth_data.flags.user_verified() {
            return Err(CeremonyError::UserNotVerified);
        }

        let stored = credential.sign_count;
        let received = auth_data.counter;
        check_sign_count(stored, received)?;

        let swapped = self
            .credentials
            .update_sign_count(&credential.credential_id, stored, received)
            .await
            .map_err(CeremonyError::from_store)?;
        if !swapped {
            // Another assertion for this credential committed first.
            tracing::warn!(stored, received, "Sign count changed during verification");
            return Err(CeremonyError::PossibleCloning { stored, received });
        }

        tracing::info!(
            credential_id = %credential.credential_id_b64(),
            sign_count = received,
            "Authentication succeeded"
        );
        Ok(AuthResult {
            credential_id: Base64UrlBytes(credential.credential_id),
            username: credential.owner_username,
            sign_count: received,
        })
    }

    async fn lookup_credential(
        &self,
        response: &AuthenticationResponse,
        username: &str,
        allowed: &[Base64UrlBytes],
    ) -> Result<Credential> {
        let credential_id = response.credential_id().ok_or_else(|| {
            CeremonyError::assertion("credential id is not base64url or disagrees with rawId")
        })?;
        let not_found = || CeremonyError::CredentialNotFound(base64_url_encode(&credential_id));

        if !allowed.is_empty() && !allowed.iter().any(|id| id.as_slice() == credential_id) {
            return Err(not_found());
        }

        let credential = self
            .credentials
            .find_by_credential_id(&credential_id)
            .await
            .map_err(CeremonyError::from_store)?
            .ok_or_else(not_found)?;

        if credential.owner_username != username {
            return Err(not_found());
        }
        Ok(credential)
    }
}

/// Reject a counter that did not advance.
///
/// Authenticators without a counter always report 0; when both values are 0
/// there is nothing to compare. Any other non-increasing pair means two
/// copies of the key exist.
pub fn check_sign_count(stored: u32, received: u32) -> Result<()> {
    if (stored != 0 || received != 0) && received <= stored {
        tracing::warn!(stored, received, "Sign count did not increase");
        return Err(CeremonyError::PossibleCloning { stored, received });
    }
    Ok(())
}
