//! `clientDataJSON` parsing and verification

use serde::Deserialize;

use crate::encoding::base64_url_decode;
use crate::error::{CeremonyError, Result};
use crate::relying_party::RelyingParty;

/// Expected `type` member of the collected client data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientDataType {
    Create,
    Get,
}

impl ClientDataType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "webauthn.create",
            Self::Get => "webauthn.get",
        }
    }
}

/// Client data collected by the browser and signed over by the authenticator
#[derive(Debug, Clone, Deserialize)]
pub struct CollectedClientData {
    #[serde(rename = "type")]
    pub type_: String,
    /// Base64url challenge echoed back by the client
    pub challenge: String,
    pub origin: String,
    #[serde(rename = "crossOrigin", default)]
    pub cross_origin: bool,
}

impl CollectedClientData {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| CeremonyError::client_data(format!("unparseable clientDataJSON: {}", e)))
    }

    /// Check type, challenge (byte-equal after decoding), origin and that the
    /// ceremony did not run in a cross-origin iframe.
    pub fn verify(
        &self,
        expected_type: ClientDataType,
        expected_challenge: &[u8],
        rp: &RelyingParty,
    ) -> Result<()> {
        if self.type_ != expected_type.as_str() {
            return Err(CeremonyError::client_data(format!(
                "expected type {}, got {}",
                expected_type.as_str(),
                self.type_
            )));
        }

        let challenge = base64_url_decode(&self.challenge)
            .map_err(|_| CeremonyError::client_data("challenge is not base64url"))?;
        if challenge != expected_challenge {
            return Err(CeremonyError::client_data("challenge mismatch"));
        }

        if !rp.verify_origin(&self.origin) {
            return Err(CeremonyError::client_data(format!(
                "origin {} not allowed",
                self.origin
            )));
        }

        if self.cross_origin {
            return Err(CeremonyError::client_data(format!(
                "cross-origin ceremony from {} not allowed",
                self.origin
            )));
        }

        Ok(())
    }
}
