//! Ceremony request/response types
//!
//! Begin responses are `passkey_core::BegunCeremony` as-is: the state token
//! next to the `publicKey` options for `navigator.credentials`.

use passkey_core::encoding::base64_url_encode;
use passkey_core::{AuthResult, AuthenticationResponse, CredentialSummary, RegistrationResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request to start registering a passkey
#[derive(Debug, Deserialize, ToSchema)]
pub struct BeginRegistrationRequest {
    #[serde(default)]
    #[schema(example = "bob")]
    pub username: String,
    /// Defaults to the username
    #[serde(default, alias = "displayName")]
    #[schema(example = "Bob")]
    pub display_name: Option<String>,
}

/// Request to complete registration
#[derive(Debug, Deserialize)]
pub struct CompleteRegistrationRequest {
    /// Token from the begin response
    pub state_token: String,
    /// Credential from navigator.credentials.create, JSON-serialized
    pub response: RegistrationResponse,
}

/// Request to start authenticating with a passkey
#[derive(Debug, Deserialize, ToSchema)]
pub struct BeginAuthenticationRequest {
    #[serde(default)]
    #[schema(example = "bob")]
    pub username: String,
}

/// Request to complete authentication
#[derive(Debug, Deserialize)]
pub struct CompleteAuthenticationRequest {
    /// Token from the begin response
    pub state_token: String,
    /// Assertion from navigator.credentials.get, JSON-serialized
    pub response: AuthenticationResponse,
}

/// Successful registration
#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationCompleteResponse {
    #[schema(example = "success")]
    pub status: &'static str,
    /// Base64url id of the new credential
    pub credential_id: String,
    pub username: String,
}

impl From<CredentialSummary> for RegistrationCompleteResponse {
    fn from(summary: CredentialSummary) -> Self {
        Self {
            status: "success",
            credential_id: base64_url_encode(summary.credential_id.as_slice()),
            username: summary.username,
        }
    }
}

/// Successful authentication
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthenticationCompleteResponse {
    #[schema(example = "success")]
    pub status: &'static str,
    /// Base64url id of the credential that signed
    pub credential_id: String,
    pub username: String,
    /// Counter value now stored for the credential
    pub sign_count: u32,
}

impl From<AuthResult> for AuthenticationCompleteResponse {
    fn from(result: AuthResult) -> Self {
        Self {
            status: "success",
            credential_id: base64_url_encode(result.credential_id.as_slice()),
            username: result.username,
            sign_count: result.sign_count,
        }
    }
}
