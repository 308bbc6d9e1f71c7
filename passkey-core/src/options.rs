//! Typed creation/request options handed to `navigator.credentials`
//!
//! Field names follow the WebAuthn JSON serialization (camelCase, binary
//! members as base64url strings).

use serde::{Deserialize, Serialize};

use crate::cose::CoseAlgorithm;
use crate::encoding::Base64UrlBytes;
use crate::error::{CeremonyError, Result};

/// Minimum challenge length in bytes
pub const MIN_CHALLENGE_LEN: usize = 16;
/// WebAuthn caps user handles at 64 bytes
pub const MAX_USER_HANDLE_LEN: usize = 64;

pub const PUBLIC_KEY_TYPE: &str = "public-key";

pub(crate) fn public_key_type() -> String {
    PUBLIC_KEY_TYPE.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserVerificationRequirement {
    Required,
    Preferred,
    Discouraged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttestationConveyancePreference {
    None,
    Indirect,
    Direct,
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorAttachment {
    Platform,
    CrossPlatform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidentKeyRequirement {
    Discouraged,
    Preferred,
    Required,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingPartyEntity {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    /// Opaque user handle
    pub id: Base64UrlBytes,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKeyCredParam {
    #[serde(rename = "type", default = "public_key_type")]
    pub type_: String,
    pub alg: CoseAlgorithm,
}

impl PubKeyCredParam {
    pub fn public_key(alg: CoseAlgorithm) -> Self {
        Self {
            type_: public_key_type(),
            alg,
        }
    }
}

/// Credential reference used in `allowCredentials` / `excludeCredentials`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    #[serde(rename = "type", default = "public_key_type")]
    pub type_: String,
    pub id: Base64UrlBytes,
}

impl CredentialDescriptor {
    pub fn new(credential_id: Vec<u8>) -> Self {
        Self {
            type_: public_key_type(),
            id: Base64UrlBytes(credential_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    pub resident_key: ResidentKeyRequirement,
    pub require_resident_key: bool,
    pub user_verification: UserVerificationRequirement,
}

/// `PublicKeyCredentialCreationOptions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationOptions {
    pub rp: RelyingPartyEntity,
    pub user: UserEntity,
    pub challenge: Base64UrlBytes,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    /// Milliseconds
    pub timeout: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_credentials: Vec<CredentialDescriptor>,
    pub authenticator_selection: AuthenticatorSelection,
    pub attestation: AttestationConveyancePreference,
}

impl CreationOptions {
    /// Build creation options offering ES256 then RS256, attestation `none`
    /// and no resident key.
    pub fn new(
        rp: RelyingPartyEntity,
        user: UserEntity,
        challenge: Vec<u8>,
        timeout_ms: u64,
        user_verification: UserVerificationRequirement,
        exclude_credentials: Vec<CredentialDescriptor>,
    ) -> Result<Self> {
        if challenge.len() < MIN_CHALLENGE_LEN {
            return Err(CeremonyError::Internal(format!(
                "challenge must be at least {} bytes",
                MIN_CHALLENGE_LEN
            )));
        }
        let handle_len = user.id.as_slice().len();
        if handle_len == 0 || handle_len > MAX_USER_HANDLE_LEN {
            return Err(CeremonyError::Internal(format!(
                "user handle must be 1..={} bytes, got {}",
                MAX_USER_HANDLE_LEN, handle_len
            )));
        }

        Ok(Self {
            rp,
            user,
            challenge: Base64UrlBytes(challenge),
            pub_key_cred_params: vec![
                PubKeyCredParam::public_key(CoseAlgorithm::Es256),
                PubKeyCredParam::public_key(CoseAlgorithm::Rs256),
            ],
            timeout: timeout_ms,
            exclude_credentials,
            authenticator_selection: AuthenticatorSelection {
                authenticator_attachment: None,
                resident_key: ResidentKeyRequirement::Discouraged,
                require_resident_key: false,
                user_verification,
            },
            attestation: AttestationConveyancePreference::None,
        })
    }
}

/// `PublicKeyCredentialRequestOptions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    pub challenge: Base64UrlBytes,
    /// Milliseconds
    pub timeout: u64,
    pub rp_id: String,
    pub allow_credentials: Vec<CredentialDescriptor>,
    pub user_verification: UserVerificationRequirement,
}

impl RequestOptions {
    pub fn new(
        rp_id: &str,
        challenge: Vec<u8>,
        timeout_ms: u64,
        user_verification: UserVerificationRequirement,
        allow_credentials: Vec<CredentialDescriptor>,
    ) -> Result<Self> {
        if challenge.len() < MIN_CHALLENGE_LEN {
            return Err(CeremonyError::Internal(format!(
                "challenge must be at least {} bytes",
                MIN_CHALLENGE_LEN
            )));
        }

        Ok(Self {
            challenge: Base64UrlBytes(challenge),
            timeout: timeout_ms,
            rp_id: rp_id.to_string(),
            allow_credentials,
            user_verification,
        })
    }
}

/// `{"publicKey": ...}` envelope expected by browser helpers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyOptions<T> {
    #[serde(rename = "publicKey")]
    pub public_key: T,
}

impl<T> From<T> for PublicKeyOptions<T> {
    fn from(public_key: T) -> Self {
        Self { public_key }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserEntity {
        UserEntity {
            id: Base64UrlBytes(vec![9; 32]),
            name: "bob".into(),
            display_name: "bob".into(),
        }
    }

    fn rp() -> RelyingPartyEntity {
        RelyingPartyEntity {
            id: "localhost".into(),
            name: "WebAuthn Demo".into(),
        }
    }

    #[test]
    fn test_creation_options_json_shape() {
        let options = CreationOptions::new(
            rp(),
            user(),
            vec![1; 32],
            60_000,
            UserVerificationRequirement::Preferred,
            Vec::new(),
        )
        .unwrap();
        let json = serde_json::to_value(PublicKeyOptions::from(options)).unwrap();
        let pk = &json["publicKey"];

        assert_eq!(pk["rp"]["id"], "localhost");
        assert_eq!(pk["user"]["displayName"], "bob");
        assert_eq!(pk["pubKeyCredParams"][0]["alg"], -7);
        assert_eq!(pk["pubKeyCredParams"][1]["alg"], -257);
        assert_eq!(pk["pubKeyCredParams"][0]["type"], "public-key");
        assert_eq!(pk["authenticatorSelection"]["userVerification"], "preferred");
        assert_eq!(pk["authenticatorSelection"]["requireResidentKey"], false);
        assert_eq!(pk["attestation"], "none");
        assert_eq!(pk["timeout"], 60_000);
        assert!(pk.get("excludeCredentials").is_none());
        assert!(pk["challenge"].is_string());
    }

    #[test]
    fn test_short_challenge_rejected() {
        let result = CreationOptions::new(
            rp(),
            user(),
            vec![1; 8],
            60_000,
            UserVerificationRequirement::Preferred,
            Vec::new(),
        );
        assert!(result.is_err());

        let result = RequestOptions::new(
            "localhost",
            vec![1; 15],
            60_000,
            UserVerificationRequirement::Preferred,
            Vec::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_oversized_user_handle_rejected() {
        let mut user = user();
        user.id = Base64UrlBytes(vec![0; 65]);
        let result = CreationOptions::new(
            rp(),
            user,
            vec![1; 32],
            60_000,
            UserVerificationRequirement::Preferred,
            Vec::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_request_options_json_shape() {
        let options = RequestOptions::new(
            "localhost",
            vec![2; 32],
            60_000,
            UserVerificationRequirement::Preferred,
            vec![CredentialDescriptor::new(vec![0xfb, 0xff])],
        )
        .unwrap();
        let json = serde_json::to_value(&options).unwrap();

        assert_eq!(json["rpId"], "localhost");
        assert_eq!(json["allowCredentials"][0]["id"], "-_8");
        assert_eq!(json["allowCredentials"][0]["type"], "public-key");
        assert_eq!(json["userVerification"], "preferred");
    }
}
