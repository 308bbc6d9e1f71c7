//! Credential responses returned by `navigator.credentials`, in their
//! JSON-serialized form

use serde::{Deserialize, Serialize};

use crate::encoding::{base64_url_decode, Base64UrlBytes};
use crate::options::{public_key_type, PUBLIC_KEY_TYPE};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    /// Base64url credential id
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_id: Option<Base64UrlBytes>,
    #[serde(rename = "type", default = "public_key_type")]
    pub type_: String,
    pub response: AttestationResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Base64UrlBytes,
    pub attestation_object: Base64UrlBytes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    /// Base64url credential id
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_id: Option<Base64UrlBytes>,
    #[serde(rename = "type", default = "public_key_type")]
    pub type_: String,
    pub response: AssertionResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Base64UrlBytes,
    pub authenticator_data: Base64UrlBytes,
    pub signature: Base64UrlBytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<Base64UrlBytes>,
}

/// Credential id decoded from `id`. `None` when `id` is not base64url or
/// disagrees with `rawId`.
fn credential_id(raw_id: Option<&Base64UrlBytes>, id: &str) -> Option<Vec<u8>> {
    let decoded = base64_url_decode(id).ok()?;
    match raw_id {
        Some(raw) if raw.as_slice() != decoded.as_slice() => None,
        _ => Some(decoded),
    }
}

impl RegistrationResponse {
    pub fn credential_id(&self) -> Option<Vec<u8>> {
        credential_id(self.raw_id.as_ref(), &self.id)
    }

    pub fn is_public_key(&self) -> bool {
        self.type_ == PUBLIC_KEY_TYPE
    }
}

impl AuthenticationResponse {
    pub fn credential_id(&self) -> Option<Vec<u8>> {
        credential_id(self.raw_id.as_ref(), &self.id)
    }

    pub fn is_public_key(&self) -> bool {
        self.type_ == PUBLIC_KEY_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_browser_assertion_json() {
        let json = r#"{
            "id": "AQID",
            "rawId": "AQID",
            "type": "public-key",
            "response": {
                "clientDataJSON": "e30",
                "authenticatorData": "AAAA",
                "signature": "MEQ=",
                "userHandle": null
            },
            "clientExtensionResults": {}
        }"#;
        let response: AuthenticationResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.credential_id(), Some(vec![1, 2, 3]));
        assert!(response.is_public_key());
        assert_eq!(response.response.client_data_json.as_slice(), b"{}");
        assert!(response.response.user_handle.is_none());
    }

    #[test]
    fn test_id_used_when_raw_id_absent() {
        let json = r#"{
            "id": "BAUG",
            "response": {
                "clientDataJSON": "e30",
                "attestationObject": "oA"
            }
        }"#;
        let response: RegistrationResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.credential_id(), Some(vec![4, 5, 6]));
        assert_eq!(response.type_, "public-key");
        assert!(response.response.transports.is_empty());
    }

    #[test]
    fn test_undecodable_id() {
        let json = r#"{
            "id": "not base64!",
            "response": {
                "clientDataJSON": "e30",
                "authenticatorData": "AAAA",
                "signature": "AA"
            }
        }"#;
        let response: AuthenticationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.credential_id(), None);
    }

    #[test]
    fn test_raw_id_must_match_id() {
        let json = r#"{
            "id": "AAAA",
            "rawId": "AQID",
            "response": {
                "clientDataJSON": "e30",
                "attestationObject": "oA"
            }
        }"#;
        let response: RegistrationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.credential_id(), None);
    }

    #[test]
    fn test_undecodable_id_with_raw_id() {
        let json = r#"{
            "id": "not base64!",
            "rawId": "AQID",
            "response": {
                "clientDataJSON": "e30",
                "authenticatorData": "AAAA",
                "signature": "AA"
            }
        }"#;
        let response: AuthenticationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.credential_id(), None);
    }
}
