//! Credential data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cose::{deserialize_public_key, serialize_public_key, CoseKey};
use crate::encoding::{base64_url_decode, base64_url_encode, Base64UrlBytes};
use crate::error::{CeremonyError, Result, NO_USERNAME};
use crate::options::{public_key_type, PUBLIC_KEY_TYPE};
use crate::store::StoreError;

/// Longest accepted username, in bytes
pub const MAX_USERNAME_LEN: usize = 256;

/// A registered public-key credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub credential_id: Vec<u8>,
    pub public_key: CoseKey,
    /// Last accepted signature counter
    pub sign_count: u32,
    pub owner_username: String,
    pub user_handle: Vec<u8>,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl Credential {
    pub fn credential_id_b64(&self) -> String {
        base64_url_encode(&self.credential_id)
    }

    /// Persisted form of this credential.
    pub fn to_record(&self) -> std::result::Result<CredentialRecord, StoreError> {
        let public_key = serialize_public_key(&self.public_key)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        Ok(CredentialRecord {
            id: self.credential_id_b64(),
            type_: public_key_type(),
            public_key: Base64UrlBytes(public_key),
            sign_count: self.sign_count,
            username: self.owner_username.clone(),
            user_id: Base64UrlBytes(self.user_handle.clone()),
            display_name: self.display_name.clone(),
            created_at: self.created_at,
        })
    }
}

/// Credential as written by storage backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Base64url credential id
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    /// CBOR-encoded COSE key
    pub public_key: Base64UrlBytes,
    pub sign_count: u32,
    pub username: String,
    #[serde(rename = "userId")]
    pub user_id: Base64UrlBytes,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CredentialRecord> for Credential {
    type Error = StoreError;

    fn try_from(record: CredentialRecord) -> std::result::Result<Self, Self::Error> {
        if record.type_ != PUBLIC_KEY_TYPE {
            return Err(StoreError::Serialization(format!(
                "unexpected credential type {}",
                record.type_
            )));
        }
        let credential_id = base64_url_decode(&record.id)
            .map_err(|e| StoreError::Serialization(format!("credential id: {}", e)))?;
        let public_key = deserialize_public_key(record.public_key.as_slice())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        Ok(Self {
            credential_id,
            public_key,
            sign_count: record.sign_count,
            owner_username: record.username,
            user_handle: record.user_id.into_inner(),
            display_name: record.display_name,
            created_at: record.created_at,
        })
    }
}

/// Returned by a successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialSummary {
    pub credential_id: Base64UrlBytes,
    pub username: String,
}

/// Returned by a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthResult {
    pub credential_id: Base64UrlBytes,
    pub username: String,
    pub sign_count: u32,
}

/// Trim and check a username supplied by the client.
pub fn validate_username(username: &str) -> Result<&str> {
    let username = username.trim();
    if username.is_empty() {
        return Err(CeremonyError::validation(NO_USERNAME));
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(CeremonyError::validation(format!(
            "username longer than {} bytes",
            MAX_USERNAME_LEN
        )));
    }
    Ok(username)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::SoftAuthenticator;

    fn credential() -> Credential {
        let authenticator = SoftAuthenticator::es256();
        Credential {
            credential_id: authenticator.credential_id().to_vec(),
            public_key: authenticator.cose_key(),
            sign_count: 7,
            owner_username: "bob".into(),
            user_handle: vec![3; 32],
            display_name: "Bob".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_fields() {
        let credential = credential();
        let record = credential.to_record().unwrap();
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], credential.credential_id_b64());
        assert_eq!(json["type"], "public-key");
        assert_eq!(json["sign_count"], 7);
        assert_eq!(json["username"], "bob");
        assert_eq!(json["displayName"], "Bob");
        assert!(json["userId"].is_string());
        assert!(json["public_key"].is_string());

        let restored = Credential::try_from(record).unwrap();
        assert_eq!(restored, credential);
    }

    #[test]
    fn test_record_with_bad_key_rejected() {
        let mut record = credential().to_record().unwrap();
        record.public_key = Base64UrlBytes(vec![0xa0]);
        assert!(matches!(
            Credential::try_from(record),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_validate_username() {
        assert_eq!(validate_username("  bob ").unwrap(), "bob");

        let err = validate_username("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(err.to_string(), "Validation error: no username provided");

        assert!(validate_username("   ").is_err());
        assert!(validate_username(&"a".repeat(257)).is_err());
        assert!(validate_username(&"a".repeat(256)).is_ok());
    }
}
