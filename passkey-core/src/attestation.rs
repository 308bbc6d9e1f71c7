//! Attestation object parsing
//!
//! The attestation statement is decoded but not verified: creation options
//! request conveyance `none`, so only the authenticator data is trusted for
//! its content (RP id hash, flags, counter, credential key) and never for
//! provenance.

use ciborium::value::Value;

use crate::authenticator_data::AuthenticatorData;
use crate::error::{CeremonyError, Result};

/// Decoded `attestationObject`
#[derive(Debug, Clone)]
pub struct AttestationObject {
    /// Statement format, e.g. `none` or `packed`
    pub fmt: String,
    pub auth_data: AuthenticatorData,
}

impl AttestationObject {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value: Value = ciborium::from_reader(bytes)
            .map_err(|e| CeremonyError::attestation(format!("invalid CBOR: {}", e)))?;
        let map = value
            .as_map()
            .ok_or_else(|| CeremonyError::attestation("attestation object is not a map"))?;

        let fmt = text_field(map, "fmt")
            .ok_or_else(|| CeremonyError::attestation("missing fmt"))?
            .to_string();

        if !field(map, "attStmt").is_some_and(Value::is_map) {
            return Err(CeremonyError::attestation("missing attStmt"));
        }

        let raw_auth_data = field(map, "authData")
            .and_then(Value::as_bytes)
            .ok_or_else(|| CeremonyError::attestation("missing authData"))?;

        let auth_data = AuthenticatorData::parse(raw_auth_data)
            .map_err(|e| CeremonyError::attestation(e.to_string()))?;

        if fmt != "none" {
            tracing::debug!(fmt = %fmt, "Attestation statement accepted without verification");
        }

        Ok(Self { fmt, auth_data })
    }
}

fn field<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| k.as_text() == Some(key))
        .map(|(_, v)| v)
}

fn text_field<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a str> {
    field(map, key).and_then(Value::as_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{attestation_object, SoftAuthenticator};

    #[test]
    fn test_parse_none_attestation() {
        let authenticator = SoftAuthenticator::es256();
        let auth_data = authenticator.registration_authenticator_data(&[0; 32], 0x01, 0);
        let bytes = attestation_object("none", auth_data);

        let parsed = AttestationObject::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.fmt, "none");
        let attested = parsed.auth_data.attested_credential.unwrap();
        assert_eq!(attested.credential_id, authenticator.credential_id());
    }

    #[test]
    fn test_other_formats_are_not_verified() {
        let authenticator = SoftAuthenticator::rs256();
        let auth_data = authenticator.registration_authenticator_data(&[0; 32], 0x01, 0);
        let bytes = attestation_object("packed", auth_data);

        let parsed = AttestationObject::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.fmt, "packed");
    }

    #[test]
    fn test_missing_auth_data() {
        let value = Value::Map(vec![
            (Value::Text("fmt".into()), Value::Text("none".into())),
            (Value::Text("attStmt".into()), Value::Map(vec![])),
        ]);
        let mut bytes = Vec::new();
        ciborium::into_writer(&value, &mut bytes).unwrap();

        let err = AttestationObject::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AttestationMalformed);
    }

    #[test]
    fn test_not_cbor() {
        let err = AttestationObject::from_bytes(b"\xff\xff").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AttestationMalformed);
    }
}
