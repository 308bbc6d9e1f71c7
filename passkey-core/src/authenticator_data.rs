//! Authenticator data parsing
//!
//! Layout (WebAuthn §6.1):
//!
//! ```text
//! rp_id_hash (32) | flags (1) | sign_count (4, big-endian)
//! [ aaguid (16) | cred_id_len (2) | cred_id | COSE public key ]   if AT
//! [ extensions (CBOR map) ]                                      if ED
//! ```

use ciborium::value::Value;

use crate::cose::{CoseError, CoseKey};

const RP_ID_HASH_LEN: usize = 32;
const FIXED_LEN: usize = RP_ID_HASH_LEN + 1 + 4;
const AAGUID_LEN: usize = 16;
/// Upper bound on credential id length (WebAuthn §5.8.3)
pub const MAX_CREDENTIAL_ID_LEN: usize = 1023;

#[derive(Debug, thiserror::Error)]
pub enum AuthenticatorDataError {
    #[error("Authenticator data too short: {0} bytes")]
    TooShort(usize),
    #[error("Attested credential data truncated")]
    Truncated,
    #[error("Credential id length {0} exceeds maximum")]
    CredentialIdTooLong(usize),
    #[error("Invalid CBOR: {0}")]
    Cbor(String),
    #[error("Invalid credential public key: {0}")]
    PublicKey(#[from] CoseError),
    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
}

/// Authenticator data flags byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatorFlags(u8);

impl AuthenticatorFlags {
    pub const USER_PRESENT: u8 = 0x01;
    pub const USER_VERIFIED: u8 = 0x04;
    pub const ATTESTED_CREDENTIAL_DATA: u8 = 0x40;
    pub const EXTENSION_DATA: u8 = 0x80;

    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn user_present(self) -> bool {
        self.0 & Self::USER_PRESENT != 0
    }

    pub fn user_verified(self) -> bool {
        self.0 & Self::USER_VERIFIED != 0
    }

    pub fn has_attested_credential_data(self) -> bool {
        self.0 & Self::ATTESTED_CREDENTIAL_DATA != 0
    }

    pub fn has_extension_data(self) -> bool {
        self.0 & Self::EXTENSION_DATA != 0
    }
}

/// Credential data attached during registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    pub aaguid: [u8; AAGUID_LEN],
    pub credential_id: Vec<u8>,
    pub public_key: CoseKey,
}

/// Parsed authenticator data
#[derive(Debug, Clone)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; RP_ID_HASH_LEN],
    pub flags: AuthenticatorFlags,
    /// Signature counter; 0 when the authenticator has no counter
    pub counter: u32,
    pub attested_credential: Option<AttestedCredentialData>,
    pub extensions: Option<Value>,
}

impl AuthenticatorData {
    pub fn parse(bytes: &[u8]) -> Result<Self, AuthenticatorDataError> {
        if bytes.len() < FIXED_LEN {
            return Err(AuthenticatorDataError::TooShort(bytes.len()));
        }

        let mut rp_id_hash = [0u8; RP_ID_HASH_LEN];
        rp_id_hash.copy_from_slice(&bytes[..RP_ID_HASH_LEN]);
        let flags = AuthenticatorFlags(bytes[RP_ID_HASH_LEN]);
        let counter = u32::from_be_bytes([bytes[33], bytes[34], bytes[35], bytes[36]]);

        let mut rest = &bytes[FIXED_LEN..];

        let attested_credential = if flags.has_attested_credential_data() {
            Some(parse_attested_credential(&mut rest)?)
        } else {
            None
        };

        let extensions = if flags.has_extension_data() {
            Some(read_cbor(&mut rest)?)
        } else {
            None
        };

        if !rest.is_empty() {
            return Err(AuthenticatorDataError::TrailingBytes(rest.len()));
        }

        Ok(Self {
            rp_id_hash,
            flags,
            counter,
            attested_credential,
            extensions,
        })
    }
}

fn parse_attested_credential(
    rest: &mut &[u8],
) -> Result<AttestedCredentialData, AuthenticatorDataError> {
    if rest.len() < AAGUID_LEN + 2 {
        return Err(AuthenticatorDataError::Truncated);
    }

    let mut aaguid = [0u8; AAGUID_LEN];
    aaguid.copy_from_slice(&rest[..AAGUID_LEN]);
    let id_len = usize::from(u16::from_be_bytes([rest[AAGUID_LEN], rest[AAGUID_LEN + 1]]));
    if id_len > MAX_CREDENTIAL_ID_LEN {
        return Err(AuthenticatorDataError::CredentialIdTooLong(id_len));
    }

    let id_start = AAGUID_LEN + 2;
    let id_end = id_start + id_len;
    if rest.len() < id_end {
        return Err(AuthenticatorDataError::Truncated);
    }
    let credential_id = rest[id_start..id_end].to_vec();
    *rest = &rest[id_end..];

    let key_value = read_cbor(rest)?;
    let public_key = CoseKey::from_cbor_value(&key_value)?;

    Ok(AttestedCredentialData {
        aaguid,
        credential_id,
        public_key,
    })
}

/// Read one CBOR item, advancing `rest` past it.
fn read_cbor(rest: &mut &[u8]) -> Result<Value, AuthenticatorDataError> {
    ciborium::from_reader(rest).map_err(|e| AuthenticatorDataError::Cbor(e.to_string()))
}
