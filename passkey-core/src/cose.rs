//! COSE public keys and signature verification
//!
//! Supports the two algorithms offered in creation options:
//!
//! - ES256: ECDSA over P-256 with SHA-256 (DER-encoded signatures)
//! - RS256: RSASSA-PKCS1-v1_5 with SHA-256
//!
//! All functions are pure and safe to call from any number of ceremonies
//! concurrently.

use ciborium::value::{Integer, Value};
use p256::ecdsa::signature::Verifier;
use p256::{EncodedPoint, FieldBytes};
use rsa::{BigUint, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

// COSE key map labels (RFC 9052 / RFC 9053)
const LABEL_KTY: i64 = 1;
const LABEL_ALG: i64 = 3;
const LABEL_EC2_CRV: i64 = -1;
const LABEL_EC2_X: i64 = -2;
const LABEL_EC2_Y: i64 = -3;
const LABEL_RSA_N: i64 = -1;
const LABEL_RSA_E: i64 = -2;

const KTY_EC2: i64 = 2;
const KTY_RSA: i64 = 3;
const CRV_P256: i64 = 1;

/// COSE key errors
#[derive(Debug, thiserror::Error)]
pub enum CoseError {
    #[error("CBOR error: {0}")]
    Cbor(String),
    #[error("COSE key is not a map")]
    NotAMap,
    #[error("Missing or mistyped COSE key field {0}")]
    MissingField(i64),
    #[error("Unsupported COSE key type {0}")]
    UnsupportedKeyType(i128),
    #[error("Unsupported COSE algorithm {0}")]
    UnsupportedAlgorithm(i128),
    #[error("Unsupported EC2 curve {0}")]
    UnsupportedCurve(i128),
    #[error("Invalid public key: {0}")]
    InvalidKey(String),
}

/// Signature algorithm identifiers from the IANA COSE registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum CoseAlgorithm {
    /// ECDSA w/ SHA-256
    Es256,
    /// RSASSA-PKCS1-v1_5 w/ SHA-256
    Rs256,
}

impl CoseAlgorithm {
    pub const fn id(self) -> i64 {
        match self {
            Self::Es256 => -7,
            Self::Rs256 => -257,
        }
    }
}

impl From<CoseAlgorithm> for i64 {
    fn from(alg: CoseAlgorithm) -> Self {
        alg.id()
    }
}

impl TryFrom<i64> for CoseAlgorithm {
    type Error = CoseError;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        match id {
            -7 => Ok(Self::Es256),
            -257 => Ok(Self::Rs256),
            other => Err(CoseError::UnsupportedAlgorithm(other.into())),
        }
    }
}

/// A credential public key, tagged by algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoseKey {
    /// Uncompressed P-256 point
    Es256 { x: [u8; 32], y: [u8; 32] },
    /// RSA modulus and public exponent, big-endian
    Rs256 { n: Vec<u8>, e: Vec<u8> },
}

impl CoseKey {
    pub fn algorithm(&self) -> CoseAlgorithm {
        match self {
            Self::Es256 { .. } => CoseAlgorithm::Es256,
            Self::Rs256 { .. } => CoseAlgorithm::Rs256,
        }
    }

    /// Build a key from an already-decoded CBOR value.
    ///
    /// The key is validated: EC points must lie on P-256 and RSA components
    /// must form a usable public key.
    pub fn from_cbor_value(value: &Value) -> Result<Self, CoseError> {
        let map = value.as_map().ok_or(CoseError::NotAMap)?;

        let kty = int_field(map, LABEL_KTY)?;
        let alg = int_field(map, LABEL_ALG)?;

        let key = match (kty, alg) {
            (k, a) if k == i128::from(KTY_EC2) && a == i128::from(CoseAlgorithm::Es256.id()) => {
                let crv = int_field(map, LABEL_EC2_CRV)?;
                if crv != i128::from(CRV_P256) {
                    return Err(CoseError::UnsupportedCurve(crv));
                }
                Self::Es256 {
                    x: coordinate(map, LABEL_EC2_X)?,
                    y: coordinate(map, LABEL_EC2_Y)?,
                }
            }
            (k, a) if k == i128::from(KTY_RSA) && a == i128::from(CoseAlgorithm::Rs256.id()) => {
                Self::Rs256 {
                    n: bytes_field(map, LABEL_RSA_N)?.to_vec(),
                    e: bytes_field(map, LABEL_RSA_E)?.to_vec(),
                }
            }
            (k, _) if k != i128::from(KTY_EC2) && k != i128::from(KTY_RSA) => {
                return Err(CoseError::UnsupportedKeyType(k))
            }
            (_, a) => return Err(CoseError::UnsupportedAlgorithm(a)),
        };

        key.validate()?;
        Ok(key)
    }

    /// Canonical CBOR map for this key.
    pub fn to_cbor_value(&self) -> Value {
        let entry = |label: i64, value: Value| (Value::Integer(Integer::from(label)), value);
        let int = |v: i64| Value::Integer(Integer::from(v));

        match self {
            Self::Es256 { x, y } => Value::Map(vec![
                entry(LABEL_KTY, int(KTY_EC2)),
                entry(LABEL_ALG, int(CoseAlgorithm::Es256.id())),
                entry(LABEL_EC2_CRV, int(CRV_P256)),
                entry(LABEL_EC2_X, Value::Bytes(x.to_vec())),
                entry(LABEL_EC2_Y, Value::Bytes(y.to_vec())),
            ]),
            Self::Rs256 { n, e } => Value::Map(vec![
                entry(LABEL_KTY, int(KTY_RSA)),
                entry(LABEL_ALG, int(CoseAlgorithm::Rs256.id())),
                entry(LABEL_RSA_N, Value::Bytes(n.clone())),
                entry(LABEL_RSA_E, Value::Bytes(e.clone())),
            ]),
        }
    }

    fn validate(&self) -> Result<(), CoseError> {
        match self {
            Self::Es256 { x, y } => es256_verifying_key(x, y).map(|_| ()),
            Self::Rs256 { n, e } => rsa_public_key(n, e).map(|_| ()),
        }
    }
}

/// Decode a COSE_Key from its CBOR encoding.
pub fn deserialize_public_key(bytes: &[u8]) -> Result<CoseKey, CoseError> {
    let value: Value = ciborium::from_reader(bytes).map_err(|e| CoseError::Cbor(e.to_string()))?;
    CoseKey::from_cbor_value(&value)
}

/// Encode a COSE_Key to CBOR. Inverse of [`deserialize_public_key`].
pub fn serialize_public_key(key: &CoseKey) -> Result<Vec<u8>, CoseError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(&key.to_cbor_value(), &mut bytes)
        .map_err(|e| CoseError::Cbor(e.to_string()))?;
    Ok(bytes)
}

/// Verify `signature` over `message` with the algorithm implied by the key.
pub fn verify_signature(key: &CoseKey, message: &[u8], signature: &[u8]) -> bool {
    let result = match key {
        CoseKey::Es256 { x, y } => verify_es256(x, y, message, signature),
        CoseKey::Rs256 { n, e } => verify_rs256(n, e, message, signature),
    };

    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(algorithm = ?key.algorithm(), error = %e, "Signature rejected");
            false
        }
    }
}

fn verify_es256(
    x: &[u8; 32],
    y: &[u8; 32],
    message: &[u8],
    signature: &[u8],
) -> Result<(), CoseError> {
    let key = es256_verifying_key(x, y)?;
    let signature = p256::ecdsa::Signature::from_der(signature)
        .map_err(|e| CoseError::InvalidKey(format!("bad DER signature: {}", e)))?;
    key.verify(message, &signature)
        .map_err(|e| CoseError::InvalidKey(e.to_string()))
}

fn verify_rs256(n: &[u8], e: &[u8], message: &[u8], signature: &[u8]) -> Result<(), CoseError> {
    let key = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(rsa_public_key(n, e)?);
    let signature = rsa::pkcs1v15::Signature::try_from(signature)
        .map_err(|e| CoseError::InvalidKey(e.to_string()))?;
    key.verify(message, &signature)
        .map_err(|e| CoseError::InvalidKey(e.to_string()))
}

fn es256_verifying_key(x: &[u8; 32], y: &[u8; 32]) -> Result<p256::ecdsa::VerifyingKey, CoseError> {
    let point = EncodedPoint::from_affine_coordinates(
        FieldBytes::from_slice(x),
        FieldBytes::from_slice(y),
        false,
    );
    p256::ecdsa::VerifyingKey::from_encoded_point(&point)
        .map_err(|_| CoseError::InvalidKey("point is not on P-256".into()))
}

fn rsa_public_key(n: &[u8], e: &[u8]) -> Result<RsaPublicKey, CoseError> {
    RsaPublicKey::new(BigUint::from_bytes_be(n), BigUint::from_bytes_be(e))
        .map_err(|e| CoseError::InvalidKey(e.to_string()))
}

fn field(map: &[(Value, Value)], label: i64) -> Option<&Value> {
    map.iter()
        .find(|(k, _)| k.as_integer() == Some(Integer::from(label)))
        .map(|(_, v)| v)
}

fn int_field(map: &[(Value, Value)], label: i64) -> Result<i128, CoseError> {
    field(map, label)
        .and_then(Value::as_integer)
        .map(i128::from)
        .ok_or(CoseError::MissingField(label))
}

fn bytes_field(map: &[(Value, Value)], label: i64) -> Result<&[u8], CoseError> {
    field(map, label)
        .and_then(Value::as_bytes)
        .map(Vec::as_slice)
        .ok_or(CoseError::MissingField(label))
}

fn coordinate(map: &[(Value, Value)], label: i64) -> Result<[u8; 32], CoseError> {
    bytes_field(map, label)?
        .try_into()
        .map_err(|_| CoseError::InvalidKey(format!("coordinate {} must be 32 bytes", label)))
}
