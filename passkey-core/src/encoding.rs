//! Base64url helpers for the WebAuthn JSON wire format.
//!
//! Browsers emit unpadded base64url, but some client libraries pad. Decoding
//! accepts both; encoding never pads.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Base64url encode bytes
pub fn base64_url_encode(bytes: &[u8]) -> String {
    URL_SAFE_LENIENT.encode(bytes)
}

/// Base64url decode a string, padded or not
pub fn base64_url_decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_LENIENT.decode(input)
}

/// Byte string carried as base64url in JSON.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Base64UrlBytes(pub Vec<u8>);

impl Base64UrlBytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Base64UrlBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Base64UrlBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Base64UrlBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Base64UrlBytes({})", base64_url_encode(&self.0))
    }
}

impl Serialize for Base64UrlBytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&base64_url_encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Base64UrlBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        base64_url_decode(&encoded)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_accepts_padding() {
        assert_eq!(base64_url_decode("YQ").unwrap(), b"a");
        assert_eq!(base64_url_decode("YQ==").unwrap(), b"a");
    }

    #[test]
    fn test_encode_is_unpadded_url_safe() {
        assert_eq!(base64_url_encode(&[0xfb, 0xff]), "-_8");
    }

    #[test]
    fn test_json_representation() {
        let bytes = Base64UrlBytes(vec![1, 2, 3]);
        let json = serde_json::to_string(&bytes).unwrap();
        assert_eq!(json, "\"AQID\"");

        let parsed: Base64UrlBytes = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, bytes);

        assert!(serde_json::from_str::<Base64UrlBytes>("\"not base64!\"").is_err());
    }
}
