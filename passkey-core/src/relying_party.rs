//! Relying Party configuration
//!
//! Holds the RP identity, the exact-match origin allow-list and the ceremony
//! policy (timeout, user verification).

use std::collections::BTreeSet;
use std::time::Duration;

use sha2::{Digest, Sha256};
use url::Url;

use crate::options::UserVerificationRequirement;

/// Default ceremony timeout (60 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid origin URL: {0}")]
    InvalidOrigin(String),
    #[error("Origin {origin} is not within RP id {rp_id}")]
    OriginOutsideRpId { origin: String, rp_id: String },
    #[error("At least one allowed origin is required")]
    NoOrigins,
    #[error("RP id must not be empty")]
    EmptyRpId,
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// WebAuthn Relying Party identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelyingParty {
    id: String,
    name: String,
    allowed_origins: BTreeSet<String>,
}

impl RelyingParty {
    /// Create a new Relying Party
    ///
    /// # Arguments
    ///
    /// * `rp_id` - Relying Party ID (the domain name)
    /// * `rp_name` - Human-readable name for the Relying Party
    /// * `allowed_origins` - Origins accepted in `clientDataJSON`, matched byte for byte
    ///
    /// Every origin must be a URL whose host equals `rp_id` or ends with `.<rp_id>`.
    pub fn new<I, S>(rp_id: &str, rp_name: &str, allowed_origins: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if rp_id.is_empty() {
            return Err(ConfigError::EmptyRpId);
        }

        let allowed_origins: BTreeSet<String> =
            allowed_origins.into_iter().map(Into::into).collect();
        if allowed_origins.is_empty() {
            return Err(ConfigError::NoOrigins);
        }

        for origin in &allowed_origins {
            let url = Url::parse(origin)
                .map_err(|e| ConfigError::InvalidOrigin(format!("{}: {}", origin, e)))?;
            // Browsers send the serialized origin: lowercase host, no path or trailing slash
            let serialized = url.origin().ascii_serialization();
            if serialized != *origin {
                return Err(ConfigError::InvalidOrigin(format!(
                    "{}: not a serialized origin (expected {})",
                    origin, serialized
                )));
            }
            let host = url
                .host_str()
                .ok_or_else(|| ConfigError::InvalidOrigin(format!("{}: missing host", origin)))?;
            if !is_registrable_suffix(host, rp_id) {
                return Err(ConfigError::OriginOutsideRpId {
                    origin: origin.clone(),
                    rp_id: rp_id.to_string(),
                });
            }
        }

        Ok(Self {
            id: rp_id.to_string(),
            name: rp_name.to_string(),
            allowed_origins,
        })
    }

    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `WEBAUTHN_RP_ID` - Relying Party ID (default: "localhost")
    /// - `WEBAUTHN_RP_NAME` - RP display name (default: "WebAuthn Demo")
    /// - `WEBAUTHN_RP_ORIGINS` - comma-separated origins
    ///   (default: "https://localhost,https://localhost:5000")
    pub fn from_env() -> Result<Self, ConfigError> {
        let rp_id = std::env::var("WEBAUTHN_RP_ID").unwrap_or_else(|_| "localhost".to_string());
        let rp_name =
            std::env::var("WEBAUTHN_RP_NAME").unwrap_or_else(|_| "WebAuthn Demo".to_string());
        let origins = std::env::var("WEBAUTHN_RP_ORIGINS")
            .unwrap_or_else(|_| "https://localhost,https://localhost:5000".to_string());

        let origins: Vec<String> = origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self::new(&rp_id, &rp_name, origins)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn allowed_origins(&self) -> impl Iterator<Item = &str> {
        self.allowed_origins.iter().map(String::as_str)
    }

    /// Exact, byte-for-byte origin check. No scheme/port normalization,
    /// no wildcards, no subdomain matching.
    pub fn verify_origin(&self, origin: &str) -> bool {
        self.allowed_origins.contains(origin)
    }

    /// SHA-256 of the RP id, as found at the start of authenticator data.
    pub fn rp_id_hash(&self) -> [u8; 32] {
        Sha256::digest(self.id.as_bytes()).into()
    }
}

fn is_registrable_suffix(host: &str, rp_id: &str) -> bool {
    host == rp_id
        || host
            .strip_suffix(rp_id)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Per-RP ceremony policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CeremonyPolicy {
    /// How long a begun ceremony stays valid
    pub timeout: Duration,
    /// User verification requested from the authenticator
    pub user_verification: UserVerificationRequirement,
}

impl Default for CeremonyPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            user_verification: UserVerificationRequirement::Preferred,
        }
    }
}

impl CeremonyPolicy {
    /// Load policy from environment variables
    ///
    /// - `WEBAUTHN_TIMEOUT_MS` (default: 60000)
    /// - `WEBAUTHN_USER_VERIFICATION` - `required`, `preferred` or `discouraged`
    ///   (default: `preferred`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut policy = Self::default();

        if let Ok(value) = std::env::var("WEBAUTHN_TIMEOUT_MS") {
            let ms: u64 = value.parse().map_err(|_| ConfigError::InvalidValue {
                name: "WEBAUTHN_TIMEOUT_MS",
                value: value.clone(),
            })?;
            policy.timeout = Duration::from_millis(ms);
        }

        if let Ok(value) = std::env::var("WEBAUTHN_USER_VERIFICATION") {
            policy.user_verification = match value.to_lowercase().as_str() {
                "required" => UserVerificationRequirement::Required,
                "preferred" => UserVerificationRequirement::Preferred,
                "discouraged" => UserVerificationRequirement::Discouraged,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "WEBAUTHN_USER_VERIFICATION",
                        value,
                    })
                }
            };
        }

        Ok(policy)
    }

    /// Whether the UV flag must be set on authenticator data
    pub fn requires_user_verification(&self) -> bool {
        self.user_verification == UserVerificationRequirement::Required
    }

    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn localhost_rp() -> RelyingParty {
        RelyingParty::new(
            "localhost",
            "WebAuthn Demo",
            ["https://localhost", "https://localhost:5000"],
        )
        .unwrap()
    }

    #[test]
    fn test_verify_origin_accepts_listed_origins() {
        let rp = localhost_rp();
        assert!(rp.verify_origin("https://localhost"));
        assert!(rp.verify_origin("https://localhost:5000"));
    }

    #[test]
    fn test_verify_origin_rejects_everything_else() {
        let rp = localhost_rp();
        for origin in [
            "http://localhost",
            "https://evil.com",
            "https://localhost:8080",
            "https://localhost/",
            "HTTPS://localhost",
            "https://sub.localhost",
            "not-a-url",
            "https:/localhost",
            "https://localhost/extra/path",
            "https://localhost?query=param",
            "https://localhost#fragment",
            "",
        ] {
            assert!(!rp.verify_origin(origin), "{origin} should be rejected");
        }
    }

    #[test]
    fn test_new_requires_origins() {
        let err = RelyingParty::new("localhost", "Test", Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, ConfigError::NoOrigins));
    }

    #[test]
    fn test_new_requires_rp_id_suffix() {
        let err = RelyingParty::new("localhost", "Test", ["https://127.0.0.1"]).unwrap_err();
        assert!(matches!(err, ConfigError::OriginOutsideRpId { .. }));

        let err = RelyingParty::new("example.com", "Test", ["https://badexample.com"]).unwrap_err();
        assert!(matches!(err, ConfigError::OriginOutsideRpId { .. }));

        let rp = RelyingParty::new(
            "example.com",
            "Test",
            ["https://example.com", "https://login.example.com:8443"],
        )
        .unwrap();
        assert_eq!(rp.allowed_origins().count(), 2);
    }

    #[test]
    fn test_new_rejects_unparseable_origin() {
        let err = RelyingParty::new("localhost", "Test", ["localhost"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOrigin(_)));
    }

    #[test]
    fn test_new_rejects_non_serialized_origin() {
        for origin in [
            "https://localhost/",
            "https://localhost/path",
            "https://LOCALHOST",
            "https://localhost:443",
        ] {
            let err = RelyingParty::new("localhost", "Test", [origin]).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidOrigin(_)),
                "{} should be rejected",
                origin
            );
        }
    }

    #[test]
    fn test_rp_id_hash() {
        let rp = localhost_rp();
        assert_eq!(
            hex::encode(rp.rp_id_hash()),
            "49960de5880e8c687434170f6476605b8fe4aeb9a28632c7995cf3ba831d9763"
        );
    }

    #[test]
    fn test_default_policy() {
        let policy = CeremonyPolicy::default();
        assert_eq!(policy.timeout_ms(), 60_000);
        assert!(!policy.requires_user_verification());
    }
}
