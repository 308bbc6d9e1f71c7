//! Passkey Core - WebAuthn relying-party ceremony engine
//!
//! This crate implements the server half of WebAuthn registration and
//! authentication for a single relying party:
//!
//! - Challenge issuance with typed creation/request options
//! - `clientDataJSON` type, challenge and exact-match origin checks
//! - Attestation object and authenticator data parsing (attestation `none`)
//! - COSE key decoding and ES256 / RS256 signature verification
//! - Sign-counter clone detection with a compare-and-swap counter update
//!
//! Storage is reached only through the [`CredentialStore`] and
//! [`CeremonyStateStore`] traits; in-memory implementations are included.
//!
//! # Example
//!
//! ```no_run
//! use passkey_core::{CeremonyPolicy, PasskeyManager, RelyingParty};
//!
//! # async fn example() -> passkey_core::Result<()> {
//! let rp = RelyingParty::new("localhost", "WebAuthn Demo", ["https://localhost"])
//!     .expect("valid relying party");
//! let manager = PasskeyManager::in_memory(rp, CeremonyPolicy::default());
//!
//! // Send `begun` to the browser, keep nothing server-side but the store entry
//! let begun = manager.register_begin("bob", None).await?;
//! println!("{}", serde_json::to_string(&begun).unwrap());
//! # Ok(())
//! # }
//! ```

pub mod attestation;
pub mod authentication;
pub mod authenticator_data;
pub mod client_data;
pub mod cose;
pub mod credential;
pub mod encoding;
pub mod error;
pub mod manager;
pub mod options;
pub mod random;
pub mod registration;
pub mod relying_party;
pub mod response;
pub mod state;
pub mod store;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export main types for convenience
pub use authentication::AuthenticationCeremony;
pub use cose::{
    deserialize_public_key, serialize_public_key, verify_signature, CoseAlgorithm, CoseKey,
};
pub use credential::{AuthResult, Credential, CredentialRecord, CredentialSummary};
pub use encoding::Base64UrlBytes;
pub use error::{CeremonyError, ErrorKind, Result};
pub use manager::{BegunCeremony, PasskeyManager};
pub use options::{CreationOptions, PublicKeyOptions, RequestOptions, UserVerificationRequirement};
pub use registration::RegistrationCeremony;
pub use relying_party::{CeremonyPolicy, ConfigError, RelyingParty};
pub use response::{AuthenticationResponse, RegistrationResponse};
pub use state::{CeremonyKind, CeremonyState, CeremonySubject};
pub use store::{
    CeremonyStateStore, CredentialStore, MemoryCeremonyStateStore, MemoryCredentialStore,
    StoreError,
};
