//! Ceremony error kinds
//!
//! Every failure a ceremony can produce is a variant of [`CeremonyError`].
//! Nothing escapes the ceremony boundary as a panic or an untyped error.

use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum CeremonyError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Credential not found: {0}")]
    CredentialNotFound(String),

    #[error("Ceremony state missing, expired or already consumed")]
    StateExpired,

    #[error("Client data invalid: {0}")]
    ClientDataInvalid(String),

    #[error("Authenticator RP id hash does not match relying party {rp_id}")]
    RelyingPartyMismatch { rp_id: String },

    #[error("Attestation malformed: {0}")]
    AttestationMalformed(String),

    #[error("Assertion malformed: {0}")]
    AssertionMalformed(String),

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("User presence flag not set")]
    UserNotPresent,

    #[error("User verification required but not performed")]
    UserNotVerified,

    #[error("Possible cloned authenticator: received counter {received}, stored counter {stored}")]
    PossibleCloning { stored: u32, received: u32 },

    #[error("Credential already registered")]
    DuplicateCredential,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable, enumerable error kind surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    UnknownUser,
    CredentialNotFound,
    StateExpired,
    ClientDataInvalid,
    RelyingPartyMismatch,
    AttestationMalformed,
    AssertionMalformed,
    SignatureInvalid,
    UserNotPresent,
    UserNotVerified,
    PossibleCloning,
    DuplicateCredential,
    StorageError,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "validation_error",
            Self::UnknownUser => "unknown_user",
            Self::CredentialNotFound => "credential_not_found",
            Self::StateExpired => "state_expired",
            Self::ClientDataInvalid => "client_data_invalid",
            Self::RelyingPartyMismatch => "relying_party_mismatch",
            Self::AttestationMalformed => "attestation_malformed",
            Self::AssertionMalformed => "assertion_malformed",
            Self::SignatureInvalid => "signature_invalid",
            Self::UserNotPresent => "user_not_present",
            Self::UserNotVerified => "user_not_verified",
            Self::PossibleCloning => "possible_cloning",
            Self::DuplicateCredential => "duplicate_credential",
            Self::StorageError => "storage_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CeremonyError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn client_data(message: impl Into<String>) -> Self {
        Self::ClientDataInvalid(message.into())
    }

    pub fn attestation(message: impl Into<String>) -> Self {
        Self::AttestationMalformed(message.into())
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionMalformed(message.into())
    }

    /// Map a storage failure. Unique-constraint violations become
    /// [`CeremonyError::DuplicateCredential`].
    pub fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => Self::DuplicateCredential,
            other => Self::Storage(other),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::UnknownUser(_) => ErrorKind::UnknownUser,
            Self::CredentialNotFound(_) => ErrorKind::CredentialNotFound,
            Self::StateExpired => ErrorKind::StateExpired,
            Self::ClientDataInvalid(_) => ErrorKind::ClientDataInvalid,
            Self::RelyingPartyMismatch { .. } => ErrorKind::RelyingPartyMismatch,
            Self::AttestationMalformed(_) => ErrorKind::AttestationMalformed,
            Self::AssertionMalformed(_) => ErrorKind::AssertionMalformed,
            Self::SignatureInvalid => ErrorKind::SignatureInvalid,
            Self::UserNotPresent => ErrorKind::UserNotPresent,
            Self::UserNotVerified => ErrorKind::UserNotVerified,
            Self::PossibleCloning { .. } => ErrorKind::PossibleCloning,
            Self::DuplicateCredential => ErrorKind::DuplicateCredential,
            Self::Storage(_) => ErrorKind::StorageError,
            Self::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Generic message safe to return to the client.
    ///
    /// The detailed `Display` text may contain usernames, counters or parser
    /// internals and is meant for logs only.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::Validation(msg) if msg == NO_USERNAME => NO_USERNAME,
            Self::Validation(_) => "Invalid request",
            Self::UnknownUser(_) => "No credentials registered",
            Self::CredentialNotFound(_) => "Credential not found",
            Self::StateExpired => "Invalid or expired ceremony",
            Self::ClientDataInvalid(_) | Self::RelyingPartyMismatch { .. } => {
                "Client data verification failed"
            }
            Self::AttestationMalformed(_) => "Malformed attestation",
            Self::AssertionMalformed(_) => "Malformed assertion",
            Self::SignatureInvalid => "Signature verification failed",
            Self::UserNotPresent => "User presence required",
            Self::UserNotVerified => "User verification required",
            Self::PossibleCloning { .. } => "Authenticator counter check failed",
            Self::DuplicateCredential => "Credential already registered",
            Self::Storage(_) | Self::Internal(_) => "Internal error",
        }
    }
}

/// Message carried by the empty-username validation failure.
pub const NO_USERNAME: &str = "no username provided";

pub type Result<T> = std::result::Result<T, CeremonyError>;
