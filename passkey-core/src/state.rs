//! Short-lived ceremony state carried between `begin` and `complete`

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::encoding::Base64UrlBytes;
use crate::error::{CeremonyError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CeremonyKind {
    Registration,
    Authentication,
}

impl CeremonyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Authentication => "authentication",
        }
    }
}

/// Per-kind ceremony data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CeremonySubject {
    Registration {
        username: String,
        user_handle: Base64UrlBytes,
        display_name: String,
    },
    Authentication {
        username: String,
        /// Empty means any credential owned by `username`
        allowed_credential_ids: Vec<Base64UrlBytes>,
    },
}

/// State issued by `begin` and consumed by exactly one `complete`.
///
/// `complete` takes the state by value, so a given instance cannot be
/// presented twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CeremonyState {
    pub challenge: Base64UrlBytes,
    pub rp_id: String,
    pub expires_at: DateTime<Utc>,
    pub subject: CeremonySubject,
}

impl CeremonyState {
    pub fn new(
        challenge: Vec<u8>,
        rp_id: &str,
        ttl: Duration,
        subject: CeremonySubject,
    ) -> Result<Self> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| CeremonyError::Internal(format!("invalid ceremony timeout: {}", e)))?;

        Ok(Self {
            challenge: Base64UrlBytes(challenge),
            rp_id: rp_id.to_string(),
            expires_at: Utc::now() + ttl,
            subject,
        })
    }

    pub fn kind(&self) -> CeremonyKind {
        match self.subject {
            CeremonySubject::Registration { .. } => CeremonyKind::Registration,
            CeremonySubject::Authentication { .. } => CeremonyKind::Authentication,
        }
    }

    pub fn username(&self) -> &str {
        match &self.subject {
            CeremonySubject::Registration { username, .. }
            | CeremonySubject::Authentication { username, .. } => username,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration_state(ttl: Duration) -> CeremonyState {
        CeremonyState::new(
            vec![1; 32],
            "localhost",
            ttl,
            CeremonySubject::Registration {
                username: "bob".into(),
                user_handle: Base64UrlBytes(vec![2; 32]),
                display_name: "bob".into(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_expiry() {
        let state = registration_state(Duration::from_secs(60));
        assert!(!state.is_expired());
        assert!(state.is_expired_at(state.expires_at));
        assert!(state.is_expired_at(Utc::now() + chrono::Duration::seconds(61)));
    }

    #[test]
    fn test_kind_and_username() {
        let state = registration_state(Duration::from_secs(60));
        assert_eq!(state.kind(), CeremonyKind::Registration);
        assert_eq!(state.username(), "bob");
        assert_eq!(state.kind().as_str(), "registration");
    }

    #[test]
    fn test_serde_tags_subject() {
        let state = registration_state(Duration::from_secs(60));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["subject"]["kind"], "registration");
        assert_eq!(json["rp_id"], "localhost");

        let back: CeremonyState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
