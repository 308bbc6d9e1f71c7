//! API error handling module
//!
//! Every failure leaves the server as `{"status": "error", "message", "kind"}`.
//! Ceremony failures carry their `passkey_core` kind; the detailed error
//! text is logged and never sent to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use passkey_core::{CeremonyError, ConfigError, ErrorKind, StoreError};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body could not be parsed
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Ceremony failure from the relying party engine
    #[error(transparent)]
    Ceremony(#[from] CeremonyError),
}

/// JSON body of every error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "error")]
    pub status: &'static str,
    #[schema(example = "Signature verification failed")]
    pub message: String,
    #[schema(example = "signature_invalid")]
    pub kind: &'static str,
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Ceremony(e) => match e.kind() {
                ErrorKind::ValidationError
                | ErrorKind::StateExpired
                | ErrorKind::ClientDataInvalid
                | ErrorKind::RelyingPartyMismatch
                | ErrorKind::AttestationMalformed
                | ErrorKind::AssertionMalformed => StatusCode::BAD_REQUEST,

                ErrorKind::SignatureInvalid
                | ErrorKind::UserNotPresent
                | ErrorKind::UserNotVerified
                | ErrorKind::PossibleCloning => StatusCode::UNAUTHORIZED,

                ErrorKind::UnknownUser | ErrorKind::CredentialNotFound => StatusCode::NOT_FOUND,
                ErrorKind::DuplicateCredential => StatusCode::CONFLICT,
                ErrorKind::StorageError => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Machine-readable kind, shared with `passkey_core::ErrorKind`
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => ErrorKind::ValidationError.as_str(),
            Self::Ceremony(e) => e.kind().as_str(),
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            Self::BadRequest(msg) => msg.clone(),
            Self::Ceremony(e) => e.client_message().to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.kind();
        let internal_message = self.to_string();

        // Log based on severity, always including internal details
        if status.is_server_error() {
            tracing::error!(
                status = %status,
                kind = kind,
                error = %internal_message,
                "Server error"
            );
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(
                status = %status,
                kind = kind,
                error = %internal_message,
                "Authentication rejected"
            );
        } else {
            tracing::warn!(
                status = %status,
                kind = kind,
                error = %internal_message,
                "Client error"
            );
        }

        let body = ErrorBody {
            status: "error",
            message: self.client_message(),
            kind,
        };

        (status, Json(body)).into_response()
    }
}

/// Failures while starting the server
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Relying party configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Credential storage: {0}")]
    Storage(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CeremonyError::validation("no username provided"), StatusCode::BAD_REQUEST),
            (CeremonyError::StateExpired, StatusCode::BAD_REQUEST),
            (CeremonyError::SignatureInvalid, StatusCode::UNAUTHORIZED),
            (
                CeremonyError::PossibleCloning {
                    stored: 5,
                    received: 5,
                },
                StatusCode::UNAUTHORIZED,
            ),
            (CeremonyError::DuplicateCredential, StatusCode::CONFLICT),
            (
                CeremonyError::Storage(StoreError::Connection("refused".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CeremonyError::Internal("rng failure".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[tokio::test]
    async fn test_error_body_hides_details() {
        let err = ApiError::from(CeremonyError::PossibleCloning {
            stored: 7,
            received: 3,
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["kind"], "possible_cloning");
        assert!(!json["message"].as_str().unwrap().contains('7'));
    }
}
