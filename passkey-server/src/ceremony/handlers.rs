//! Ceremony HTTP endpoint handlers
//!
//! Thin wrappers over [`passkey_core::PasskeyManager`]: each begin call
//! stores ceremony state and returns its token, each complete call consumes
//! the token whether or not verification succeeds.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use passkey_core::{BegunCeremony, CreationOptions, RequestOptions};

use super::types::{
    AuthenticationCompleteResponse, BeginAuthenticationRequest, BeginRegistrationRequest,
    CompleteAuthenticationRequest, CompleteRegistrationRequest, RegistrationCompleteResponse,
};
use crate::error::ApiError;
use crate::state::AppState;

/// Unwrap a JSON body, answering malformed ones with a structured error.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Rejected request body");
            Err(ApiError::bad_request("Invalid request body"))
        }
    }
}

/// POST /register/begin
///
/// Start registering a passkey for `username`. Credentials the user already
/// has are listed in `excludeCredentials`.
#[utoipa::path(
    post,
    path = "/register/begin",
    tag = "Registration",
    request_body = BeginRegistrationRequest,
    responses(
        (status = 200, description = "Creation options (JSON with state_token and publicKey)"),
        (status = 400, description = "Missing or invalid username", body = crate::error::ErrorBody)
    )
)]
pub async fn begin_registration(
    State(state): State<AppState>,
    body: Result<Json<BeginRegistrationRequest>, JsonRejection>,
) -> Result<Json<BegunCeremony<CreationOptions>>, ApiError> {
    let req = json_body(body)?;

    let begun = state
        .passkeys
        .register_begin(&req.username, req.display_name.as_deref())
        .await?;

    tracing::info!(username = %req.username.trim(), "Registration ceremony started");
    Ok(Json(begun))
}

/// POST /register/complete
///
/// Verify the authenticator's attestation and store the new credential.
#[utoipa::path(
    post,
    path = "/register/complete",
    tag = "Registration",
    request_body(content_type = "application/json", description = "state_token plus the JSON-serialized PublicKeyCredential from navigator.credentials.create"),
    responses(
        (status = 200, description = "Credential registered", body = RegistrationCompleteResponse),
        (status = 400, description = "Expired ceremony or invalid response", body = crate::error::ErrorBody),
        (status = 409, description = "Credential id already registered", body = crate::error::ErrorBody)
    )
)]
pub async fn complete_registration(
    State(state): State<AppState>,
    body: Result<Json<CompleteRegistrationRequest>, JsonRejection>,
) -> Result<Json<RegistrationCompleteResponse>, ApiError> {
    let req = json_body(body)?;

    let summary = state
        .passkeys
        .register_complete(&req.state_token, &req.response)
        .await?;

    Ok(Json(summary.into()))
}

/// POST /authenticate/begin
///
/// Start authenticating `username` against their registered credentials.
#[utoipa::path(
    post,
    path = "/authenticate/begin",
    tag = "Authentication",
    request_body = BeginAuthenticationRequest,
    responses(
        (status = 200, description = "Request options (JSON with state_token and publicKey)"),
        (status = 400, description = "Missing or invalid username", body = crate::error::ErrorBody),
        (status = 404, description = "User has no registered credentials", body = crate::error::ErrorBody)
    )
)]
pub async fn begin_authentication(
    State(state): State<AppState>,
    body: Result<Json<BeginAuthenticationRequest>, JsonRejection>,
) -> Result<Json<BegunCeremony<RequestOptions>>, ApiError> {
    let req = json_body(body)?;

    let begun = state.passkeys.authenticate_begin(&req.username).await?;

    tracing::info!(username = %req.username.trim(), "Authentication ceremony started");
    Ok(Json(begun))
}

/// POST /authenticate/complete
///
/// Verify the assertion signature and advance the credential's sign counter.
#[utoipa::path(
    post,
    path = "/authenticate/complete",
    tag = "Authentication",
    request_body(content_type = "application/json", description = "state_token plus the JSON-serialized PublicKeyCredential from navigator.credentials.get"),
    responses(
        (status = 200, description = "User authenticated", body = AuthenticationCompleteResponse),
        (status = 400, description = "Expired ceremony or invalid response", body = crate::error::ErrorBody),
        (status = 401, description = "Signature, presence or counter check failed", body = crate::error::ErrorBody),
        (status = 404, description = "Credential not found", body = crate::error::ErrorBody)
    )
)]
pub async fn complete_authentication(
    State(state): State<AppState>,
    body: Result<Json<CompleteAuthenticationRequest>, JsonRejection>,
) -> Result<Json<AuthenticationCompleteResponse>, ApiError> {
    let req = json_body(body)?;

    let result = state
        .passkeys
        .authenticate_complete(&req.state_token, &req.response)
        .await?;

    Ok(Json(result.into()))
}
