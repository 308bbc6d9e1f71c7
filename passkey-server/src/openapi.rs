//! OpenAPI documentation configuration
//!
//! Served as JSON at `GET /api-docs/openapi.json`.

use axum::Json;
use utoipa::OpenApi;

use crate::ceremony::{
    AuthenticationCompleteResponse, BeginAuthenticationRequest, BeginRegistrationRequest,
    RegistrationCompleteResponse,
};
use crate::error::ErrorBody;
use crate::handlers::{HealthResponse, ReadyResponse};

/// Passkey relying party API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Passkey Relying Party API",
        version = "0.1.0",
        description = r#"
## WebAuthn Passkey Registration and Authentication

Each ceremony is two calls:

1. `POST /register/begin` or `POST /authenticate/begin` returns a `state_token`
   and the `publicKey` options to pass to `navigator.credentials.create` / `get`
2. `POST /register/complete` or `POST /authenticate/complete` sends the
   `state_token` back with the JSON-serialized credential

A state token is single use: it is consumed by the first complete call,
successful or not, and expires after the ceremony timeout.

Supported algorithms: ES256 (P-256) and RS256. Attestation format `none` only.

Errors are returned as `{"status": "error", "message": "...", "kind": "..."}`.
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Registration", description = "Register a new passkey for a user"),
        (name = "Authentication", description = "Authenticate a user with a registered passkey"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::ceremony::handlers::begin_registration,
        crate::ceremony::handlers::complete_registration,
        crate::ceremony::handlers::begin_authentication,
        crate::ceremony::handlers::complete_authentication,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            ErrorBody,
            BeginRegistrationRequest,
            BeginAuthenticationRequest,
            RegistrationCompleteResponse,
            AuthenticationCompleteResponse,
        )
    )
)]
pub struct ApiDoc;

/// GET /api-docs/openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
