//! Passkey Server Library - REST API for WebAuthn passkey ceremonies
//!
//! This library exposes the server components for use in integration tests.
//! The main binary uses these same components.

pub mod ceremony;
pub mod config;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod storage;

pub use config::Config;
pub use error::{ApiError, ErrorBody, StartupError};
pub use openapi::ApiDoc;
pub use routes::{create_router, create_router_with_config};
pub use state::AppState;
pub use storage::{open_credential_store, PostgresCredentialStore};
