//! Operational HTTP handlers
//!
//! Ceremony endpoints live in [`crate::ceremony`].

pub mod health;

pub use health::{health, ready, HealthResponse, ReadyResponse};
