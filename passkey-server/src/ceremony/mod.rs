//! Passkey registration and authentication endpoints

pub mod handlers;
pub mod types;

pub use handlers::{
    begin_authentication, begin_registration, complete_authentication, complete_registration,
};
pub use types::{
    AuthenticationCompleteResponse, BeginAuthenticationRequest, BeginRegistrationRequest,
    CompleteAuthenticationRequest, CompleteRegistrationRequest, RegistrationCompleteResponse,
};
