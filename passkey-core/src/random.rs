//! Challenge and user-handle generation from the OS CSPRNG

use crate::error::{CeremonyError, Result};

/// Challenge length in bytes
pub const CHALLENGE_LEN: usize = 32;
/// User handle length in bytes
pub const USER_HANDLE_LEN: usize = 32;

pub fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; len];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| CeremonyError::Internal(format!("random source failure: {}", e)))?;
    Ok(bytes)
}
