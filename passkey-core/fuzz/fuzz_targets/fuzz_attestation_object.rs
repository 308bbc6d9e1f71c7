#![no_main]

//! Fuzz target for AttestationObject::from_bytes()
//!
//! Run with: cargo +nightly fuzz run fuzz_attestation_object

use libfuzzer_sys::fuzz_target;
use passkey_core::attestation::AttestationObject;

fuzz_target!(|data: &[u8]| {
    let _ = AttestationObject::from_bytes(data);
});
