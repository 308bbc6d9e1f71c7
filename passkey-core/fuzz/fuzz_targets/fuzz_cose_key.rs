#![no_main]

//! Fuzz target for COSE key decoding
//!
//! Any key that decodes must re-encode to a key that decodes to the same
//! value, and verification against it must not panic.
//!
//! Run with: cargo +nightly fuzz run fuzz_cose_key

use libfuzzer_sys::fuzz_target;
use passkey_core::{deserialize_public_key, serialize_public_key, verify_signature};

fuzz_target!(|data: &[u8]| {
    if let Ok(key) = deserialize_public_key(data) {
        let encoded = serialize_public_key(&key).expect("decoded key re-encodes");
        let decoded = deserialize_public_key(&encoded).expect("re-encoded key decodes");
        assert_eq!(decoded, key);

        let _ = verify_signature(&key, data, data);
    }
});
