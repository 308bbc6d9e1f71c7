#![no_main]

//! Fuzz target for AuthenticatorData::parse()
//!
//! Authenticator data arrives straight from the client, so the parser must
//! reject truncated lengths, oversized credential ids and bad CBOR without
//! panicking.
//!
//! Run with: cargo +nightly fuzz run fuzz_authenticator_data

use libfuzzer_sys::fuzz_target;
use passkey_core::authenticator_data::AuthenticatorData;

fuzz_target!(|data: &[u8]| {
    if let Ok(parsed) = AuthenticatorData::parse(data) {
        let _ = parsed.flags.user_present();
        if let Some(attested) = parsed.attested_credential {
            let _ = passkey_core::serialize_public_key(&attested.public_key);
        }
    }
});
