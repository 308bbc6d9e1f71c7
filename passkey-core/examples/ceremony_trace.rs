//! Example running a full register/authenticate round with tracing enabled.
//!
//! Run with: cargo run -p passkey-core --features test-util --example ceremony_trace

use passkey_core::testing::SoftAuthenticator;
use passkey_core::{CeremonyPolicy, PasskeyManager, RelyingParty};
use tracing_subscriber::{fmt, EnvFilter};

const ORIGIN: &str = "https://localhost";

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::new("passkey_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    println!("=== Passkey Ceremony Trace ===\n");

    let rp = match RelyingParty::new("localhost", "WebAuthn Demo", [ORIGIN]) {
        Ok(rp) => rp,
        Err(e) => {
            eprintln!("Invalid relying party: {}", e);
            return;
        }
    };
    let manager = PasskeyManager::in_memory(rp, CeremonyPolicy::default());
    let authenticator = SoftAuthenticator::es256();

    let begun = match manager.register_begin("bob", Some("Bob")).await {
        Ok(begun) => begun,
        Err(e) => {
            eprintln!("register_begin failed: {}", e);
            return;
        }
    };
    let response = authenticator.register(&begun.options.public_key, ORIGIN);
    match manager.register_complete(&begun.state_token, &response).await {
        Ok(summary) => println!("\nRegistered {:?} for {}\n", summary.credential_id, summary.username),
        Err(e) => {
            eprintln!("register_complete failed: {}", e);
            return;
        }
    }

    // Counter 1 succeeds, replaying counter 1 trips the clone check
    for counter in [1, 1] {
        let begun = match manager.authenticate_begin("bob").await {
            Ok(begun) => begun,
            Err(e) => {
                eprintln!("authenticate_begin failed: {}", e);
                return;
            }
        };
        let response = authenticator.authenticate(&begun.options.public_key, ORIGIN, counter);
        match manager
            .authenticate_complete(&begun.state_token, &response)
            .await
        {
            Ok(result) => println!("\n✅ Authenticated, sign_count = {}\n", result.sign_count),
            Err(e) => println!("\n❌ Rejected ({}): {}\n", e.kind(), e),
        }
    }
}
