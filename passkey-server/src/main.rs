//! Passkey Server - WebAuthn relying party over HTTP
//!
//! Endpoints:
//! - POST /register/begin, /register/complete
//! - POST /authenticate/begin, /authenticate/complete
//! - GET /health, /ready, /api-docs/openapi.json

use std::{net::SocketAddr, sync::Arc, time::Duration};

use passkey_core::{CeremonyPolicy, MemoryCeremonyStateStore, PasskeyManager, RelyingParty};
use passkey_server::{
    create_router_with_config, open_credential_store, AppState, Config, StartupError,
};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("passkey_server=info,passkey_core=info,tower_http=info")
            }),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Server failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = Config::from_env();
    let rp = RelyingParty::from_env()?;
    let policy = CeremonyPolicy::from_env()?;

    tracing::info!(
        rp_id = %rp.id(),
        rp_name = %rp.name(),
        timeout_ms = policy.timeout_ms(),
        user_verification = ?policy.user_verification,
        "Relying party configured"
    );

    let credentials = open_credential_store(&config).await?;
    let passkeys = PasskeyManager::new(
        rp,
        policy,
        credentials,
        Arc::new(MemoryCeremonyStateStore::new()),
    );
    let state = AppState::new(passkeys, config.database_url.is_some());

    spawn_state_purge(state.clone(), Duration::from_secs(config.state_purge_interval_secs));

    let app = create_router_with_config(state, &config);
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Periodically drop ceremony states that were begun but never completed.
fn spawn_state_purge(state: AppState, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            if let Err(e) = state.passkeys.purge_expired_states().await {
                tracing::error!(error = %e, "Ceremony state purge failed");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
