//! Mock portal backend binary.
//!
//! Serves the seeded in-memory API on `0.0.0.0:$MOCK_PORTAL_PORT`
//! (default 4100).  Sign in as `ana@example.com` / `secret`.

use mock_portal::{router, MockState, DEFAULT_PORT, PORT_ENV};
use tracing::{info, warn};

fn listen_port() -> u16 {
    match std::env::var(PORT_ENV) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(value = %raw, "invalid {PORT_ENV}, using {DEFAULT_PORT}");
            DEFAULT_PORT
        }),
        Err(_) => DEFAULT_PORT,
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let addr = format!("0.0.0.0:{}", listen_port());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(address = %addr, "mock portal listening");
    axum::serve(listener, router(MockState::seeded())).await
}
