//! # Mock portal backend
//!
//! In-memory stand-in for the portal API, used by the SDK integration
//! tests and for running the CLI locally.
//!
//! * [`router`] builds the Axum app over a [`MockState`].
//! * [`spawn`] serves it on an ephemeral loopback port.
//! * [`MockState`] exposes the hit log, token helpers and failure
//!   [`Knobs`] tests flip to provoke refresh rejection, legacy token
//!   fields or failing read-acknowledgements.
//!
//! ```rust,no_run
//! # async fn run() -> std::io::Result<()> {
//! let server = mock_portal::spawn(mock_portal::MockState::seeded()).await?;
//! println!("mock portal at {}", server.url());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handlers;
pub mod state;

use std::net::SocketAddr;

use axum::middleware::from_fn_with_state;
use axum::routing::{any, get, patch, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub use error::MockError;
pub use state::{notification, Account, Knobs, MockState};

/// Environment variable holding the listen port of the binary.
pub const PORT_ENV: &str = "MOCK_PORTAL_PORT";
/// Listen port when [`PORT_ENV`] is unset.
pub const DEFAULT_PORT: u16 = 4100;

/// The full API over `state`.
///
/// `/debug/echo` is open; `/api/echo` requires a bearer token.  Both
/// reflect the request's method, `Authorization`, `Content-Type` and
/// body.
pub fn router(state: MockState) -> Router {
    let protected = Router::new()
        .route("/api/notifications", get(handlers::notifications))
        .route("/api/notifications/read-all", patch(handlers::mark_all_read))
        .route("/api/notifications/{id}/read", patch(handlers::mark_read))
        .route("/api/requests/assigned", get(handlers::assigned_requests))
        .route("/api/requests/{id}", get(handlers::request_details))
        .route("/api/roles/{id}/summary", get(handlers::role_summary))
        .route("/api/options/{group}", get(handlers::reference_options))
        .route(
            "/api/admin/credentials",
            get(handlers::list_credentials).post(handlers::create_credential),
        )
        .route(
            "/api/admin/credentials/{id}",
            axum::routing::delete(handlers::delete_credential),
        )
        .route(
            "/api/employee/profile",
            get(handlers::profile).put(handlers::update_profile),
        )
        .route("/api/echo", any(handlers::echo))
        .route_layer(from_fn_with_state(state.clone(), handlers::require_bearer));

    Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh))
        .route("/debug/echo", any(handlers::echo))
        .merge(protected)
        .layer(from_fn_with_state(state.clone(), handlers::record_hit))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Serving
// ---------------------------------------------------------------------------

/// A running mock backend; dropping it shuts the server down.
pub struct MockServer {
    addr: SocketAddr,
    state: MockState,
    task: JoinHandle<()>,
}

impl MockServer {
    /// Base URL, e.g. `http://127.0.0.1:41234`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The state the server reads and writes.
    pub fn state(&self) -> &MockState {
        &self.state
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Serve `state` on an ephemeral loopback port.
pub async fn spawn(state: MockState) -> std::io::Result<MockServer> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = router(state.clone());

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "mock portal stopped");
        }
    });

    info!(%addr, "mock portal listening");
    Ok(MockServer { addr, state, task })
}
