//! Controller transports
//!
//! Two endpoints on one listener: `GET /in` upgrades to the streaming
//! command socket an agent keeps open, `POST /out` (GET accepted too)
//! receives command feedback out-of-band.

mod inbound;
mod outbound;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::state::ControllerState;

/// Build the controller router.
///
/// Exposed separately from [`serve`] so tests can drive the exact routes
/// the binary serves.
pub fn router(state: Arc<ControllerState>) -> Router {
    Router::new()
        .route("/in", get(inbound::connect))
        .route("/out", post(outbound::feedback).get(outbound::feedback))
        .with_state(state)
}

/// Serve the controller endpoints until the listener fails.
pub async fn serve(listener: TcpListener, state: Arc<ControllerState>) -> std::io::Result<()> {
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
