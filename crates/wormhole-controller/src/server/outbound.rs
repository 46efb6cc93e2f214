//! Outbound transport: the `/out` feedback endpoint
//!
//! Agents report command results here, correlated by command id only. The
//! endpoint always answers the literal bytes `ok`: late, duplicate, or
//! malformed feedback is logged (debug level) and discarded, never errored,
//! so an agent's retry loop terminates no matter what the controller knows
//! about the command.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use serde::Deserialize;

use wormhole_protocol::ResultCode;

use crate::events::ControllerEvent;
use crate::state::ControllerState;

const OK_BODY: &str = "ok";

#[derive(Debug, Deserialize)]
pub(super) struct FeedbackParams {
    cid: Option<String>,
    code: Option<String>,
}

/// `POST /out?cid=<command-id>&code=<success|error>` — command feedback.
///
/// The body is the raw result payload (GET carries none). The command is
/// removed from the in-flight table first, which is what makes a duplicate
/// POST for the same `cid` a no-op, and the response event fires at most
/// once per command id.
pub(super) async fn feedback(
    State(state): State<Arc<ControllerState>>,
    Query(params): Query<FeedbackParams>,
    body: Bytes,
) -> &'static str {
    let Some(cid) = params.cid.filter(|cid| !cid.is_empty()) else {
        tracing::debug!("feedback without cid ignored");
        return OK_BODY;
    };

    let Some(command) = state.coordinator.inflight.remove(&cid) else {
        tracing::debug!("feedback for unknown command {} ignored (late or duplicate)", cid);
        return OK_BODY;
    };

    let code = ResultCode::parse(params.code.as_deref());
    // An interrupted command keeps its state; the operator layer uses that
    // to drop the late response.
    let final_state = command.finish(code.into_state());
    tracing::debug!(
        "command {} finished as {} ({} byte body)",
        cid,
        final_state,
        body.len()
    );

    state
        .events
        .emit(ControllerEvent::CommandResponse { command, body })
        .await;

    OK_BODY
}
