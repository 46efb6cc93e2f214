//! Inbound transport: the `/in` upgrade endpoint
//!
//! An agent dials `GET /in?uuid=<agent-id>` and keeps the upgraded socket
//! open for the lifetime of the connection. The server pushes command
//! envelopes and liveness pings; frames from the agent are ignored (the
//! transport answers pings), so the read loop exists only to notice the
//! stream ending.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use wormhole_core::AgentId;
use wormhole_protocol::ProtocolError;

use crate::dispatch;
use crate::events::ControllerEvent;
use crate::heartbeat;
use crate::registry::{AgentHandle, OutboundFrame, FRAME_CHANNEL_CAPACITY};
use crate::state::ControllerState;

#[derive(Debug, Deserialize)]
pub(super) struct ConnectParams {
    uuid: Option<String>,
}

/// `GET /in?uuid=<agent-id>` — upgrade to the streaming command socket.
///
/// A missing or blank `uuid` is logged and rejected without an upgrade;
/// the agent retries with backoff.
pub(super) async fn connect(
    State(state): State<Arc<ControllerState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let uuid = params.uuid.unwrap_or_default();
    if uuid.trim().is_empty() {
        tracing::warn!("connect from {} rejected: {}", addr, ProtocolError::MissingAgentId);
        return StatusCode::BAD_REQUEST.into_response();
    }

    let id = AgentId::new(uuid);
    ws.on_upgrade(move |socket| register_agent(state, id, addr, socket))
        .into_response()
}

/// Wire a fresh connection into the engine: writer task, registry entry,
/// heartbeat supervisor, read loop, connect event.
async fn register_agent(
    state: Arc<ControllerState>,
    id: AgentId,
    addr: SocketAddr,
    socket: WebSocket,
) {
    let (sink, stream) = socket.split();
    let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();

    let agent = Arc::new(AgentHandle::new(id, addr.to_string(), frame_tx, cancel.clone()));
    tokio::spawn(writer_loop(sink, frame_rx, cancel));

    if let Some(replaced) = state.coordinator.atomic_register(Arc::clone(&agent)).await {
        // Same agent id on a new socket: the entry is swapped in place and
        // the predecessor's tasks are torn down without a disconnect event,
        // the agent never logically left.
        tracing::info!("agent {} reconnected, closing the previous socket", replaced.id);
        replaced.cancel.cancel();
    }

    tracing::info!("agent connected: {}", agent);
    heartbeat::spawn_supervisor(Arc::clone(&state), Arc::clone(&agent));
    tokio::spawn(read_loop(Arc::clone(&state), Arc::clone(&agent), stream));

    state
        .events
        .emit(ControllerEvent::AgentConnected(agent))
        .await;
}

/// Sole owner of the socket's write half. Frames arrive from dispatch and
/// the heartbeat supervisor; each is written and acked in order.
async fn writer_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut frames: mpsc::Receiver<OutboundFrame>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.close().await;
                break;
            }
            frame = frames.recv() => {
                let Some(OutboundFrame { message, ack }) = frame else {
                    break;
                };
                let result = sink.send(message).await.map_err(|err| err.to_string());
                let failed = result.is_err();
                let _ = ack.send(result);
                if failed {
                    // The socket is dead; the sender runs the disconnect
                    // path and this task has nothing left to write.
                    break;
                }
            }
        }
    }
}

/// Drain the socket's read half until the agent goes away.
///
/// This is the clean-shutdown detector: a close frame or stream end runs
/// the disconnect path. Cancellation means the connection was replaced or
/// already torn down elsewhere, so no disconnect is reported here.
async fn read_loop(
    state: Arc<ControllerState>,
    agent: Arc<AgentHandle>,
    mut stream: SplitStream<WebSocket>,
) {
    loop {
        tokio::select! {
            _ = agent.cancel.cancelled() => return,
            message = stream.next() => {
                match message {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Pong or stray agent data: ignored by contract.
                    }
                    Some(Err(err)) => {
                        tracing::debug!("read error from agent {}: {}", agent.id, err);
                        break;
                    }
                }
            }
        }
    }

    dispatch::disconnect_agent(&state, &agent).await;
}
