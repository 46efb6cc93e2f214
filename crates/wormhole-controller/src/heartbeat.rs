//! Per-agent heartbeat supervisor
//!
//! Each connection gets its own supervisor task that sends a liveness ping
//! every interval with a bounded write deadline. A failed or overdue write
//! means the socket is dead: the supervisor runs the disconnect path and
//! exits. The supervisor is the authoritative disconnect detector; the
//! connection read loop is the secondary detector for clean shutdowns
//! initiated by the agent.

use std::sync::Arc;

use axum::extract::ws::Message;
use bytes::Bytes;
use tokio::time::MissedTickBehavior;

use crate::dispatch;
use crate::registry::AgentHandle;
use crate::state::ControllerState;

/// Spawn the heartbeat supervisor for one agent connection.
pub fn spawn_supervisor(
    state: Arc<ControllerState>,
    agent: Arc<AgentHandle>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(supervise(state, agent))
}

async fn supervise(state: Arc<ControllerState>, agent: Arc<AgentHandle>) {
    let mut ticker = tokio::time::interval(state.config.heartbeat_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; the first probe should not.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = agent.cancel.cancelled() => {
                tracing::debug!("heartbeat supervisor for {} stopping", agent.id);
                break;
            }
            _ = ticker.tick() => {
                let probe = agent.send(Message::Ping(Bytes::new()));
                match tokio::time::timeout(state.config.heartbeat_deadline, probe).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        tracing::warn!("heartbeat write to {} failed: {}", agent.id, err);
                        dispatch::disconnect_agent(&state, &agent).await;
                        break;
                    }
                    Err(_) => {
                        tracing::warn!(
                            "heartbeat to {} missed the {:?} deadline",
                            agent.id,
                            state.config.heartbeat_deadline
                        );
                        dispatch::disconnect_agent(&state, &agent).await;
                        break;
                    }
                }
            }
        }
    }
}
