//! Command dispatch and the disconnect path
//!
//! Dispatch pushes a command to one agent: verify the agent is registered,
//! transition the command to `Executing`, track it in the in-flight table,
//! then write the JSON envelope to the agent's socket. The insert happens
//! before the write completes, so feedback racing the dispatch always finds
//! its entry.

use std::sync::Arc;

use axum::extract::ws::Message;

use wormhole_core::{AgentId, Command, DispatchError};

use crate::events::ControllerEvent;
use crate::registry::AgentHandle;
use crate::state::ControllerState;

/// Dispatch `command` to the agent registered under `agent_id`.
///
/// On success the command is `Executing` and tracked in the in-flight
/// table. A socket write failure runs the disconnect path for the agent
/// (which also purges the just-inserted command) and returns the error.
pub async fn send_command(
    state: &Arc<ControllerState>,
    command: Command,
    agent_id: &AgentId,
) -> Result<Arc<Command>, DispatchError> {
    let (agent, command) = {
        let _guard = state.coordinator.read().await;
        let agent = state
            .coordinator
            .agents
            .get(agent_id)
            .ok_or_else(|| DispatchError::UnknownAgent(agent_id.clone()))?;

        command.mark_executing(agent_id);
        let command = Arc::new(command);
        state.coordinator.inflight.insert(Arc::clone(&command));
        (agent, command)
    };

    let payload = serde_json::to_string(&command.envelope())?;
    tracing::debug!("dispatching {} to agent {}", command, agent.id);

    if let Err(err) = agent.send(Message::Text(payload.into())).await {
        tracing::warn!("write to agent {} failed: {}", agent.id, err);
        if err.is_connection_failure() {
            disconnect_agent(state, &agent).await;
        }
        return Err(err);
    }

    Ok(command)
}

/// The single disconnect path, shared by dispatch write failures, the
/// heartbeat supervisor, and the connection read loop.
///
/// Removes the agent (keyed on its connection sequence, so only the first
/// detector of a given dead connection acts), purges its in-flight
/// commands, cancels the connection tasks, and emits `AgentDisconnected`
/// exactly once.
pub async fn disconnect_agent(state: &Arc<ControllerState>, agent: &Arc<AgentHandle>) {
    let (removed, purged) = state
        .coordinator
        .atomic_disconnect(&agent.id, agent.conn_seq())
        .await;

    let Some(removed) = removed else {
        // Another detector won, or the agent already reconnected.
        return;
    };

    removed.cancel.cancel();
    if !purged.is_empty() {
        tracing::debug!(
            "purged {} in-flight command(s) for disconnected agent {}",
            purged.len(),
            removed.id
        );
    }
    tracing::info!("agent disconnected: {}", removed);

    state
        .events
        .emit(ControllerEvent::AgentDisconnected(removed))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use wormhole_protocol::{CommandEnvelope, CommandName, CommandState};

    use crate::config::ControllerConfig;
    use crate::registry::{OutboundFrame, FRAME_CHANNEL_CAPACITY};

    /// Register a fake agent whose writer task acks every frame with `ack`.
    async fn register_fake_agent(
        state: &Arc<ControllerState>,
        id: &str,
        ack: Result<(), String>,
    ) -> (Arc<AgentHandle>, mpsc::Receiver<String>)
    {
        let (frame_tx, mut frame_rx) = mpsc::channel::<OutboundFrame>(FRAME_CHANNEL_CAPACITY);
        let (seen_tx, seen_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                if let Message::Text(text) = &frame.message {
                    let _ = seen_tx.send(text.to_string()).await;
                }
                let _ = frame.ack.send(ack.clone());
            }
        });

        let agent = Arc::new(AgentHandle::new(
            AgentId::new(id),
            "192.0.2.1:40000",
            frame_tx,
            CancellationToken::new(),
        ));
        state.coordinator.atomic_register(Arc::clone(&agent)).await;
        (agent, seen_rx)
    }

    #[tokio::test]
    async fn test_send_command_tracks_and_writes() {
        let (state, _events) = ControllerState::new(ControllerConfig::default());
        let (agent, mut seen) = register_fake_agent(&state, "a1", Ok(())).await;

        let command = send_command(&state, Command::exec("whoami"), &agent.id)
            .await
            .unwrap();

        assert_eq!(command.state(), CommandState::Executing);
        assert_eq!(command.target(), Some(agent.id.clone()));
        assert!(state.coordinator.inflight.get(command.id()).is_some());

        let wire = seen.recv().await.unwrap();
        let envelope: CommandEnvelope = serde_json::from_str(&wire).unwrap();
        assert_eq!(envelope.id, command.id());
        assert_eq!(envelope.name, CommandName::Exec);
        assert_eq!(envelope.args[0], serde_json::json!("whoami"));
    }

    #[tokio::test]
    async fn test_send_command_unknown_agent() {
        let (state, _events) = ControllerState::new(ControllerConfig::default());
        let err = send_command(&state, Command::ping(), &AgentId::new("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnknownAgent(_)));
        assert!(state.coordinator.inflight.is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_runs_disconnect_path() {
        let (state, mut events) = ControllerState::new(ControllerConfig::default());
        let (agent, _seen) =
            register_fake_agent(&state, "a1", Err("broken pipe".to_string())).await;

        let err = send_command(&state, Command::ping(), &agent.id)
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Transport(_)));
        // Agent gone, command purged, disconnect fired once.
        assert!(state.coordinator.agents.is_empty());
        assert!(state.coordinator.inflight.is_empty());
        match events.recv().await.unwrap() {
            ControllerEvent::AgentDisconnected(gone) => assert_eq!(gone.id, agent.id),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(agent.cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_disconnect_agent_fires_once() {
        let (state, mut events) = ControllerState::new(ControllerConfig::default());
        let (agent, _seen) = register_fake_agent(&state, "a1", Ok(())).await;

        disconnect_agent(&state, &agent).await;
        disconnect_agent(&state, &agent).await;

        match events.recv().await.unwrap() {
            ControllerEvent::AgentDisconnected(gone) => assert_eq!(gone.id, agent.id),
            other => panic!("unexpected event: {:?}", other),
        }
        // Second call was deduped: nothing further on the channel.
        assert!(events.try_recv().is_err());
    }
}
