//! Core error types for the wormhole fabric

use thiserror::Error;

use crate::types::AgentId;

/// Errors surfaced by the command dispatch path
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The target agent is not (or no longer) registered
    #[error("unknown agent id: {0}")]
    UnknownAgent(AgentId),

    /// The per-agent writer is gone; the connection is being torn down
    #[error("agent connection closed")]
    ChannelClosed,

    /// The socket write itself failed
    #[error("transport write failed: {0}")]
    Transport(String),

    /// The command could not be encoded for the wire
    #[error("command encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DispatchError {
    /// Whether this error implies the agent connection is dead and the
    /// disconnect path should run.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, DispatchError::ChannelClosed | DispatchError::Transport(_))
    }
}
