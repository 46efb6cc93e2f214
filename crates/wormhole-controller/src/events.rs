//! Event surface consumed by the operator layer
//!
//! The engine reports connects, disconnects, and command responses on a
//! bounded channel that the operator console drains on its own task. Events
//! are emitted strictly after registry/in-flight lock guards are dropped, so
//! a slow (or absent) consumer can delay notifications but never a state
//! transition.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use wormhole_core::Command;

use crate::registry::AgentHandle;

/// Capacity of the event channel between engine and operator layer.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Notifications emitted by the dispatch engine.
#[derive(Clone)]
pub enum ControllerEvent {
    /// An agent completed registration.
    AgentConnected(Arc<AgentHandle>),
    /// An agent was removed from the registry; fired exactly once per
    /// logical disconnect.
    AgentDisconnected(Arc<AgentHandle>),
    /// Feedback arrived for an in-flight command; fired at most once per
    /// command id (expired commands fire nothing).
    CommandResponse {
        command: Arc<Command>,
        body: Bytes,
    },
}

impl std::fmt::Debug for ControllerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerEvent::AgentConnected(agent) => {
                write!(f, "AgentConnected({})", agent.id)
            }
            ControllerEvent::AgentDisconnected(agent) => {
                write!(f, "AgentDisconnected({})", agent.id)
            }
            ControllerEvent::CommandResponse { command, body } => write!(
                f,
                "CommandResponse(id={}, {} bytes)",
                command.id(),
                body.len()
            ),
        }
    }
}

/// Sending half of the event surface, cloned into every engine task.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<ControllerEvent>,
}

impl EventSender {
    /// Create the event channel, returning the sender and the receiver the
    /// operator layer drains.
    pub fn channel() -> (Self, mpsc::Receiver<ControllerEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (Self { tx }, rx)
    }

    /// Deliver an event to the operator layer.
    ///
    /// A dropped receiver (headless engine, e.g. in tests) is not an error.
    pub async fn emit(&self, event: ControllerEvent) {
        if self.tx.send(event).await.is_err() {
            tracing::debug!("event receiver dropped, notification discarded");
        }
    }
}
