//! Agent registry implementation

use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::Message;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use wormhole_core::{AgentId, DispatchError};

/// Capacity of the per-agent outbound frame channel.
///
/// Writes block (briefly) when the writer task falls behind; a stuck socket
/// is detected by the heartbeat deadline, not by channel backpressure.
pub const FRAME_CHANNEL_CAPACITY: usize = 32;

static NEXT_CONN_SEQ: AtomicU64 = AtomicU64::new(1);

/// One frame queued for an agent's writer task.
///
/// The `ack` channel reports the socket write result back to the sender, so
/// dispatch and heartbeat observe failures synchronously even though a single
/// writer task owns the sink.
pub struct OutboundFrame {
    pub message: Message,
    pub ack: oneshot::Sender<Result<(), String>>,
}

/// A connected agent endpoint.
///
/// The socket's write half is owned by a dedicated writer task; this handle
/// reaches it through `frame_tx`. `conn_seq` identifies the physical
/// connection so a disconnect of a stale socket can never evict the entry of
/// a reconnected agent with the same id.
pub struct AgentHandle {
    /// Agent id, as supplied on connect.
    pub id: AgentId,
    /// Remote address captured from the connection.
    pub remote_addr: String,
    /// Cancelling this token stops the writer task, the read loop, and the
    /// heartbeat supervisor of this connection.
    pub cancel: CancellationToken,
    conn_seq: u64,
    frame_tx: mpsc::Sender<OutboundFrame>,
    connected_at: Instant,
}

impl AgentHandle {
    /// Create a handle for a freshly upgraded connection.
    pub fn new(
        id: AgentId,
        remote_addr: impl Into<String>,
        frame_tx: mpsc::Sender<OutboundFrame>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            remote_addr: remote_addr.into(),
            cancel,
            conn_seq: NEXT_CONN_SEQ.fetch_add(1, Ordering::Relaxed),
            frame_tx,
            connected_at: Instant::now(),
        }
    }

    /// Process-unique identifier of this physical connection.
    pub fn conn_seq(&self) -> u64 {
        self.conn_seq
    }

    /// How long this connection has been up.
    pub fn uptime(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Write one frame to the agent's socket and wait for the result.
    ///
    /// Frames from all callers funnel through the single writer task, which
    /// is what keeps per-agent command ordering equal to dispatch ordering.
    pub async fn send(&self, message: Message) -> Result<(), DispatchError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.frame_tx
            .send(OutboundFrame {
                message,
                ack: ack_tx,
            })
            .await
            .map_err(|_| DispatchError::ChannelClosed)?;
        match ack_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(DispatchError::Transport(err)),
            Err(_) => Err(DispatchError::ChannelClosed),
        }
    }
}

impl fmt::Display for AgentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.remote_addr)
    }
}

/// Registry of live agents, indexed by agent id.
pub struct AgentRegistry {
    agents: DashMap<AgentId, Arc<AgentHandle>>,
}

impl AgentRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            agents: DashMap::new(),
        }
    }

    /// Point lookup by agent id.
    pub fn get(&self, id: &AgentId) -> Option<Arc<AgentHandle>> {
        self.agents.get(id).map(|r| Arc::clone(&r))
    }

    /// Snapshot of all connected agents.
    pub fn list(&self) -> Vec<Arc<AgentHandle>> {
        self.agents.iter().map(|r| Arc::clone(&r)).collect()
    }

    /// Number of connected agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Insert an agent, returning the entry it replaced, if any.
    ///
    /// A reconnect with the same id lands here: the caller closes the
    /// returned predecessor's socket.
    pub fn insert(&self, agent: Arc<AgentHandle>) -> Option<Arc<AgentHandle>> {
        self.agents.insert(agent.id.clone(), agent)
    }

    /// Remove the entry for `id`, but only if it is still the connection
    /// identified by `conn_seq`.
    ///
    /// This is the disconnect dedupe point: of the several detectors that
    /// can report the same dead connection (heartbeat, read loop, dispatch
    /// write), only the first one gets the entry back, and a detector firing
    /// for an already-replaced socket removes nothing.
    pub fn remove_if_current(&self, id: &AgentId, conn_seq: u64) -> Option<Arc<AgentHandle>> {
        self.agents
            .remove_if(id, |_, agent| agent.conn_seq == conn_seq)
            .map(|(_, agent)| agent)
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
