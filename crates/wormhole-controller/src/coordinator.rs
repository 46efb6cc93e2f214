//! State coordinator for cross-collection atomicity
//!
//! The agent registry and the in-flight table are frequently traversed
//! together: dispatch verifies the agent and inserts a command, a disconnect
//! removes the agent and purges its commands. The `StateCoordinator` wraps
//! both collections behind a single reader/writer lock so those compound
//! operations cannot interleave.
//!
//! Normal operations (dispatch, lookups) take the read lock and enjoy high
//! concurrency; operations that must see or produce a consistent state
//! across both collections (register, disconnect) take the write lock.
//!
//! No event is emitted and no socket is written while either guard is held.

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use wormhole_core::{AgentId, Command};

use crate::inflight::InFlightTable;
use crate::registry::{AgentHandle, AgentRegistry};

/// Coordinates access to the agent registry and the in-flight table.
pub struct StateCoordinator {
    /// Lock for cross-collection atomicity; the unit payload signals that
    /// the lock orders operations rather than protecting data directly.
    inner: RwLock<()>,

    /// Registry of connected agents.
    pub agents: Arc<AgentRegistry>,

    /// Commands currently awaiting feedback.
    pub inflight: Arc<InFlightTable>,
}

impl StateCoordinator {
    /// Create a coordinator with fresh collections.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(()),
            agents: Arc::new(AgentRegistry::new()),
            inflight: Arc::new(InFlightTable::new()),
        }
    }

    /// Acquire the shared lock for operations that need a consistent view
    /// across both collections without excluding each other (dispatch).
    pub async fn read(&self) -> RwLockReadGuard<'_, ()> {
        self.inner.read().await
    }

    /// Acquire the exclusive lock for operations that mutate both
    /// collections as one step (register, disconnect).
    pub async fn write(&self) -> RwLockWriteGuard<'_, ()> {
        self.inner.write().await
    }

    /// Atomically register an agent, returning the replaced entry on a
    /// reconnect with the same id. The caller closes the predecessor.
    pub async fn atomic_register(&self, agent: Arc<AgentHandle>) -> Option<Arc<AgentHandle>> {
        let _guard = self.write().await;
        self.agents.insert(agent)
    }

    /// Atomically remove an agent and purge its in-flight commands.
    ///
    /// The removal is keyed on `conn_seq`, so only the detector that saw the
    /// currently registered connection wins; every other caller gets
    /// `(None, [])`. While the write guard is held, no dispatch can slip a
    /// new command in between agent removal and the purge.
    pub async fn atomic_disconnect(
        &self,
        id: &AgentId,
        conn_seq: u64,
    ) -> (Option<Arc<AgentHandle>>, Vec<Arc<Command>>) {
        let _guard = self.write().await;

        let agent = self.agents.remove_if_current(id, conn_seq);
        let purged = if agent.is_some() {
            self.inflight.remove_for_target(id)
        } else {
            Vec::new()
        };

        (agent, purged)
    }
}

impl Default for StateCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
