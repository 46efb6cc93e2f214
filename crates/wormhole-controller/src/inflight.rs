//! In-flight command table
//!
//! Maps command id → command for every command currently executing on some
//! agent. Entries are inserted at dispatch and removed by feedback, by the
//! expiry sweeper, or when the target agent disconnects.

use dashmap::DashMap;
use std::sync::Arc;

use wormhole_core::{AgentId, Command};

/// Table of commands awaiting feedback.
pub struct InFlightTable {
    commands: DashMap<String, Arc<Command>>,
}

impl InFlightTable {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self {
            commands: DashMap::new(),
        }
    }

    /// Track a command under its id.
    pub fn insert(&self, command: Arc<Command>) {
        self.commands.insert(command.id().to_string(), command);
    }

    /// Point lookup by command id.
    pub fn get(&self, id: &str) -> Option<Arc<Command>> {
        self.commands.get(id).map(|r| Arc::clone(&r))
    }

    /// Remove and return the command for `id`.
    ///
    /// Of two racing removals (duplicate feedback, feedback vs. sweep) only
    /// one gets the command back; the loser sees `None`.
    pub fn remove(&self, id: &str) -> Option<Arc<Command>> {
        self.commands.remove(id).map(|(_, command)| command)
    }

    /// Snapshot of all tracked commands.
    pub fn list(&self) -> Vec<Arc<Command>> {
        self.commands.iter().map(|r| Arc::clone(&r)).collect()
    }

    /// Remove every command dispatched to `target`, returning them.
    pub fn remove_for_target(&self, target: &AgentId) -> Vec<Arc<Command>> {
        let ids: Vec<String> = self
            .commands
            .iter()
            .filter(|entry| entry.target().as_ref() == Some(target))
            .map(|entry| entry.key().clone())
            .collect();

        ids.iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Number of tracked commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for InFlightTable {
    fn default() -> Self {
        Self::new()
    }
}
