//! The command model
//!
//! A `Command` is one unit of work dispatched to one agent. Its identity
//! (`id`, `name`, `args`) is immutable; its lifecycle (`state`, `target`) is
//! guarded by a small per-command lock so transitions can happen from any
//! task holding an `Arc<Command>`.

use std::fmt;
use std::sync::RwLock;
use std::time::Duration;

use wormhole_protocol::{CommandEnvelope, CommandName, CommandState};

use crate::ids;
use crate::types::AgentId;

/// One dispatched (or about-to-be-dispatched) command.
pub struct Command {
    id: String,
    name: CommandName,
    args: Vec<serde_json::Value>,
    lifecycle: RwLock<Lifecycle>,
}

struct Lifecycle {
    state: CommandState,
    target: Option<AgentId>,
}

impl Command {
    /// Create a command in the `Undefined` state with a fresh id.
    pub fn new(name: CommandName, args: Vec<serde_json::Value>) -> Self {
        Self {
            id: ids::next_id(),
            name,
            args,
            lifecycle: RwLock::new(Lifecycle {
                state: CommandState::Undefined,
                target: None,
            }),
        }
    }

    /// A liveness probe command.
    pub fn ping() -> Self {
        Self::new(CommandName::Ping, Vec::new())
    }

    /// A shell execution command; `script` becomes `args[0]`.
    pub fn exec(script: impl Into<String>) -> Self {
        Self::new(
            CommandName::Exec,
            vec![serde_json::Value::String(script.into())],
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> CommandName {
        self.name
    }

    pub fn args(&self) -> &[serde_json::Value] {
        &self.args
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CommandState {
        self.lifecycle.read().expect("command lock poisoned").state
    }

    /// The agent this command was dispatched to, once dispatched.
    pub fn target(&self) -> Option<AgentId> {
        self.lifecycle
            .read()
            .expect("command lock poisoned")
            .target
            .clone()
    }

    /// Dispatch-time transition: set the target and enter `Executing`.
    pub fn mark_executing(&self, target: &AgentId) {
        let mut lifecycle = self.lifecycle.write().expect("command lock poisoned");
        lifecycle.target = Some(target.clone());
        lifecycle.state = CommandState::Executing;
    }

    /// Complete the command with a terminal state from agent feedback.
    ///
    /// Only an `Executing` command is transitioned; any other current state
    /// (notably `Interrupted`) is left untouched. Returns the state after
    /// the call, so callers observe which transition actually happened.
    pub fn finish(&self, terminal: CommandState) -> CommandState {
        debug_assert!(terminal.is_terminal());
        let mut lifecycle = self.lifecycle.write().expect("command lock poisoned");
        if lifecycle.state == CommandState::Executing {
            lifecycle.state = terminal;
        }
        lifecycle.state
    }

    /// Operator interrupt: `Executing` → `Interrupted`.
    ///
    /// Returns true when this call performed the transition.
    pub fn interrupt(&self) -> bool {
        let mut lifecycle = self.lifecycle.write().expect("command lock poisoned");
        if lifecycle.state == CommandState::Executing {
            lifecycle.state = CommandState::Interrupted;
            true
        } else {
            false
        }
    }

    /// Creation timestamp recovered from the id, if the id is well-formed.
    pub fn created_at_nanos(&self) -> Option<i64> {
        ids::creation_nanos(&self.id)
    }

    /// Age of the command at `now_nanos`, derived from the id.
    pub fn age(&self, now_nanos: i64) -> Option<Duration> {
        self.created_at_nanos()
            .map(|created| Duration::from_nanos(now_nanos.saturating_sub(created).max(0) as u64))
    }

    /// The wire representation pushed to the agent.
    pub fn envelope(&self) -> CommandEnvelope {
        CommandEnvelope::new(self.id.clone(), self.name, self.args.clone())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.state())
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state())
            .field("target", &self.target())
            .finish()
    }
}
