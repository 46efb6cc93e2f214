//! Message types for the wormhole wire contract
//!
//! Commands are pushed to an agent as a single JSON text frame:
//!
//! ```json
//! { "id": "<nanosecond-int-as-string>", "name": "ping" | "exec", "args": [ ... ] }
//! ```
//!
//! Results come back out-of-band on the feedback endpoint as
//! `?cid=<id>&code=<success|error>` plus a raw payload body.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of command verbs an agent understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandName {
    /// Liveness probe; the agent answers with a `pong` payload.
    Ping,
    /// Shell execution; `args[0]` is the shell source string.
    Exec,
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandName::Ping => write!(f, "ping"),
            CommandName::Exec => write!(f, "exec"),
        }
    }
}

/// Lifecycle state of a dispatched command.
///
/// Born `Undefined`, becomes `Executing` at dispatch; `Success`, `Failed`
/// and `Interrupted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandState {
    Undefined,
    Executing,
    Success,
    Failed,
    Interrupted,
}

impl CommandState {
    /// Whether this state ends the command's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CommandState::Success | CommandState::Failed | CommandState::Interrupted
        )
    }
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandState::Undefined => write!(f, "undefined"),
            CommandState::Executing => write!(f, "executing"),
            CommandState::Success => write!(f, "success"),
            CommandState::Failed => write!(f, "failed"),
            CommandState::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Result code reported by an agent on the feedback endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Success,
    Error,
}

impl ResultCode {
    /// Parse the `code` query parameter.
    ///
    /// An absent parameter means success; any value other than the literal
    /// `success` is an error report.
    pub fn parse(code: Option<&str>) -> Self {
        match code {
            None => ResultCode::Success,
            Some("success") => ResultCode::Success,
            Some(_) => ResultCode::Error,
        }
    }

    /// The terminal command state this result code maps to.
    pub fn into_state(self) -> CommandState {
        match self {
            ResultCode::Success => CommandState::Success,
            ResultCode::Error => CommandState::Failed,
        }
    }
}

/// The server → agent JSON frame for one command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Unique command id; also the correlation key for feedback.
    pub id: String,
    /// Verb to execute.
    pub name: CommandName,
    /// Ordered opaque arguments.
    pub args: Vec<serde_json::Value>,
}

impl CommandEnvelope {
    /// Create an envelope for a command.
    pub fn new(id: impl Into<String>, name: CommandName, args: Vec<serde_json::Value>) -> Self {
        Self {
            id: id.into(),
            name,
            args,
        }
    }
}
