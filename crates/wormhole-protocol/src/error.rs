//! Protocol error types

use thiserror::Error;

/// Errors that can occur at the wire boundary
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Connect request is missing the agent uuid query parameter
    #[error("missing or empty agent uuid")]
    MissingAgentId,
}
