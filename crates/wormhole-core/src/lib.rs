//! wormhole-core: Command model and shared types for the wormhole fabric
//!
//! This crate provides the command lifecycle model, id generation, and
//! error taxonomy shared by the controller engine and the operator console.

pub mod command;
pub mod error;
pub mod ids;
pub mod time;
pub mod types;

pub use command::Command;
pub use error::DispatchError;
pub use types::AgentId;
