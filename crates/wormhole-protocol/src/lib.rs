//! wormhole-protocol: Wire contract for the wormhole command fabric
//!
//! This crate defines what travels between the controller and its agents:
//! the JSON command envelope pushed over the streaming socket, and the
//! result codes carried back on the feedback endpoint.

pub mod error;
pub mod message;

pub use error::ProtocolError;
pub use message::{CommandEnvelope, CommandName, CommandState, ResultCode};
