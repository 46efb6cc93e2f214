//! wormhole-controller: Session and command-dispatch engine
//!
//! The controller accepts long-lived agent connections on a streaming
//! socket, pushes commands to them, and correlates the responses that come
//! back out-of-band on the feedback endpoint. This crate owns the agent
//! registry, the in-flight command table, the per-agent heartbeat
//! supervisors, and the event surface the operator console drains.

pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod events;
pub mod heartbeat;
pub mod inflight;
pub mod registry;
pub mod server;
pub mod state;

pub use config::ControllerConfig;
pub use coordinator::StateCoordinator;
pub use events::{ControllerEvent, EventSender};
pub use inflight::InFlightTable;
pub use registry::{AgentHandle, AgentRegistry};
pub use state::ControllerState;
