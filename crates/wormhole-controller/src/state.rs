//! Global controller state

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::ControllerConfig;
use crate::coordinator::StateCoordinator;
use crate::events::{ControllerEvent, EventSender};

/// Shared state threaded through every engine task and transport handler.
pub struct ControllerState {
    /// Configuration.
    pub config: ControllerConfig,
    /// Coordinated registry + in-flight table.
    pub coordinator: Arc<StateCoordinator>,
    /// Event surface toward the operator layer.
    pub events: EventSender,
}

impl ControllerState {
    /// Create the controller state and the event receiver the operator
    /// layer drains.
    pub fn new(config: ControllerConfig) -> (Arc<Self>, mpsc::Receiver<ControllerEvent>) {
        let (events, event_rx) = EventSender::channel();
        let state = Arc::new(Self {
            config,
            coordinator: Arc::new(StateCoordinator::new()),
            events,
        });
        (state, event_rx)
    }
}
