//! Controller configuration

use std::time::Duration;

/// Tunables for the dispatch engine and its background tasks.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Address agents dial, e.g. `0.0.0.0:39746`.
    pub listen_addr: String,
    /// Verbose logging of protocol noise (late feedback, ignored frames).
    pub debug: bool,
    /// Interval between liveness pings to each agent.
    pub heartbeat_interval: Duration,
    /// Write deadline for a liveness ping; a miss is a disconnect.
    pub heartbeat_deadline: Duration,
    /// Age past which an in-flight command is dropped by the sweeper.
    pub command_expiry: Duration,
    /// Interval between expiry sweeps.
    pub sweep_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            listen_addr: normalize_listen_addr(":39746"),
            debug: false,
            heartbeat_interval: Duration::from_secs(1),
            heartbeat_deadline: Duration::from_secs(2),
            command_expiry: Duration::from_secs(60 * 60),
            sweep_interval: Duration::from_secs(5),
        }
    }
}

/// Normalize a listen address: a bare `:port` binds all interfaces.
pub fn normalize_listen_addr(addr: &str) -> String {
    if let Some(port) = addr.strip_prefix(':') {
        format!("0.0.0.0:{}", port)
    } else {
        addr.to_string()
    }
}
