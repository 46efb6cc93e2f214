//! Time utilities for the wormhole fabric

use std::time::{SystemTime, UNIX_EPOCH};

/// Get the current Unix timestamp in nanoseconds.
///
/// # Panics
/// Panics if the system time is before the Unix epoch (1970-01-01),
/// which would indicate a severely misconfigured system.
pub fn current_time_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX epoch")
        .as_nanos() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_time_nanos_is_positive() {
        assert!(current_time_nanos() > 0);
    }

    #[test]
    fn test_current_time_nanos_advances() {
        let first = current_time_nanos();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = current_time_nanos();
        assert!(second > first);
    }
}
