//! Command expiry sweeper
//!
//! A periodic pass over the in-flight table: commands already in a terminal
//! state get their deferred removal, commands older than the expiry
//! deadline are dropped and reported so the operator sees an `expired`
//! line. Age comes from the command id (a creation timestamp). Expiry
//! fires no response event.

use std::sync::Arc;
use std::time::Duration;

use wormhole_controller::InFlightTable;
use wormhole_core::Command;
use wormhole_protocol::CommandState;

/// One sweep pass at `now_nanos`. Returns the commands that expired, for
/// operator notification.
pub fn sweep(inflight: &InFlightTable, expiry: Duration, now_nanos: i64) -> Vec<Arc<Command>> {
    let mut expired = Vec::new();

    for command in inflight.list() {
        if command.state() != CommandState::Executing {
            // Terminal-state leftovers (interrupts, lost removal races).
            inflight.remove(command.id());
            continue;
        }
        match command.age(now_nanos) {
            Some(age) if age > expiry => {
                if inflight.remove(command.id()).is_some() {
                    expired.push(command);
                }
            }
            Some(_) => {}
            None => {
                tracing::warn!("can't parse command id {} as a timestamp", command.id());
            }
        }
    }

    expired
}

#[cfg(test)]
mod tests {
    use super::*;
    use wormhole_core::AgentId;

    const HOUR: Duration = Duration::from_secs(3600);

    fn executing_command() -> Arc<Command> {
        let command = Command::ping();
        command.mark_executing(&AgentId::new("a1"));
        Arc::new(command)
    }

    #[test]
    fn test_fresh_commands_survive() {
        let table = InFlightTable::new();
        let command = executing_command();
        table.insert(Arc::clone(&command));

        let now = command.created_at_nanos().unwrap() + 1_000_000_000;
        let expired = sweep(&table, HOUR, now);

        assert!(expired.is_empty());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_old_commands_expire() {
        let table = InFlightTable::new();
        let command = executing_command();
        table.insert(Arc::clone(&command));

        let two_hours = 2 * 3600 * 1_000_000_000i64;
        let now = command.created_at_nanos().unwrap() + two_hours;
        let expired = sweep(&table, HOUR, now);

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id(), command.id());
        assert!(table.is_empty());
    }

    #[test]
    fn test_terminal_commands_are_cleaned_up_quietly() {
        let table = InFlightTable::new();
        let command = executing_command();
        command.interrupt();
        table.insert(Arc::clone(&command));

        let now = command.created_at_nanos().unwrap();
        let expired = sweep(&table, HOUR, now);

        // Removed, but not reported as expired.
        assert!(expired.is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_mixed_states_in_one_pass() {
        let table = InFlightTable::new();
        let stale = executing_command();
        let interrupted = executing_command();
        interrupted.interrupt();
        table.insert(Arc::clone(&stale));
        table.insert(Arc::clone(&interrupted));

        let now = stale.created_at_nanos().unwrap() + 2 * 3600 * 1_000_000_000i64;
        let expired = sweep(&table, HOUR, now);

        // The interrupted command is cleaned up without a notification;
        // only the stale executing one is reported.
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id(), stale.id());
        assert!(table.is_empty());
    }
}
