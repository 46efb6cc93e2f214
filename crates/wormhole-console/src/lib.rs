//! wormhole-console: Interactive operator front end
//!
//! A single terminal drives the controller: list connected agents, select
//! one, dispatch commands, and watch responses stream back. The console
//! consumes the engine's event channel and owns the alias store and the
//! command expiry sweeper.

pub mod alias;
pub mod commands;
pub mod console;
pub mod output;
pub mod sweeper;

pub use alias::AliasStore;
pub use console::Console;
