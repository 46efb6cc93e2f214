//! Interactive operator console
//!
//! Two states drive the terminal: `Ready` accepts verbs, `Executing` waits
//! for the response of the one command in flight (typed input is ignored,
//! an interrupt aborts the wait). The console drains the engine's event
//! channel on its own task, so connect/disconnect/response notifications
//! land asynchronously between prompts.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use owo_colors::OwoColorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use wormhole_controller::registry::AgentHandle;
use wormhole_controller::{dispatch, ControllerEvent, ControllerState};
use wormhole_core::{time, Command};
use wormhole_protocol::CommandState;

use crate::alias::AliasStore;
use crate::commands::{self, Verb};
use crate::output::Styles;
use crate::sweeper;

/// Operator states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpState {
    /// Accepting commands.
    Ready,
    /// A command is in flight; only interrupts are accepted.
    Executing,
}

struct Shared {
    op_state: OpState,
    current: Option<Arc<AgentHandle>>,
    /// Snapshot taken by the last `list`; `select` indices point into it.
    roster: Vec<Arc<AgentHandle>>,
}

/// The operator console.
pub struct Console {
    state: Arc<ControllerState>,
    store: AliasStore,
    styles: Styles,
    debug: bool,
    shared: Mutex<Shared>,
}

impl Console {
    pub fn new(state: Arc<ControllerState>, store: AliasStore, debug: bool) -> Self {
        Self {
            state,
            store,
            styles: Styles::colored(),
            debug,
            shared: Mutex::new(Shared {
                op_state: OpState::Ready,
                current: None,
                roster: Vec::new(),
            }),
        }
    }

    /// Run the console until stdin closes.
    ///
    /// Spawns the event drain, the interrupt handler, and the expiry
    /// sweeper, then loops on operator input.
    pub async fn run(self: Arc<Self>, events: mpsc::Receiver<ControllerEvent>) -> Result<()> {
        {
            let console = Arc::clone(&self);
            tokio::spawn(async move { console.drain_events(events).await });
        }
        {
            let console = Arc::clone(&self);
            tokio::spawn(async move { console.interrupt_loop().await });
        }
        {
            let console = Arc::clone(&self);
            tokio::spawn(async move { console.sweep_loop().await });
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            self.print_prompt();
            let Some(line) = lines.next_line().await? else {
                return Ok(());
            };
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            if self.op_state() == OpState::Executing {
                // Typed input is ignored while a command runs.
                continue;
            }
            if let Err(err) = self.handle_line(&line).await {
                println!("{}", err.to_string().style(self.styles.error));
            }
        }
    }

    async fn handle_line(&self, line: &str) -> Result<()> {
        match commands::parse(line)? {
            Verb::Help => {
                print!("{}", commands::HELP_TEXT.style(self.styles.info));
                Ok(())
            }
            Verb::Exit => std::process::exit(0),
            Verb::List => {
                self.list_agents();
                Ok(())
            }
            Verb::Select(index) => self.select_agent(index),
            Verb::Ping => self.dispatch_to_current(Command::ping()).await,
            Verb::Exec(script) => self.dispatch_to_current(Command::exec(script)).await,
            Verb::CmdStates => self.list_command_states(),
            Verb::Alias(label) => self.set_alias(&label),
        }
    }

    fn list_agents(&self) {
        let agents = self.state.coordinator.agents.list();
        if agents.is_empty() {
            println!(
                "{}",
                "there are no connected agents".style(self.styles.warning)
            );
            return;
        }

        let mut listing = String::new();
        for (index, agent) in agents.iter().enumerate() {
            listing.push_str(&format!("[{}] {}\n", index, self.agent_label(agent)));
        }
        print!("{}", listing.style(self.styles.info));

        self.shared.lock().expect("console lock poisoned").roster = agents;
    }

    fn select_agent(&self, index: usize) -> Result<()> {
        let mut shared = self.shared.lock().expect("console lock poisoned");
        let selected = shared.roster.get(index).cloned();
        match selected {
            Some(agent) => {
                shared.current = Some(agent);
                Ok(())
            }
            None => bail!("index {} is out of range of the agents list", index),
        }
    }

    async fn dispatch_to_current(&self, command: Command) -> Result<()> {
        let agent = self
            .current_agent()
            .ok_or_else(|| anyhow!("no agent is selected"))?;
        self.set_op_state(OpState::Executing);
        dispatch::send_command(&self.state, command, &agent.id).await?;
        Ok(())
    }

    fn list_command_states(&self) -> Result<()> {
        let agent = self
            .current_agent()
            .ok_or_else(|| anyhow!("no agent is selected"))?;

        let commands: Vec<_> = self
            .state
            .coordinator
            .inflight
            .list()
            .into_iter()
            .filter(|command| command.target().as_ref() == Some(&agent.id))
            .collect();

        if commands.is_empty() {
            println!(
                "{}",
                "there are no active commands yet".style(self.styles.warning)
            );
            return Ok(());
        }
        for command in commands {
            println!("{}", command.to_string().style(self.styles.warning));
        }
        Ok(())
    }

    fn set_alias(&self, label: &str) -> Result<()> {
        let agent = self
            .current_agent()
            .ok_or_else(|| anyhow!("no agent is selected"))?;
        self.store.set_alias(&agent.id, label)?;
        Ok(())
    }

    async fn drain_events(&self, mut events: mpsc::Receiver<ControllerEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                ControllerEvent::AgentConnected(agent) => self.on_connect(&agent),
                ControllerEvent::AgentDisconnected(agent) => self.on_disconnect(&agent),
                ControllerEvent::CommandResponse { command, body } => {
                    self.on_response(&command, &body)
                }
            }
        }
    }

    fn on_connect(&self, agent: &AgentHandle) {
        println!(
            "\n{}",
            format!("[+] agent connected: {}", agent).style(self.styles.success)
        );
        self.print_prompt();
    }

    fn on_disconnect(&self, agent: &AgentHandle) {
        println!(
            "\n{}",
            format!("[-] agent disconnected: {}", agent).style(self.styles.error)
        );
        {
            let mut shared = self.shared.lock().expect("console lock poisoned");
            let was_current = shared
                .current
                .as_ref()
                .is_some_and(|current| current.id == agent.id);
            if was_current {
                shared.current = None;
                shared.op_state = OpState::Ready;
            }
        }
        self.print_prompt();
    }

    fn on_response(&self, command: &Command, body: &[u8]) {
        if command.state() == CommandState::Interrupted {
            if self.debug {
                tracing::debug!("dropping response for interrupted command {}", command.id());
            }
            return;
        }

        self.set_op_state(OpState::Ready);
        let text = String::from_utf8_lossy(body);
        if command.state() == CommandState::Failed {
            println!(
                "{}",
                format!("command error: {}", text).style(self.styles.error)
            );
        } else {
            println!("{}", text);
        }
        self.print_prompt();
    }

    async fn interrupt_loop(&self) {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            self.handle_interrupt();
        }
    }

    /// Operator interrupt: every in-flight command becomes `Interrupted`
    /// (local state only; the agent's eventual response is discarded) and
    /// the terminal returns to `Ready`.
    fn handle_interrupt(&self) {
        for command in self.state.coordinator.inflight.list() {
            command.interrupt();
        }
        self.set_op_state(OpState::Ready);
        println!();
        self.print_prompt();
    }

    async fn sweep_loop(&self) {
        let mut ticker = tokio::time::interval(self.state.config.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let expired = sweeper::sweep(
                &self.state.coordinator.inflight,
                self.state.config.command_expiry,
                time::current_time_nanos(),
            );
            if expired.is_empty() {
                continue;
            }
            for command in expired {
                println!(
                    "\n{}",
                    format!("command {} {} has been expired", command.id(), command.name())
                        .style(self.styles.error)
                );
            }
            self.print_prompt();
        }
    }

    /// `"<alias-or-ip>> "` with an agent selected, `"wormhole> "` otherwise.
    /// Suppressed while a command is executing.
    fn print_prompt(&self) {
        use std::io::Write;

        let prefix = {
            let shared = self.shared.lock().expect("console lock poisoned");
            if shared.op_state == OpState::Executing {
                return;
            }
            match &shared.current {
                Some(agent) => self
                    .store
                    .alias(&agent.id)
                    .unwrap_or_else(|| agent.remote_addr.clone()),
                None => "wormhole".to_string(),
            }
        };
        print!("{}", format!("{}> ", prefix).style(self.styles.success));
        let _ = std::io::stdout().flush();
    }

    fn agent_label(&self, agent: &AgentHandle) -> String {
        self.store
            .alias(&agent.id)
            .unwrap_or_else(|| agent.to_string())
    }

    fn op_state(&self) -> OpState {
        self.shared.lock().expect("console lock poisoned").op_state
    }

    fn set_op_state(&self, op_state: OpState) {
        self.shared.lock().expect("console lock poisoned").op_state = op_state;
    }

    fn current_agent(&self) -> Option<Arc<AgentHandle>> {
        self.shared
            .lock()
            .expect("console lock poisoned")
            .current
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::sync::mpsc as tokio_mpsc;
    use tokio_util::sync::CancellationToken;

    use wormhole_controller::registry::{OutboundFrame, FRAME_CHANNEL_CAPACITY};
    use wormhole_controller::ControllerConfig;
    use wormhole_core::AgentId;

    fn test_console(dir: &TempDir) -> Arc<Console> {
        let (state, _events) = ControllerState::new(ControllerConfig::default());
        let store = AliasStore::open(dir.path().join("aliases.db")).unwrap();
        Arc::new(Console::new(state, store, false))
    }

    fn fake_agent(id: &str) -> (Arc<AgentHandle>, tokio_mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = tokio_mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let agent = Arc::new(AgentHandle::new(
            AgentId::new(id),
            "192.0.2.10:41000",
            tx,
            CancellationToken::new(),
        ));
        (agent, rx)
    }

    #[tokio::test]
    async fn test_select_requires_a_listed_agent() {
        let dir = TempDir::new().unwrap();
        let console = test_console(&dir);
        assert!(console.select_agent(0).is_err());

        let (agent, _rx) = fake_agent("a1");
        console.shared.lock().unwrap().roster = vec![Arc::clone(&agent)];
        console.select_agent(0).unwrap();
        assert_eq!(console.current_agent().unwrap().id, agent.id);
        assert!(console.select_agent(1).is_err());
    }

    #[tokio::test]
    async fn test_interrupt_resets_state_and_marks_commands() {
        let dir = TempDir::new().unwrap();
        let console = test_console(&dir);

        let command = Command::ping();
        command.mark_executing(&AgentId::new("a1"));
        let command = Arc::new(command);
        console
            .state
            .coordinator
            .inflight
            .insert(Arc::clone(&command));
        console.set_op_state(OpState::Executing);

        console.handle_interrupt();

        assert_eq!(command.state(), CommandState::Interrupted);
        assert_eq!(console.op_state(), OpState::Ready);
        // The command stays tabled until the sweeper's terminal-state pass.
        assert_eq!(console.state.coordinator.inflight.len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_of_current_agent_resets_selection() {
        let dir = TempDir::new().unwrap();
        let console = test_console(&dir);
        let (agent, _rx) = fake_agent("a1");

        console.shared.lock().unwrap().current = Some(Arc::clone(&agent));
        console.set_op_state(OpState::Executing);

        console.on_disconnect(&agent);

        assert!(console.current_agent().is_none());
        assert_eq!(console.op_state(), OpState::Ready);
    }

    #[tokio::test]
    async fn test_disconnect_of_other_agent_keeps_selection() {
        let dir = TempDir::new().unwrap();
        let console = test_console(&dir);
        let (current, _rx1) = fake_agent("a1");
        let (other, _rx2) = fake_agent("a2");

        console.shared.lock().unwrap().current = Some(Arc::clone(&current));
        console.on_disconnect(&other);

        assert_eq!(console.current_agent().unwrap().id, current.id);
    }

    #[tokio::test]
    async fn test_interrupted_response_is_dropped() {
        let dir = TempDir::new().unwrap();
        let console = test_console(&dir);

        let command = Command::ping();
        command.mark_executing(&AgentId::new("a1"));
        command.interrupt();
        console.set_op_state(OpState::Executing);

        // A late response for an interrupted command must not flip the
        // console back to Ready by itself.
        console.on_response(&command, b"pong");
        assert_eq!(console.op_state(), OpState::Executing);
    }

    #[tokio::test]
    async fn test_response_resets_to_ready() {
        let dir = TempDir::new().unwrap();
        let console = test_console(&dir);

        let command = Command::ping();
        command.mark_executing(&AgentId::new("a1"));
        command.finish(CommandState::Success);
        console.set_op_state(OpState::Executing);

        console.on_response(&command, b"pong");
        assert_eq!(console.op_state(), OpState::Ready);
    }

    #[tokio::test]
    async fn test_agent_label_prefers_alias() {
        let dir = TempDir::new().unwrap();
        let console = test_console(&dir);
        let (agent, _rx) = fake_agent("a1");

        assert_eq!(console.agent_label(&agent), agent.to_string());
        console.store.set_alias(&agent.id, "web-box").unwrap();
        assert_eq!(console.agent_label(&agent), "web-box");
    }
}
