//! Terminal effector
//!
//! Terminal commands run one at a time on a dedicated worker thread so the
//! dispatcher can bound its wait with `commandTimeoutMs` and move on while a
//! slow command keeps running. Each request carries the sender its
//! completion is reported on.

use crate::effectors::{Completion, Effect, Effector};
use crate::process_guard::TrackedChild;
use crate::step::{Action, ActionKind};
use anyhow::{Result, bail};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Sender};
use tracing::{debug, error, info};

/// Name used for steps that do not name a terminal
pub const DEFAULT_TERMINAL: &str = "demotime";

/// A command for the worker thread
#[derive(Debug)]
struct TerminalRequest {
    terminal: String,
    command: String,
    reply: Sender<std::result::Result<String, String>>,
}

/// Spawn the worker that executes terminal commands through `shell -c`.
///
/// The thread exits once every request sender is dropped.
fn spawn_terminal_thread(shell: String, workspace: PathBuf) -> Sender<TerminalRequest> {
    let (request_tx, request_rx) = mpsc::channel::<TerminalRequest>();

    std::thread::spawn(move || {
        debug!("Terminal thread started");
        while let Ok(request) = request_rx.recv() {
            info!("[{}] $ {}", request.terminal, request.command);
            let result = run_shell(&shell, &workspace, &request.command);
            match &result {
                Ok(stdout) => {
                    for line in stdout.lines() {
                        println!("{}", line);
                    }
                }
                Err(message) => error!("[{}] {}", request.terminal, message),
            }
            if request.reply.send(result).is_err() {
                debug!("Nobody waits for \"{}\" anymore", request.command);
            }
        }
        debug!("Terminal thread shut down");
    });

    request_tx
}

fn run_shell(shell: &str, workspace: &Path, command: &str) -> std::result::Result<String, String> {
    let mut cmd = Command::new(shell);
    cmd.args(["-c", command])
        .current_dir(workspace)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    TrackedChild::spawn(&mut cmd)
        .and_then(TrackedChild::wait_with_output)
        .map_err(|e| e.to_string())
        .and_then(|output| {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
            }
        })
}

pub struct TerminalEffector {
    requests: Sender<TerminalRequest>,
    open: BTreeSet<String>,
}

impl TerminalEffector {
    pub fn new(shell: impl Into<String>, workspace: impl Into<PathBuf>) -> Self {
        Self {
            requests: spawn_terminal_thread(shell.into(), workspace.into()),
            open: BTreeSet::new(),
        }
    }

    pub fn open_terminals(&self) -> impl Iterator<Item = &str> {
        self.open.iter().map(String::as_str)
    }

    fn name(terminal_id: &Option<String>) -> String {
        terminal_id
            .clone()
            .unwrap_or_else(|| DEFAULT_TERMINAL.to_string())
    }
}

impl Effector for TerminalEffector {
    fn kinds(&self) -> Vec<ActionKind> {
        vec![
            ActionKind::OpenTerminal,
            ActionKind::ExecuteTerminalCommand,
            ActionKind::CloseTerminal,
        ]
    }

    fn apply(&mut self, action: &Action) -> Result<Effect> {
        match action {
            Action::OpenTerminal { terminal_id } => {
                let name = Self::name(terminal_id);
                info!("Opening terminal {}", name);
                self.open.insert(name);
                Ok(Effect::Done)
            }
            Action::CloseTerminal { terminal_id } => {
                let name = Self::name(terminal_id);
                if self.open.remove(&name) {
                    info!("Closed terminal {}", name);
                } else {
                    debug!("Terminal {} was not open", name);
                }
                Ok(Effect::Done)
            }
            Action::ExecuteTerminalCommand {
                command,
                terminal_id,
                auto_execute,
            } => {
                let terminal = Self::name(terminal_id);
                self.open.insert(terminal.clone());

                if *auto_execute == Some(false) {
                    println!("[{}] $ {}", terminal, command);
                    return Ok(Effect::Done);
                }

                let (reply, completion) = Completion::channel();
                if self
                    .requests
                    .send(TerminalRequest {
                        terminal,
                        command: command.clone(),
                        reply,
                    })
                    .is_err()
                {
                    bail!("terminal thread is gone");
                }
                Ok(Effect::Pending(completion))
            }
            other => bail!("terminal effector cannot run {}", other.tag()),
        }
    }
}
