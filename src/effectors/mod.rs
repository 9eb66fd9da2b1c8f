//! Step effectors
//!
//! The engine never performs a step's effect itself. Every action it does not
//! own is handed to the [`Effector`] registered for its [`ActionKind`].

pub mod console;
pub mod script;
pub mod terminal;

use crate::step::{Action, ActionKind};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tracing::warn;

pub use console::ConsoleEffector;
pub use script::ScriptEffector;
pub use terminal::TerminalEffector;

/// Result of applying an action
#[derive(Debug)]
pub enum Effect {
    Done,
    /// Captured output (stored as `SCRIPT_<id>` for `executeScript`)
    Output(String),
    /// Still running; the dispatcher waits on the completion, bounded
    Pending(Completion),
}

/// Finish signal of a pending effect
#[derive(Debug)]
pub struct Completion {
    rx: Receiver<std::result::Result<String, String>>,
}

/// What waiting on a [`Completion`] produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finished {
    Output(String),
    Failed(String),
    TimedOut,
    /// The worker went away without reporting
    Abandoned,
}

impl Completion {
    /// A completion and the sender that resolves it
    pub fn channel() -> (Sender<std::result::Result<String, String>>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }

    pub fn wait(self, timeout: Duration) -> Finished {
        match self.rx.recv_timeout(timeout) {
            Ok(Ok(output)) => Finished::Output(output),
            Ok(Err(message)) => Finished::Failed(message),
            Err(RecvTimeoutError::Timeout) => Finished::TimedOut,
            Err(RecvTimeoutError::Disconnected) => Finished::Abandoned,
        }
    }
}

/// Performs the effect of one or more action kinds
pub trait Effector {
    /// Kinds this effector wants to receive
    fn kinds(&self) -> Vec<ActionKind>;

    fn apply(&mut self, action: &Action) -> Result<Effect>;
}

/// Action kind → effector table
#[derive(Default)]
pub struct EffectorRegistry {
    effectors: Vec<Box<dyn Effector>>,
    routes: HashMap<ActionKind, usize>,
}

impl EffectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route every kind the effector declares to it; later registrations
    /// take over kinds claimed earlier.
    pub fn register(&mut self, effector: Box<dyn Effector>) {
        let slot = self.effectors.len();
        for kind in effector.kinds() {
            if kind.is_engine_owned() {
                warn!("Effectors cannot take over engine action {}", kind);
                continue;
            }
            self.routes.insert(kind, slot);
        }
        self.effectors.push(effector);
    }

    pub fn with(mut self, effector: Box<dyn Effector>) -> Self {
        self.register(effector);
        self
    }

    pub fn handles(&self, kind: ActionKind) -> bool {
        self.routes.contains_key(&kind)
    }

    pub fn get_mut(&mut self, kind: ActionKind) -> Option<&mut (dyn Effector + 'static)> {
        let slot = *self.routes.get(&kind)?;
        self.effectors.get_mut(slot).map(|effector| effector.as_mut())
    }
}
