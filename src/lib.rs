//! demotime library
//!
//! Sequencing and execution engine for scripted live-coding demos: a
//! persistent cursor over one or more demo files, layered variable
//! substitution, snippet expansion, and step dispatch to pluggable effectors.

pub mod cli;
pub mod config;
pub mod demo;
pub mod effectors;
pub mod engine;
pub mod error;
pub mod files;
pub mod host;
pub mod process_guard;
pub mod runner;
pub mod step;
pub mod store;

// Re-export main types for convenience
pub use config::EngineConfig;
pub use demo::{Demo, DemoFile, Notes, Version};
pub use effectors::{
    Completion, ConsoleEffector, Effect, Effector, EffectorRegistry, ScriptEffector,
    TerminalEffector,
};
pub use engine::cursor::{DemoRef, ExecutionCursor};
pub use engine::dispatcher::{RunReport, RunStatus, StepFailure};
pub use engine::sequencer::Upcoming;
pub use engine::variables::VariableSet;
pub use error::{DemoTimeError, Result};
pub use files::{DemoSource, MemorySource, WorkspaceFiles};
pub use host::{
    Clipboard, CursorUpdate, FileChoice, FixedClipboard, LogObserver, NoPrompter, Notice,
    NoticeLevel, Prompter, RunObserver, StdinPrompter, SystemClipboard,
};
pub use process_guard::{ChildRegistry, CommandProcessGroup, ProcessGuard, TrackedChild};
pub use runner::{DemoRunner, NavOutcome};
pub use step::{Action, ActionKind, EditTarget, Position, Step, StepKind};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
