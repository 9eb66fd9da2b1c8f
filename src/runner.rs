//! Demo runner
//!
//! Ties the engine together behind the navigation triggers. Requests are
//! serialized by `&mut self`; while a run is suspended every navigation
//! request reports [`NavOutcome::Busy`] until it is resumed or reset.

use crate::config::EngineConfig;
use crate::demo::{DemoFile, Version};
use crate::effectors::EffectorRegistry;
use crate::engine::Collaborators;
use crate::engine::cursor::{ExecutionCursor, load_cursor};
use crate::engine::dispatcher::{RunReport, StepDispatcher, Suspension};
use crate::engine::file_order::FileSequencer;
use crate::engine::sequencer::{Chosen, DemoSequencer, Selection, Upcoming};
use crate::engine::snippets::SnippetExpander;
use crate::engine::variables::{VariableResolver, VariableSet, substitute};
use crate::error::{DemoTimeError, Result};
use crate::files::{DemoSource, WorkspaceFiles};
use crate::host::{
    Clipboard, CursorUpdate, FixedClipboard, LogObserver, NoPrompter, Notice, Prompter,
    RunObserver,
};
use crate::step::Step;
use crate::store::{JsonFileStore, KeyValueStore};
use std::collections::VecDeque;
use std::path::Path;
use tracing::{debug, info, warn};

/// Longest chain of `runDemoById` follow-ups run for one request
pub const MAX_FOLLOW_UPS: usize = 32;

/// Result of a navigation trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavOutcome {
    /// A demo ran (the last one, when `runDemoById` chained several)
    Ran(RunReport),
    Exhausted,
    AtStart,
    NoDemoFile,
    UnknownDemo(String),
    PreviousDisabled,
    /// A suspended run is waiting to be resumed
    Busy,
    /// `resume` without a suspended run
    NothingSuspended,
}

pub struct DemoRunner {
    config: EngineConfig,
    store: Box<dyn KeyValueStore>,
    source: Box<dyn DemoSource>,
    clipboard: Box<dyn Clipboard>,
    prompter: Box<dyn Prompter>,
    observer: Box<dyn RunObserver>,
    effectors: EffectorRegistry,
    suspension: Option<Suspension>,
    follow_ups: VecDeque<String>,
}

impl DemoRunner {
    pub fn new(
        config: EngineConfig,
        store: Box<dyn KeyValueStore>,
        source: Box<dyn DemoSource>,
    ) -> Self {
        Self {
            config,
            store,
            source,
            clipboard: Box::new(FixedClipboard::unavailable()),
            prompter: Box::new(NoPrompter),
            observer: Box::new(LogObserver),
            effectors: EffectorRegistry::new(),
            suspension: None,
            follow_ups: VecDeque::new(),
        }
    }

    /// Runner over the demo folder and state file of `workspace`
    pub fn open_workspace(workspace: &Path, config: EngineConfig) -> Result<Self> {
        config.validate().map_err(|e| DemoTimeError::config(format!("{:#}", e)))?;
        let store = JsonFileStore::open(config.state_path(workspace))?;
        let source = WorkspaceFiles::new(workspace, &config.demo_folder, &config.variables_file);
        info!("Opened workspace {:?}", workspace);
        Ok(Self::new(config, Box::new(store), Box::new(source)))
    }

    pub fn with_clipboard(mut self, clipboard: Box<dyn Clipboard>) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn with_prompter(mut self, prompter: Box<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_effectors(mut self, effectors: EffectorRegistry) -> Self {
        self.effectors = effectors;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_suspended(&self) -> bool {
        self.suspension.is_some()
    }

    /// The persisted cursor
    pub fn status(&self) -> ExecutionCursor {
        load_cursor(&*self.store)
    }

    /// Demo files in presentation order; `None` for files that do not load
    pub fn list(&self) -> Vec<(String, Option<DemoFile>)> {
        FileSequencer::new(self.source.list_demo_files())
            .files()
            .iter()
            .map(|path| (path.clone(), self.source.load_demo_file(path)))
            .collect()
    }

    pub fn peek_next(&mut self) -> Option<Upcoming> {
        self.sequencer().peek_next()
    }

    /// Run the next demo, optionally starting from a specific file
    pub fn advance(&mut self, requested: Option<&str>) -> Result<NavOutcome> {
        self.navigate(|seq| seq.advance(requested))
    }

    pub fn retreat(&mut self) -> Result<NavOutcome> {
        self.navigate(|seq| seq.retreat())
    }

    pub fn run_by_id(&mut self, id: &str) -> Result<NavOutcome> {
        self.navigate(|seq| seq.run_by_id(id))
    }

    pub fn jump(&mut self, file_path: &str, idx: usize) -> Result<NavOutcome> {
        self.navigate(|seq| seq.jump(file_path, idx))
    }

    /// Continue a suspended run
    pub fn resume(&mut self) -> Result<NavOutcome> {
        let Some(suspension) = self.suspension.take() else {
            return Ok(NavOutcome::NothingSuspended);
        };
        let already_queued = suspension.report.follow_ups.len();
        let timeout = self.config.command_timeout();
        let (mut collab, effectors) = self.split();
        let dispatched = StepDispatcher::new(effectors, timeout).resume(suspension, &mut collab);
        self.suspension = dispatched.suspension;
        self.settle(dispatched.report, already_queued)
    }

    /// Forget the cursor, persisted variables and any suspended run
    pub fn reset(&mut self) -> Result<()> {
        if self.suspension.take().is_some() {
            info!("Abandoning suspended run");
        }
        self.follow_ups.clear();
        self.sequencer().reset()?;
        self.observer.cursor_cleared(&load_cursor(&*self.store));
        self.observer.notify(&Notice::info("Demo cursor reset"));
        Ok(())
    }

    fn sequencer(&mut self) -> DemoSequencer<'_> {
        DemoSequencer::new(
            &*self.source,
            &mut *self.store,
            &mut *self.prompter,
        )
        .previous_enabled(self.config.previous_enabled)
    }

    fn split(&mut self) -> (Collaborators<'_>, &mut EffectorRegistry) {
        let Self {
            store,
            source,
            clipboard,
            prompter,
            observer,
            effectors,
            ..
        } = self;
        let collab = Collaborators {
            store: &mut **store,
            source: &**source,
            clipboard: &**clipboard,
            prompter: &mut **prompter,
            observer: &**observer,
        };
        (collab, effectors)
    }

    fn navigate<F>(&mut self, pick: F) -> Result<NavOutcome>
    where
        F: FnOnce(&mut DemoSequencer<'_>) -> Result<Selection>,
    {
        if self.suspension.is_some() {
            info!("A demo is waiting to be resumed, ignoring the request");
            return Ok(NavOutcome::Busy);
        }

        let selection = {
            let mut seq = self.sequencer();
            pick(&mut seq)?
        };

        match selection {
            Selection::Chosen(chosen) => {
                let report = self.execute(*chosen)?;
                self.settle(report, 0)
            }
            Selection::Exhausted => Ok(NavOutcome::Exhausted),
            Selection::AtStart => Ok(NavOutcome::AtStart),
            Selection::NoDemoFile => Ok(NavOutcome::NoDemoFile),
            Selection::UnknownDemo(id) => Ok(NavOutcome::UnknownDemo(id)),
            Selection::PreviousDisabled => Ok(NavOutcome::PreviousDisabled),
        }
    }

    /// Queue the report's new follow-ups and run them until the queue is
    /// empty or a run suspends.
    fn settle(&mut self, report: RunReport, already_queued: usize) -> Result<NavOutcome> {
        self.follow_ups
            .extend(report.follow_ups.iter().skip(already_queued).cloned());

        let mut last = report;
        let mut chained = 0;
        while self.suspension.is_none() {
            let Some(id) = self.follow_ups.pop_front() else {
                break;
            };
            if chained == MAX_FOLLOW_UPS {
                warn!("Stopping runDemoById chain after {} demos", MAX_FOLLOW_UPS);
                self.observer.notify(&Notice::warning(format!(
                    "Demo chain stopped after {} runs",
                    MAX_FOLLOW_UPS
                )));
                self.follow_ups.clear();
                break;
            }
            chained += 1;

            match self.sequencer().run_by_id(&id)? {
                Selection::Chosen(chosen) => {
                    last = self.execute(*chosen)?;
                    self.follow_ups.extend(last.follow_ups.iter().cloned());
                }
                other => {
                    warn!("runDemoById {} did not run: {:?}", id, other);
                    self.observer
                        .notify(&Notice::warning(format!("Demo \"{}\" was not found", id)));
                }
            }
        }

        Ok(NavOutcome::Ran(last))
    }

    /// Substitute, expand and dispatch the chosen demo's steps. The cursor is
    /// already persisted at this point.
    fn execute(&mut self, chosen: Chosen) -> Result<RunReport> {
        let upcoming = self.sequencer().peek_next();
        let timeout = self.config.command_timeout();
        let (mut collab, effectors) = self.split();

        let demo = chosen.demo();
        collab.observer.cursor_changed(&CursorUpdate {
            cursor: &chosen.cursor,
            demo,
            next: upcoming.as_ref().map(|u| (u.file_path.as_str(), &u.demo)),
        });
        if let Some(notes) = &demo.notes {
            if notes.show_on_trigger {
                collab
                    .observer
                    .notify(&Notice::info(format!("Notes: {}", notes.path)));
            }
        }

        let mut variables =
            VariableResolver::new(&*collab.store, collab.source, collab.clipboard).resolve();
        let steps = match prepare(
            demo.steps.clone(),
            chosen.file.version(),
            &mut variables,
            &mut collab,
        ) {
            Ok(steps) => steps,
            Err(e) => {
                collab.observer.notify(&Notice::error(e.to_string()));
                return Err(e);
            }
        };
        debug!("Dispatching {} steps of \"{}\"", steps.len(), demo.title);

        let report = RunReport::new(&chosen.file_path, chosen.idx, &demo.title);
        let dispatched = StepDispatcher::new(effectors, timeout).run(steps, variables, report, &mut collab);
        self.suspension = dispatched.suspension;
        Ok(dispatched.report)
    }
}

/// Ambient substitution over the whole step list, then snippet expansion.
/// State and script placeholders are left for the dispatcher.
fn prepare(
    steps: Vec<Step>,
    version: Version,
    variables: &mut VariableSet,
    collab: &mut Collaborators<'_>,
) -> Result<Vec<Step>> {
    let text = serde_json::to_string(&steps)?;
    variables.prompt_for_input(&text, &mut *collab.prompter);
    let text = substitute(&text, &variables.without_run_outputs(), true);
    let steps: Vec<Step> =
        serde_json::from_str(&text).map_err(|e| DemoTimeError::substitution(e.to_string()))?;

    SnippetExpander::new(collab.source, version).expand(steps, variables, &mut *collab.prompter)
}
