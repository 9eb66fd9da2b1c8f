// Shared fixtures for the demotime integration tests
//
// The runner owns its collaborators, so everything a test wants to inspect
// afterwards is shared through Rc<RefCell<…>> handles.

#![allow(dead_code)]

use demotime::{
    Action, ActionKind, Demo, DemoFile, DemoRunner, Effect, Effector, EffectorRegistry,
    EngineConfig, ExecutionCursor, FileChoice, FixedClipboard, KeyValueStore, MemorySource,
    MemoryStore, Notice, NoticeLevel, Prompter, RunObserver, Step, Version,
};
use demotime::host::CursorUpdate;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

// =============================================================================
// Collaborators
// =============================================================================

/// Store whose contents stay readable after the runner took ownership
#[derive(Clone, Default)]
pub struct SharedStore(pub Rc<RefCell<MemoryStore>>);

impl KeyValueStore for SharedStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> anyhow::Result<()> {
        self.0.borrow_mut().set(key, value)
    }
}

/// Records every action it is handed; `executeScript` answers `out-<id>`
#[derive(Clone, Default)]
pub struct RecordingEffector {
    pub applied: Rc<RefCell<Vec<Action>>>,
    pub fail_on: Option<ActionKind>,
}

impl Effector for RecordingEffector {
    fn kinds(&self) -> Vec<ActionKind> {
        use strum::IntoEnumIterator;
        ActionKind::iter().filter(|k| !k.is_engine_owned()).collect()
    }

    fn apply(&mut self, action: &Action) -> anyhow::Result<Effect> {
        self.applied.borrow_mut().push(action.clone());
        if self.fail_on == Some(action.kind()) {
            anyhow::bail!("{} exploded", action.tag());
        }
        match action {
            Action::ExecuteScript { id, .. } => Ok(Effect::Output(format!("out-{}", id))),
            _ => Ok(Effect::Done),
        }
    }
}

#[derive(Clone, Default)]
pub struct RecordingObserver {
    pub notices: Rc<RefCell<Vec<Notice>>>,
    /// (file path, demo title, history length) per cursor change
    pub cursors: Rc<RefCell<Vec<(String, String, usize)>>>,
    pub cleared: Rc<RefCell<Vec<ExecutionCursor>>>,
}

impl RunObserver for RecordingObserver {
    fn cursor_changed(&self, update: &CursorUpdate<'_>) {
        self.cursors.borrow_mut().push((
            update.cursor.file_path.clone(),
            update.demo.title.clone(),
            update.cursor.history.len(),
        ));
    }

    fn cursor_cleared(&self, cursor: &ExecutionCursor) {
        self.cleared.borrow_mut().push(cursor.clone());
    }

    fn notify(&self, notice: &Notice) {
        self.notices.borrow_mut().push(notice.clone());
    }
}

/// Picks a fixed demo file and answers input prompts with a fixed text
#[derive(Clone, Default)]
pub struct ScriptedPrompter {
    pub file: Option<String>,
    pub input: Option<String>,
    pub asked: Rc<RefCell<usize>>,
}

impl Prompter for ScriptedPrompter {
    fn choose_demo_file(&mut self, choices: &[FileChoice]) -> Option<String> {
        let wanted = self.file.clone()?;
        choices
            .iter()
            .find(|choice| choice.path == wanted)
            .map(|choice| choice.path.clone())
    }

    fn ask_input(&mut self, _message: &str) -> Option<String> {
        *self.asked.borrow_mut() += 1;
        self.input.clone()
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub runner: DemoRunner,
    pub store: SharedStore,
    pub effector: RecordingEffector,
    pub observer: RecordingObserver,
    pub prompter: ScriptedPrompter,
}

impl Harness {
    pub fn new(source: MemorySource) -> Self {
        Self::with(source, EngineConfig::default(), None, ScriptedPrompter::default())
    }

    pub fn with(
        source: MemorySource,
        config: EngineConfig,
        fail_on: Option<ActionKind>,
        prompter: ScriptedPrompter,
    ) -> Self {
        let store = SharedStore::default();
        let effector = RecordingEffector {
            fail_on,
            ..RecordingEffector::default()
        };
        let observer = RecordingObserver::default();
        let runner = runner_over(config, &store, source, &effector, &observer, &prompter);

        Self {
            runner,
            store,
            effector,
            observer,
            prompter,
        }
    }

    /// Fresh runner over the same store, as after a restart
    pub fn reopen(&mut self, source: MemorySource) {
        self.runner = runner_over(
            EngineConfig::default(),
            &self.store,
            source,
            &self.effector,
            &self.observer,
            &self.prompter,
        );
    }

    pub fn applied(&self) -> Vec<Action> {
        self.effector.applied.borrow().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.observer
            .notices
            .borrow()
            .iter()
            .filter(|n| n.level == NoticeLevel::Error)
            .map(|n| n.message.clone())
            .collect()
    }

    /// Cursor history as (idx, title) pairs
    pub fn history(&self) -> Vec<(usize, String)> {
        self.runner
            .status()
            .history
            .into_iter()
            .map(|entry| (entry.idx, entry.title))
            .collect()
    }
}

fn runner_over(
    config: EngineConfig,
    store: &SharedStore,
    source: MemorySource,
    effector: &RecordingEffector,
    observer: &RecordingObserver,
    prompter: &ScriptedPrompter,
) -> DemoRunner {
    DemoRunner::new(config, Box::new(store.clone()), Box::new(source))
        .with_clipboard(Box::new(FixedClipboard::new("clipboard text")))
        .with_prompter(Box::new(prompter.clone()))
        .with_observer(Box::new(observer.clone()))
        .with_effectors(EffectorRegistry::new().with(Box::new(effector.clone())))
}

// =============================================================================
// Builders
// =============================================================================

pub fn demo_file(title: &str, demos: Vec<Demo>) -> DemoFile {
    DemoFile {
        title: title.to_string(),
        description: None,
        version: Some(Version::V2),
        demos,
    }
}

/// Demo with a single `showInfoMessage` step carrying its title
pub fn info_demo(title: &str) -> Demo {
    Demo::new(title).with_steps(vec![Step::new(Action::ShowInfoMessage {
        message: title.to_string(),
    })])
}

pub fn step(value: Value) -> Step {
    serde_json::from_value(value).unwrap()
}

/// [A, B(id b1), C(disabled), D]
pub fn abcd() -> DemoFile {
    demo_file(
        "demos",
        vec![
            info_demo("A"),
            info_demo("B").with_id("b1"),
            info_demo("C").disabled(),
            info_demo("D"),
        ],
    )
}
