// Step dispatch tests: substitution, snippets, suspension and follow-ups

mod common;

use common::{Harness, ScriptedPrompter, demo_file, info_demo, step};
use demotime::{
    Action, ActionKind, Clipboard, Demo, DemoTimeError, EngineConfig, FixedClipboard,
    MemorySource, NavOutcome, NoticeLevel, RunReport, RunStatus,
};
use serde_json::json;
use std::cell::Cell;
use std::rc::Rc;

const FILE: &str = ".demo/demos.json";

fn single(demos: Vec<Demo>) -> MemorySource {
    MemorySource::new().with_file(FILE, demo_file("demos", demos))
}

fn ran(outcome: NavOutcome) -> RunReport {
    match outcome {
        NavOutcome::Ran(report) => report,
        other => panic!("expected a demo to run, got {:?}", other),
    }
}

struct CountingClipboard(Rc<Cell<usize>>);

impl Clipboard for CountingClipboard {
    fn read(&self) -> anyhow::Result<String> {
        self.0.set(self.0.get() + 1);
        Ok("copied".to_string())
    }
}

fn info(message: &str) -> Action {
    Action::ShowInfoMessage {
        message: message.to_string(),
    }
}

// =============================================================================
// Substitution
// =============================================================================

#[test]
fn test_state_set_earlier_in_the_run_is_used() {
    let demo = Demo::new("state").with_steps(vec![
        step(json!({"action": "setState", "state": {"key": "color", "value": "red"}})),
        step(json!({"action": "showInfoMessage", "message": "color is {STATE_color}"})),
    ]);
    let mut h = Harness::new(single(vec![demo]));

    let report = ran(h.runner.advance(None).unwrap());
    assert_eq!(report.executed, 2);
    assert_eq!(h.applied(), vec![info("color is red")]);
}

#[test]
fn test_stale_state_does_not_win_over_a_new_value() {
    let first = Demo::new("blue").with_steps(vec![step(
        json!({"action": "setState", "state": {"key": "color", "value": "blue"}}),
    )]);
    let second = Demo::new("red").with_steps(vec![
        step(json!({"action": "showInfoMessage", "message": "{STATE_color}"})),
        step(json!({"action": "setState", "state": {"key": "color", "value": "red"}})),
        step(json!({"action": "showInfoMessage", "message": "{STATE_color}"})),
    ]);
    let mut h = Harness::new(single(vec![first, second]));

    ran(h.runner.advance(None).unwrap());
    ran(h.runner.advance(None).unwrap());
    assert_eq!(h.applied(), vec![info("blue"), info("red")]);
}

#[test]
fn test_script_output_feeds_later_steps() {
    let demo = Demo::new("script").with_steps(vec![
        step(json!({"action": "executeScript", "id": "ver", "path": "v.sh", "command": "sh"})),
        step(json!({"action": "showInfoMessage", "message": "version {SCRIPT_ver}"})),
    ]);
    let mut h = Harness::new(single(vec![demo]));

    ran(h.runner.advance(None).unwrap());
    assert_eq!(h.applied()[1], info("version out-ver"));
}

#[test]
fn test_ambient_variables() {
    let variables = [("NAME".to_string(), json!("Ada")), ("PORT".to_string(), json!(8080))]
        .into_iter()
        .collect();
    let demo = Demo::new("vars").with_steps(vec![
        step(json!({"action": "showInfoMessage", "message": "{NAME}:{PORT} {MISSING}"})),
        step(json!({"action": "typeText", "content": "{DT_CLIPBOARD}"})),
    ]);
    let mut h = Harness::new(single(vec![demo]).with_variables(variables));

    ran(h.runner.advance(None).unwrap());
    assert_eq!(
        h.applied(),
        vec![
            info("Ada:8080 {MISSING}"),
            Action::TypeText {
                content: "clipboard text".into(),
                insert_typing_speed: None
            },
        ]
    );
}

#[test]
fn test_clipboard_with_escape_sequences_is_typed() {
    let demo = Demo::new("colors").with_steps(vec![
        step(json!({"action": "typeText", "content": "{DT_CLIPBOARD}"})),
        step(json!({"action": "showInfoMessage", "message": "{DT_CLIPBOARD} again"})),
    ]);
    let mut h = Harness::new(single(vec![demo]));
    h.runner = h
        .runner
        .with_clipboard(Box::new(FixedClipboard::new("\u{1b}[32mok\u{1b}[0m")));

    let report = ran(h.runner.advance(None).unwrap());
    assert_eq!(report.executed, 2);
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(
        h.applied(),
        vec![
            Action::TypeText {
                content: "\u{1b}[32mok\u{1b}[0m".into(),
                insert_typing_speed: None
            },
            info("\u{1b}[32mok\u{1b}[0m again"),
        ]
    );
}

#[test]
fn test_control_characters_in_state_do_not_fail_the_step() {
    let demo = Demo::new("state").with_steps(vec![
        step(json!({"action": "setState", "state": {"key": "bell", "value": "ding\u{7}"}})),
        step(json!({"action": "showInfoMessage", "message": "{STATE_bell}"})),
    ]);
    let mut h = Harness::new(single(vec![demo]));

    let report = ran(h.runner.advance(None).unwrap());
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(h.applied(), vec![info("ding\u{7}")]);
}

#[test]
fn test_input_is_asked_once_per_run() {
    let demo = Demo::new("input").with_steps(vec![
        step(json!({"action": "showInfoMessage", "message": "{DT_INPUT}"})),
        step(json!({"action": "showInfoMessage", "message": "again {DT_INPUT}"})),
    ]);
    let prompter = ScriptedPrompter {
        input: Some("typed".into()),
        ..ScriptedPrompter::default()
    };
    let mut h = Harness::with(single(vec![demo]), EngineConfig::default(), None, prompter);

    ran(h.runner.advance(None).unwrap());
    assert_eq!(*h.prompter.asked.borrow(), 1);
    assert_eq!(h.applied(), vec![info("typed"), info("again typed")]);
}

#[test]
fn test_reset_forgets_state() {
    let set = Demo::new("set").with_steps(vec![step(
        json!({"action": "setState", "state": {"key": "k", "value": "v"}}),
    )]);
    let show = Demo::new("show").with_steps(vec![step(
        json!({"action": "showInfoMessage", "message": "{STATE_k}"}),
    )]);
    let mut h = Harness::new(single(vec![set, show]));

    ran(h.runner.advance(None).unwrap());
    h.runner.reset().unwrap();
    ran(h.runner.jump(FILE, 1).unwrap());
    assert_eq!(h.applied(), vec![info("{STATE_k}")]);
}

// =============================================================================
// Step handling
// =============================================================================

#[test]
fn test_disabled_and_unknown_steps_are_skipped() {
    let demo = Demo::new("mixed").with_steps(vec![
        step(json!({"action": "showInfoMessage", "message": "off", "disabled": true})),
        step(json!({"action": "doSomethingNew", "path": "x"})),
        step(json!({"action": "save"})),
    ]);
    let mut h = Harness::new(single(vec![demo]));

    let report = ran(h.runner.advance(None).unwrap());
    assert_eq!((report.executed, report.skipped), (1, 2));
    assert_eq!(h.applied(), vec![Action::Save]);

    let notices = h.observer.notices.borrow();
    assert!(notices
        .iter()
        .any(|n| n.level == NoticeLevel::Warning && n.message.contains("doSomethingNew")));
}

#[test]
fn test_disabled_steps_are_not_resolved() {
    let demo = Demo::new("quiet").with_steps(vec![
        step(json!({"action": "typeText", "content": "{DT_CLIPBOARD}", "disabled": true})),
        step(json!({"action": "showInfoMessage", "message": "{STATE_gone}", "disabled": true})),
        Action::Save.into(),
    ]);
    let reads = Rc::new(Cell::new(0));
    let mut h = Harness::new(single(vec![demo]));
    h.runner = h.runner.with_clipboard(Box::new(CountingClipboard(reads.clone())));

    let report = ran(h.runner.advance(None).unwrap());
    assert_eq!((report.executed, report.skipped), (1, 2));
    assert!(report.failures.is_empty());
    assert_eq!(h.applied(), vec![Action::Save]);
    // only the run-start resolution touched the clipboard
    assert_eq!(reads.get(), 1);
}

#[test]
fn test_failing_step_does_not_stop_the_run() {
    let demo = Demo::new("fails").with_steps(vec![
        Action::Save.into(),
        info("boom").into(),
        Action::Format.into(),
    ]);
    let mut h = Harness::with(
        single(vec![demo]),
        EngineConfig::default(),
        Some(ActionKind::ShowInfoMessage),
        ScriptedPrompter::default(),
    );

    let report = ran(h.runner.advance(None).unwrap());
    assert_eq!(report.executed, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert!(report.failures[0].message.contains("exploded"));
    assert_eq!(h.applied().len(), 3);
    assert_eq!(h.errors().len(), 1);
}

#[test]
fn test_notes_are_announced() {
    let demo: Demo = serde_json::from_value(json!({
        "title": "with notes",
        "notes": {"path": "notes/intro.md", "showOnTrigger": true},
        "steps": []
    }))
    .unwrap();
    let mut h = Harness::new(single(vec![demo]));

    ran(h.runner.advance(None).unwrap());
    let notices = h.observer.notices.borrow();
    assert!(notices.iter().any(|n| n.message.contains("notes/intro.md")));
}

// =============================================================================
// Snippets
// =============================================================================

#[test]
fn test_snippet_expands_with_args() {
    let source = single(vec![Demo::new("snip").with_steps(vec![step(json!({
        "action": "snippet",
        "contentPath": "snippets/open.json",
        "args": {"FILE": "src/lib.rs"}
    }))])])
    .with_snippet(
        "snippets/open.json",
        r#"[{"action":"open","path":"{FILE}"},{"action":"save"}]"#,
    );
    let mut h = Harness::new(source);

    let report = ran(h.runner.advance(None).unwrap());
    assert_eq!(report.executed, 2);
    assert_eq!(
        h.applied(),
        vec![Action::Open { path: "src/lib.rs".into() }, Action::Save]
    );
}

#[test]
fn test_missing_snippet_aborts_before_any_step() {
    let source = single(vec![Demo::new("broken").with_steps(vec![
        Action::Save.into(),
        step(json!({"action": "snippet", "contentPath": "snippets/gone.json"})),
    ])]);
    let mut h = Harness::new(source);

    let err = h.runner.advance(None).unwrap_err();
    assert!(matches!(err, DemoTimeError::SnippetUnavailable { ref path } if path == "snippets/gone.json"));
    assert!(h.applied().is_empty());
    assert_eq!(h.errors().len(), 1);
    // the cursor already moved
    assert_eq!(h.history().len(), 1);
}

// =============================================================================
// Suspension
// =============================================================================

#[test]
fn test_wait_for_input_suspends_until_resumed() {
    let demo = Demo::new("paused").with_steps(vec![
        info("before").into(),
        step(json!({"action": "waitForInput", "message": "press a key"})),
        info("after").into(),
    ]);
    let mut h = Harness::new(single(vec![demo, info_demo("next")]));

    let report = ran(h.runner.advance(None).unwrap());
    assert_eq!(
        report.status,
        RunStatus::Suspended {
            at: 1,
            message: Some("press a key".into())
        }
    );
    assert!(h.runner.is_suspended());
    assert_eq!(h.applied(), vec![info("before")]);

    assert_eq!(h.runner.advance(None).unwrap(), NavOutcome::Busy);

    let report = ran(h.runner.resume().unwrap());
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.executed, 3);
    assert!(!h.runner.is_suspended());
    assert_eq!(h.applied(), vec![info("before"), info("after")]);

    assert_eq!(h.runner.resume().unwrap(), NavOutcome::NothingSuspended);
    assert_eq!(ran(h.runner.advance(None).unwrap()).demo_title, "next");
}

#[test]
fn test_reset_abandons_a_suspended_run() {
    let demo = Demo::new("paused").with_steps(vec![
        step(json!({"action": "pause"})),
        info("never").into(),
    ]);
    let mut h = Harness::new(single(vec![demo]));

    ran(h.runner.advance(None).unwrap());
    h.runner.reset().unwrap();
    assert!(!h.runner.is_suspended());
    assert_eq!(h.runner.resume().unwrap(), NavOutcome::NothingSuspended);
    assert!(h.applied().is_empty());
}

// =============================================================================
// runDemoById
// =============================================================================

#[test]
fn test_run_demo_by_id_chains_after_the_current_demo() {
    let source = single(vec![
        Demo::new("A").with_steps(vec![
            step(json!({"action": "runDemoById", "id": "c"})),
            info("A").into(),
        ]),
        info_demo("B"),
        info_demo("C").with_id("c"),
    ]);
    let mut h = Harness::new(source);

    let report = ran(h.runner.advance(None).unwrap());
    assert_eq!(report.demo_title, "C");
    assert_eq!(h.applied(), vec![info("A"), info("C")]);
    assert_eq!(h.history(), vec![(0, "A".to_string()), (2, "C".to_string())]);
    assert_eq!(h.runner.advance(None).unwrap(), NavOutcome::Exhausted);
}

#[test]
fn test_run_demo_by_id_cycle_is_capped() {
    let source = single(vec![Demo::new("loop").with_id("loop").with_steps(vec![
        info("tick").into(),
        step(json!({"action": "runDemoById", "id": "loop"})),
    ])]);
    let mut h = Harness::new(source);

    ran(h.runner.advance(None).unwrap());
    assert_eq!(h.applied().len(), demotime::runner::MAX_FOLLOW_UPS + 1);
    let notices = h.observer.notices.borrow();
    assert!(notices
        .iter()
        .any(|n| n.level == NoticeLevel::Warning && n.message.contains("chain stopped")));
}

#[test]
fn test_follow_up_waits_for_a_suspended_run() {
    let source = single(vec![
        Demo::new("A").with_steps(vec![
            step(json!({"action": "runDemoById", "id": "b"})),
            step(json!({"action": "pause"})),
        ]),
        info_demo("B").with_id("b"),
    ]);
    let mut h = Harness::new(source);

    let report = ran(h.runner.advance(None).unwrap());
    assert!(report.is_suspended());
    assert!(h.applied().is_empty());

    let report = ran(h.runner.resume().unwrap());
    assert_eq!(report.demo_title, "B");
    assert_eq!(h.applied(), vec![info("B")]);
}
