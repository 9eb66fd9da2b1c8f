//! Snippet expansion
//!
//! A `snippet` step is a macro: the referenced file holds a step list whose
//! placeholders are filled from the step's own `args` first and from the
//! ambient variables second. Expansion is one level deep; a snippet step
//! produced by a snippet is left for the dispatcher to report.

use crate::demo::Version;
use crate::engine::variables::{VariableSet, substitute};
use crate::error::{DemoTimeError, Result};
use crate::files::{DemoSource, parse_document};
use crate::host::Prompter;
use crate::step::{Action, Step};
use tracing::debug;

pub struct SnippetExpander<'a> {
    source: &'a dyn DemoSource,
    version: Version,
}

impl<'a> SnippetExpander<'a> {
    /// Expander for steps of a file with the given format version
    pub fn new(source: &'a dyn DemoSource, version: Version) -> Self {
        Self { source, version }
    }

    /// Replace every active snippet step with the steps it expands to.
    ///
    /// Fails as a whole when any referenced snippet is missing or does not
    /// parse into a step list.
    pub fn expand(
        &self,
        steps: Vec<Step>,
        ambient: &mut VariableSet,
        prompter: &mut dyn Prompter,
    ) -> Result<Vec<Step>> {
        let mut expanded = Vec::with_capacity(steps.len());

        for step in steps {
            match (&step.disabled, step.action()) {
                (false, Some(Action::Snippet { content_path, args })) => {
                    let inner = self.expand_one(content_path, args.as_ref(), ambient, prompter)?;
                    debug!("Snippet {} expanded to {} steps", content_path, inner.len());
                    expanded.extend(inner);
                }
                _ => expanded.push(step),
            }
        }

        Ok(expanded)
    }

    fn expand_one(
        &self,
        content_path: &str,
        args: Option<&serde_json::Map<String, serde_json::Value>>,
        ambient: &mut VariableSet,
        prompter: &mut dyn Prompter,
    ) -> Result<Vec<Step>> {
        let raw = self
            .source
            .load_snippet(content_path, self.version)
            .ok_or_else(|| DemoTimeError::SnippetUnavailable {
                path: content_path.to_string(),
            })?;

        let mut text = match args {
            Some(args) => substitute(&raw, &VariableSet::from_args(args), false),
            None => raw,
        };
        ambient.prompt_for_input(&text, prompter);
        text = substitute(&text, &ambient.without_run_outputs(), true);

        parse_document::<Vec<Step>>(content_path, &text).map_err(|e| {
            DemoTimeError::SnippetInvalid {
                path: content_path.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::MemorySource;
    use crate::host::NoPrompter;
    use serde_json::json;

    fn snippet_step(path: &str, args: serde_json::Value) -> Step {
        serde_json::from_value(json!({"action": "snippet", "contentPath": path, "args": args}))
            .unwrap()
    }

    #[test]
    fn test_snippet_is_spliced_in_place() {
        let source = MemorySource::new().with_snippet(
            "snippets/open.json",
            r#"[{"action":"open","path":"{FILE}"},{"action":"highlight","path":"{FILE}","position":"{LINES}"}]"#,
        );
        let steps = vec![
            Step::new(Action::Save),
            snippet_step("snippets/open.json", json!({"FILE": "src/lib.rs"})),
            Step::new(Action::Close),
        ];
        let mut ambient = VariableSet::new();
        ambient.insert("LINES", "1:4");

        let out = SnippetExpander::new(&source, Version::V2)
            .expand(steps, &mut ambient, &mut NoPrompter)
            .unwrap();

        assert_eq!(out.len(), 4);
        assert_eq!(out[0].action(), Some(&Action::Save));
        assert_eq!(out[1].action(), Some(&Action::Open { path: "src/lib.rs".into() }));
        match out[2].action() {
            Some(Action::Highlight(target)) => {
                assert_eq!(target.path.as_deref(), Some("src/lib.rs"));
                assert_eq!(target.position, Some(crate::step::Position::Spec("1:4".into())));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(out[3].action(), Some(&Action::Close));
    }

    #[test]
    fn test_args_win_over_ambient_and_skip_reserved() {
        let source = MemorySource::new().with_snippet(
            "s.json",
            r#"[{"action":"typeText","content":"{NAME} {DT_CLIPBOARD}"}]"#,
        );
        let mut ambient = VariableSet::new();
        ambient.insert("NAME", "ambient");
        ambient.insert("DT_CLIPBOARD", "clip");

        let out = SnippetExpander::new(&source, Version::V2)
            .expand(
                vec![snippet_step("s.json", json!({"NAME": "arg", "DT_CLIPBOARD": "nope"}))],
                &mut ambient,
                &mut NoPrompter,
            )
            .unwrap();

        assert_eq!(
            out[0].action(),
            Some(&Action::TypeText { content: "arg clip".into(), insert_typing_speed: None })
        );
    }

    #[test]
    fn test_numeric_placeholder_outside_strings() {
        let source = MemorySource::new()
            .with_snippet("wait.json", r#"[{"action":"waitForTimeout","timeout":{MS}}]"#);
        let out = SnippetExpander::new(&source, Version::V2)
            .expand(
                vec![snippet_step("wait.json", json!({"MS": 250}))],
                &mut VariableSet::new(),
                &mut NoPrompter,
            )
            .unwrap();
        assert_eq!(out[0].action(), Some(&Action::WaitForTimeout { timeout: Some(250) }));
    }

    #[test]
    fn test_missing_snippet_fails() {
        let source = MemorySource::new();
        let err = SnippetExpander::new(&source, Version::V2)
            .expand(
                vec![snippet_step("gone.json", json!({}))],
                &mut VariableSet::new(),
                &mut NoPrompter,
            )
            .unwrap_err();
        assert!(matches!(err, DemoTimeError::SnippetUnavailable { ref path } if path == "gone.json"));
    }

    #[test]
    fn test_invalid_snippet_fails() {
        let source = MemorySource::new().with_snippet("bad.json", r#"{"action":"save"}"#);
        let err = SnippetExpander::new(&source, Version::V2)
            .expand(
                vec![snippet_step("bad.json", json!(null))],
                &mut VariableSet::new(),
                &mut NoPrompter,
            )
            .unwrap_err();
        assert!(matches!(err, DemoTimeError::SnippetInvalid { .. }));
    }

    #[test]
    fn test_disabled_snippet_is_not_loaded() {
        let source = MemorySource::new();
        let step = snippet_step("gone.json", json!({})).disabled();
        let out = SnippetExpander::new(&source, Version::V2)
            .expand(vec![step.clone()], &mut VariableSet::new(), &mut NoPrompter)
            .unwrap();
        assert_eq!(out, vec![step]);
    }
}
