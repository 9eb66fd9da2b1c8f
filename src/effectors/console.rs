//! Console effector
//!
//! Stands in for an editor host: every action is described on stdout instead
//! of being performed. The CLI routes all host actions here, and every action
//! in `--dry-run` mode.

use crate::effectors::{Effect, Effector};
use crate::step::{Action, ActionKind, EditTarget};
use anyhow::Result;
use std::io::Write;
use strum::IntoEnumIterator;

pub struct ConsoleEffector {
    out: Box<dyn Write>,
    kinds: Vec<ActionKind>,
}

impl ConsoleEffector {
    /// Describe every action kind an effector may take
    pub fn new() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write>) -> Self {
        Self {
            out,
            kinds: ActionKind::iter().filter(|k| !k.is_engine_owned()).collect(),
        }
    }

    /// Restrict the kinds this effector registers for
    pub fn only(mut self, kinds: Vec<ActionKind>) -> Self {
        self.kinds = kinds;
        self
    }
}

impl Default for ConsoleEffector {
    fn default() -> Self {
        Self::new()
    }
}

fn target(t: &EditTarget) -> String {
    let mut text = t.path.clone().unwrap_or_else(|| "<active editor>".to_string());
    if let Some(position) = &t.position {
        text.push_str(&format!(" @ {}", position));
    } else if let (Some(start), Some(end)) = (&t.start_placeholder, &t.end_placeholder) {
        text.push_str(&format!(" between {:?} and {:?}", start, end));
    }
    text
}

fn content(t: &EditTarget) -> String {
    match (&t.content, &t.content_path) {
        (Some(content), _) => format!("{} chars", content.chars().count()),
        (None, Some(path)) => format!("content of {}", path),
        (None, None) => "no content".to_string(),
    }
}

/// One-line description of what the action would do
pub fn describe(action: &Action) -> String {
    match action {
        Action::Create { path, .. } => format!("create {}", path),
        Action::Open { path } => format!("open {}", path),
        Action::Rename { path, dest } => format!("rename {} to {}", path, dest),
        Action::DeleteFile { path } => format!("delete {}", path),
        Action::Copy { path, dest, .. } => format!("copy {} to {}", path, dest),
        Action::Move { path, dest, .. } => format!("move {} to {}", path, dest),
        Action::MarkdownPreview { path } => format!("preview {}", path),
        Action::ImagePreview { path, .. } => format!("show image {}", path),
        Action::OpenSlide { path, slide } => match slide {
            Some(slide) => format!("show slide {} of {}", slide, path),
            None => format!("show slides {}", path),
        },
        Action::Insert(t) => format!("insert {} into {}", content(t), target(t)),
        Action::Replace(t) => format!("replace {} with {}", target(t), content(t)),
        Action::Write(t) => format!("write {} to {}", content(t), target(t)),
        Action::Highlight(t) => format!("highlight {}", target(t)),
        Action::Delete(t) => format!("delete {}", target(t)),
        Action::PositionCursor(t) => format!("move cursor to {}", target(t)),
        Action::ApplyPatch { path, .. } => format!("patch {}", path),
        Action::SetSetting { setting } => format!("set {} = {}", setting.key, setting.value),
        Action::SetTheme { theme } => format!("switch theme to {}", theme),
        Action::ExecuteEditorCommand { command, .. } => format!("editor command {}", command),
        Action::ShowInfoMessage { message } => format!("info: {}", message),
        Action::OpenWebsite { url, .. } => format!("open {}", url),
        Action::OpenTerminal { terminal_id } => {
            format!("open terminal {}", terminal_id.as_deref().unwrap_or("default"))
        }
        Action::ExecuteTerminalCommand { command, .. } => format!("$ {}", command),
        Action::CloseTerminal { terminal_id } => {
            format!("close terminal {}", terminal_id.as_deref().unwrap_or("default"))
        }
        Action::ExecuteScript { id, path, command, .. } => {
            format!("run {} {} as {}", command, path, id)
        }
        Action::AskCopilotChat { message }
        | Action::EditCopilotChat { message }
        | Action::AgentCopilotChat { message } => format!("{}: {}", action.tag(), message),
        Action::TypeText { content, .. } => format!("type {:?}", content),
        Action::CopyToClipboard { content: Some(content), .. } => {
            format!("copy {:?} to the clipboard", content)
        }
        other => other.tag(),
    }
}

impl Effector for ConsoleEffector {
    fn kinds(&self) -> Vec<ActionKind> {
        self.kinds.clone()
    }

    fn apply(&mut self, action: &Action) -> Result<Effect> {
        writeln!(self.out, "  > {}", describe(action))?;
        Ok(Effect::Done)
    }
}
