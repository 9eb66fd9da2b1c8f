//! Step records
//!
//! A step is a tagged record keyed by its `action` field. Known actions map to
//! a typed [`Action`] variant; anything else (unknown tag, payload of the
//! wrong shape) is kept verbatim as [`StepKind::Unrecognized`] so it survives
//! substitution and can be reported at dispatch time.
//!
//! ```json
//! { "action": "highlight", "path": "src/main.rs", "position": "3:8" }
//! { "action": "setState", "state": { "key": "color", "value": "red" } }
//! { "action": "snippet", "contentPath": "snippets/open.json", "args": { "FILE": "a.rs" } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use strum::{Display, EnumDiscriminants, EnumIter};

/// A single step of a demo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(flatten)]
    pub kind: StepKind,
}

impl Step {
    pub fn new(action: Action) -> Self {
        Self {
            disabled: false,
            kind: StepKind::Action(action),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// The typed action, if this step was recognized
    pub fn action(&self) -> Option<&Action> {
        match &self.kind {
            StepKind::Action(action) => Some(action),
            StepKind::Unrecognized(_) => None,
        }
    }

    /// The raw `action` tag as written in the demo file
    pub fn tag(&self) -> String {
        match &self.kind {
            StepKind::Action(action) => action.tag(),
            StepKind::Unrecognized(fields) => fields
                .get("action")
                .and_then(Value::as_str)
                .unwrap_or("<missing>")
                .to_string(),
        }
    }

    pub fn is_snippet(&self) -> bool {
        matches!(self.action(), Some(Action::Snippet { .. }))
    }
}

impl From<Action> for Step {
    fn from(action: Action) -> Self {
        Self::new(action)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.disabled {
            write!(f, "{} (disabled)", self.tag())
        } else {
            write!(f, "{}", self.tag())
        }
    }
}

/// Recognized action or the raw record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepKind {
    Action(Action),
    Unrecognized(Map<String, Value>),
}

/// Line number or `"start:end"` range, as written by presenters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Position {
    Line(u32),
    Spec(String),
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line(line) => write!(f, "{}", line),
            Self::Spec(spec) => write!(f, "{}", spec),
        }
    }
}

/// Target and content of an editor action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTarget {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub start_placeholder: Option<String>,
    #[serde(default)]
    pub end_placeholder: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub content_path: Option<String>,
    #[serde(default)]
    pub zoom: Option<u32>,
    #[serde(default)]
    pub highlight_whole_line: Option<bool>,
    #[serde(default)]
    pub line_insertion_delay: Option<u64>,
    #[serde(default)]
    pub insert_typing_mode: Option<String>,
    #[serde(default)]
    pub insert_typing_speed: Option<u64>,
}

impl EditTarget {
    pub fn at(path: impl Into<String>, position: Position) -> Self {
        Self {
            path: Some(path.into()),
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// Editor/host setting written by `setSetting`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingEntry {
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

/// Presenter state written by `setState`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    pub key: String,
    pub value: String,
}

/// Every action a step can request.
///
/// The engine handles `setState`, `waitForTimeout`, `waitForInput`, `pause`,
/// `snippet` and `runDemoById` itself; the rest go to registered effectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumDiscriminants)]
#[serde(tag = "action", rename_all = "camelCase")]
#[strum_discriminants(name(ActionKind), derive(Hash, Display, EnumIter))]
pub enum Action {
    // File
    #[serde(rename_all = "camelCase")]
    Create {
        path: String,
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        content_path: Option<String>,
    },
    Open {
        path: String,
    },
    Rename {
        path: String,
        dest: String,
    },
    DeleteFile {
        path: String,
    },
    Close,
    CloseAll,
    Copy {
        path: String,
        dest: String,
        #[serde(default)]
        overwrite: Option<bool>,
    },
    Move {
        path: String,
        dest: String,
        #[serde(default)]
        overwrite: Option<bool>,
    },

    // Previews
    MarkdownPreview {
        path: String,
    },
    ImagePreview {
        path: String,
        #[serde(default)]
        theme: Option<String>,
    },
    OpenSlide {
        path: String,
        #[serde(default)]
        slide: Option<u32>,
    },

    // Code
    Insert(EditTarget),
    Highlight(EditTarget),
    Replace(EditTarget),
    Delete(EditTarget),
    PositionCursor(EditTarget),
    Write(EditTarget),
    #[serde(rename_all = "camelCase")]
    ApplyPatch {
        path: String,
        #[serde(default)]
        patch: Option<String>,
        #[serde(default)]
        content_path: Option<String>,
    },
    Unselect {
        #[serde(default)]
        path: Option<String>,
    },
    Save,
    Format,

    // Settings
    SetSetting {
        setting: SettingEntry,
    },
    SetTheme {
        theme: String,
    },
    UnsetTheme,
    SetPresentationView,
    UnsetPresentationView,

    // Timing
    WaitForTimeout {
        #[serde(default)]
        timeout: Option<u64>,
    },
    WaitForInput {
        #[serde(default)]
        message: Option<String>,
    },
    Pause,

    // Host
    #[serde(rename = "executeVSCodeCommand", alias = "executeEditorCommand")]
    ExecuteEditorCommand {
        command: String,
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        args: Option<Value>,
    },
    ShowInfoMessage {
        message: String,
    },
    SetState {
        state: StateEntry,
    },
    OpenWebsite {
        url: String,
        #[serde(default, rename = "openInVSCode")]
        open_in_editor: Option<bool>,
    },

    // Terminal
    #[serde(rename_all = "camelCase")]
    OpenTerminal {
        #[serde(default)]
        terminal_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ExecuteTerminalCommand {
        command: String,
        #[serde(default)]
        terminal_id: Option<String>,
        #[serde(default)]
        auto_execute: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    CloseTerminal {
        #[serde(default)]
        terminal_id: Option<String>,
    },
    ExecuteScript {
        id: String,
        path: String,
        command: String,
        #[serde(default)]
        args: Option<Vec<String>>,
    },

    // Extensibility
    #[serde(rename_all = "camelCase")]
    Snippet {
        content_path: String,
        #[serde(default)]
        args: Option<Map<String, Value>>,
    },

    // External applications
    OpenPowerPoint,
    OpenKeynote,

    // Chat
    OpenCopilotChat,
    NewCopilotChat,
    AskCopilotChat {
        message: String,
    },
    EditCopilotChat {
        message: String,
    },
    AgentCopilotChat {
        message: String,
    },
    CloseCopilotChat,

    // Interaction
    #[serde(rename_all = "camelCase")]
    TypeText {
        content: String,
        #[serde(default)]
        insert_typing_speed: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    CopyToClipboard {
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        content_path: Option<String>,
    },
    PasteFromClipboard,
    PressEnter,
    PressTab,
    PressEscape,
    PressBackspace,

    // Demo sequencing
    RunDemoById {
        id: String,
    },
}

impl Action {
    /// The `action` tag this variant serializes with
    pub fn tag(&self) -> String {
        serde_json::to_value(self)
            .ok()
            .and_then(|value| value.get("action").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| ActionKind::from(self).to_string())
    }

    pub fn kind(&self) -> ActionKind {
        ActionKind::from(self)
    }
}

impl ActionKind {
    /// Actions the dispatcher resolves without an effector
    pub const fn is_engine_owned(self) -> bool {
        matches!(
            self,
            Self::SetState
                | Self::WaitForTimeout
                | Self::WaitForInput
                | Self::Pause
                | Self::Snippet
                | Self::RunDemoById
        )
    }
}
