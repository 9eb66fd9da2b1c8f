//! Host collaborators
//!
//! Clipboard access, interactive prompts and run notifications. The engine
//! only sees the traits; the CLI wires in the system/stdin/log versions.

use crate::demo::Demo;
use crate::engine::cursor::ExecutionCursor;
use anyhow::{Context, Result, bail};
use std::io::{self, BufRead, Write};
use std::process::{Command, Stdio};
use strum::Display;
use tracing::{debug, error, info, warn};

/// Read access to the system clipboard
pub trait Clipboard {
    fn read(&self) -> Result<String>;
}

/// Clipboard backed by the platform paste utilities.
///
/// The first tool that exits successfully wins.
#[derive(Debug, Clone, Default)]
pub struct SystemClipboard;

impl SystemClipboard {
    const CANDIDATES: &'static [(&'static str, &'static [&'static str])] = &[
        ("pbpaste", &[]),
        ("wl-paste", &["--no-newline"]),
        ("xclip", &["-selection", "clipboard", "-o"]),
        ("xsel", &["--clipboard", "--output"]),
    ];
}

impl Clipboard for SystemClipboard {
    fn read(&self) -> Result<String> {
        for (program, args) in Self::CANDIDATES {
            let output = match Command::new(program)
                .args(*args)
                .stdin(Stdio::null())
                .stderr(Stdio::null())
                .output()
            {
                Ok(output) => output,
                Err(_) => continue,
            };
            if output.status.success() {
                debug!("Clipboard read through {}", program);
                return String::from_utf8(output.stdout)
                    .with_context(|| format!("{} returned non UTF-8 text", program));
            }
        }
        bail!("no clipboard utility available")
    }
}

/// Clipboard with a preset value
#[derive(Debug, Clone, Default)]
pub struct FixedClipboard {
    text: Option<String>,
}

impl FixedClipboard {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()) }
    }

    /// A clipboard whose every read fails
    pub fn unavailable() -> Self {
        Self { text: None }
    }
}

impl Clipboard for FixedClipboard {
    fn read(&self) -> Result<String> {
        match &self.text {
            Some(text) => Ok(text.clone()),
            None => bail!("clipboard unavailable"),
        }
    }
}

/// A demo file offered to the presenter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChoice {
    pub path: String,
    pub title: String,
}

/// Questions the engine may need answered mid-request
pub trait Prompter {
    /// Pick the demo file to start with when none is active
    fn choose_demo_file(&mut self, choices: &[FileChoice]) -> Option<String>;

    /// Ask for free text (the `DT_INPUT` variable)
    fn ask_input(&mut self, message: &str) -> Option<String>;
}

/// Never answers
#[derive(Debug, Clone, Default)]
pub struct NoPrompter;

impl Prompter for NoPrompter {
    fn choose_demo_file(&mut self, _choices: &[FileChoice]) -> Option<String> {
        None
    }

    fn ask_input(&mut self, _message: &str) -> Option<String> {
        None
    }
}

/// Prompts on stdout and reads answers from stdin
#[derive(Debug, Clone, Default)]
pub struct StdinPrompter;

impl StdinPrompter {
    fn read_line(&self) -> Option<String> {
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                warn!("Failed to read from stdin: {}", e);
                None
            }
        }
    }
}

impl Prompter for StdinPrompter {
    fn choose_demo_file(&mut self, choices: &[FileChoice]) -> Option<String> {
        println!("Select a demo file:");
        for (i, choice) in choices.iter().enumerate() {
            println!("  {}) {} ({})", i + 1, choice.title, choice.path);
        }
        print!("> ");
        let _ = io::stdout().flush();

        let answer = self.read_line()?;
        let picked = answer.trim().parse::<usize>().ok()?;
        choices
            .get(picked.checked_sub(1)?)
            .map(|choice| choice.path.clone())
    }

    fn ask_input(&mut self, message: &str) -> Option<String> {
        print!("{}: ", message);
        let _ = io::stdout().flush();
        self.read_line()
    }
}

/// Cursor snapshot emitted after every cursor mutation
#[derive(Debug, Clone)]
pub struct CursorUpdate<'a> {
    pub cursor: &'a ExecutionCursor,
    pub demo: &'a Demo,
    /// `(file path, demo)` that the next advance would run
    pub next: Option<(&'a str, &'a Demo)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Presenter-facing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// Receives cursor changes and notices (status bar, presenter view, …)
pub trait RunObserver {
    fn cursor_changed(&self, update: &CursorUpdate<'_>);

    /// Called after a reset with the cleared cursor
    fn cursor_cleared(&self, _cursor: &ExecutionCursor) {}

    fn notify(&self, notice: &Notice);
}

/// Observer that writes everything to the log
#[derive(Debug, Clone, Default)]
pub struct LogObserver;

impl RunObserver for LogObserver {
    fn cursor_changed(&self, update: &CursorUpdate<'_>) {
        info!(
            "Running \"{}\" from {} ({} in history)",
            update.demo.title,
            update.cursor.file_path,
            update.cursor.history.len()
        );
        if let Some((path, next)) = update.next {
            debug!("Up next: \"{}\" from {}", next.title, path);
        }
    }

    fn cursor_cleared(&self, cursor: &ExecutionCursor) {
        debug!("Cursor cleared ({} in history)", cursor.history.len());
    }

    fn notify(&self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Info => info!("{}", notice.message),
            NoticeLevel::Warning => warn!("{}", notice.message),
            NoticeLevel::Error => error!("{}", notice.message),
        }
    }
}
