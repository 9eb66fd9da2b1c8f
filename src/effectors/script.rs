//! `executeScript` effector
//!
//! Runs `<command> <path> <args…>` from the workspace root and returns the
//! trimmed stdout, which the dispatcher stores as `SCRIPT_<id>`. Every script
//! goes through [`TrackedChild`] so it is stopped with the presenter.

use crate::effectors::{Effect, Effector};
use crate::process_guard::TrackedChild;
use crate::step::{Action, ActionKind};
use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::info;

/// Output of one script run
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the script was ended by a signal
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl ScriptOutput {
    /// Fail with stderr when the script did not exit cleanly
    pub fn ensure_success(&self, context: &str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            bail!(
                "{} failed (exit code {}): {}",
                context,
                self.exit_code.unwrap_or(-1),
                self.stderr.trim()
            )
        }
    }
}

pub struct ScriptEffector {
    workspace: PathBuf,
}

impl ScriptEffector {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }

    /// Run one script and capture its output
    pub fn run(&self, command: &str, path: &str, args: &[String]) -> Result<ScriptOutput> {
        info!("Running script: {} {} {:?}", command, path, args);

        let mut cmd = Command::new(command);
        cmd.arg(path)
            .args(args)
            .current_dir(&self.workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = TrackedChild::spawn(&mut cmd)
            .with_context(|| format!("Failed to spawn script: {} {}", command, path))?;
        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed waiting for script: {}", path))?;

        Ok(ScriptOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
            success: output.status.success(),
        })
    }
}

impl Effector for ScriptEffector {
    fn kinds(&self) -> Vec<ActionKind> {
        vec![ActionKind::ExecuteScript]
    }

    fn apply(&mut self, action: &Action) -> Result<Effect> {
        let Action::ExecuteScript {
            id,
            path,
            command,
            args,
        } = action
        else {
            bail!("script effector cannot run {}", action.tag());
        };

        let output = self.run(command, path, args.as_deref().unwrap_or_default())?;
        output.ensure_success(&format!("Script {}", id))?;
        Ok(Effect::Output(output.stdout.trim().to_string()))
    }
}
