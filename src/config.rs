//! Engine configuration
//!
//! Loaded from `<workspace>/<demoFolder>/demotime.json` when present; every
//! field falls back to its default so a partial file is fine.
//!
//! ```json
//! { "previousEnabled": false, "commandTimeoutMs": 10000 }
//! ```

use crate::files::CONFIG_FILE_NAME;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_DEMO_FOLDER: &str = ".demo";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Folder holding demo files, relative to the workspace root
    pub demo_folder: String,
    /// Variables file name inside the demo folder
    pub variables_file: String,
    /// Workspace state file (cursor, state and script values)
    pub state_file: String,
    /// Whether `previous` may move the cursor back
    pub previous_enabled: bool,
    /// Upper bound on waiting for a terminal command to finish
    pub command_timeout_ms: u64,
    /// Shell used for terminal commands
    pub shell: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            demo_folder: DEFAULT_DEMO_FOLDER.to_string(),
            variables_file: "variables.json".to_string(),
            state_file: format!("{}/.demotime-state.json", DEFAULT_DEMO_FOLDER),
            previous_enabled: true,
            command_timeout_ms: 5000,
            shell: "sh".to_string(),
        }
    }
}

impl EngineConfig {
    /// Conventional config location for a workspace
    pub fn default_path(workspace: &Path) -> PathBuf {
        workspace.join(DEFAULT_DEMO_FOLDER).join(CONFIG_FILE_NAME)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        if let Some(dir) = path.as_ref().parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config folder {:?}", dir))?;
        }
        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            debug!("Loading configuration from {:?}", path.as_ref());
            Self::load_from_file(path)
        } else {
            debug!("No configuration at {:?}, using defaults", path.as_ref());
            Ok(Self::default())
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.demo_folder.trim().is_empty() {
            anyhow::bail!("Demo folder must be specified");
        }
        if self.variables_file.trim().is_empty() {
            anyhow::bail!("Variables file name must be specified");
        }
        if self.variables_file.contains('/') {
            anyhow::bail!("Variables file must be a file name inside the demo folder");
        }
        if self.state_file.trim().is_empty() {
            anyhow::bail!("State file must be specified");
        }
        if self.command_timeout_ms == 0 {
            anyhow::bail!("Command timeout must be greater than zero");
        }
        if self.shell.trim().is_empty() {
            anyhow::bail!("Shell must be specified");
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// State file location for a workspace
    pub fn state_path(&self, workspace: &Path) -> PathBuf {
        let path = Path::new(&self.state_file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            workspace.join(path)
        }
    }
}
