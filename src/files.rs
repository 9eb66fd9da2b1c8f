//! Demo file collaborator
//!
//! Lists and loads demo files, snippet files and the variables file. Paths
//! handed to the engine are workspace-relative strings (`.demo/intro.json`),
//! which is also what the execution cursor persists.

use crate::demo::{DemoFile, Version};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the optional engine configuration file inside the demo folder
pub const CONFIG_FILE_NAME: &str = "demotime.json";

/// Read-only access to demo content.
///
/// Implementations degrade to "absent" on read or parse failures; the engine
/// decides whether an absence is fatal.
pub trait DemoSource {
    /// Every demo file currently present, in no particular order
    fn list_demo_files(&self) -> Vec<String>;

    fn load_demo_file(&self, path: &str) -> Option<DemoFile>;

    /// Raw text of a snippet file, resolved for the given file version
    fn load_snippet(&self, path: &str, version: Version) -> Option<String>;

    /// Contents of the variables file, when there is one
    fn load_variables(&self) -> Option<BTreeMap<String, Value>>;
}

/// True for file names the demo folder may hold demos in
fn is_demo_file_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".json") || lower.ends_with(".yaml") || lower.ends_with(".yml")
}

fn is_yaml(path: &str) -> bool {
    let lower = path.to_lowercase();
    lower.ends_with(".yaml") || lower.ends_with(".yml")
}

/// Parse a demo or snippet document, choosing the format from the extension
pub fn parse_document<T: serde::de::DeserializeOwned>(
    path: &str,
    content: &str,
) -> crate::error::Result<T> {
    if is_yaml(path) {
        Ok(serde_yaml::from_str(content)?)
    } else {
        Ok(serde_json::from_str(content)?)
    }
}

/// Demo files on disk under `<root>/<demo_folder>`.
#[derive(Debug, Clone)]
pub struct WorkspaceFiles {
    root: PathBuf,
    demo_folder: String,
    variables_file: String,
}

impl WorkspaceFiles {
    pub fn new(
        root: impl Into<PathBuf>,
        demo_folder: impl Into<String>,
        variables_file: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            demo_folder: demo_folder.into(),
            variables_file: variables_file.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn demo_dir(&self) -> PathBuf {
        self.root.join(&self.demo_folder)
    }

    /// Where a content path of a `version` file points to.
    ///
    /// Version 2 paths are workspace-relative, version 1 paths are relative
    /// to the demo folder. Absolute paths are used as they are.
    pub fn resolve_content_path(&self, path: &str, version: Version) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            return candidate.to_path_buf();
        }
        match version {
            Version::V2 => self.root.join(candidate),
            Version::V1 => self.demo_dir().join(candidate),
        }
    }

    fn read(&self, relative: &str) -> Option<String> {
        let full = self.root.join(relative);
        match fs::read_to_string(&full) {
            Ok(content) => Some(content),
            Err(e) => {
                debug!("Cannot read {:?}: {}", full, e);
                None
            }
        }
    }
}

impl DemoSource for WorkspaceFiles {
    fn list_demo_files(&self) -> Vec<String> {
        let dir = self.demo_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Demo folder {:?} unavailable: {}", dir, e);
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| {
                is_demo_file_name(name)
                    && !name.starts_with('.')
                    && name != &self.variables_file
                    && name != CONFIG_FILE_NAME
            })
            .map(|name| format!("{}/{}", self.demo_folder, name))
            .collect()
    }

    fn load_demo_file(&self, path: &str) -> Option<DemoFile> {
        let content = self.read(path)?;
        match parse_document::<DemoFile>(path, &content) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!("Ignoring demo file {}: {}", path, e);
                None
            }
        }
    }

    fn load_snippet(&self, path: &str, version: Version) -> Option<String> {
        let full = self.resolve_content_path(path, version);
        match fs::read_to_string(&full) {
            Ok(content) => Some(content),
            Err(e) => {
                warn!("Snippet {:?} unavailable: {}", full, e);
                None
            }
        }
    }

    fn load_variables(&self) -> Option<BTreeMap<String, Value>> {
        let relative = format!("{}/{}", self.demo_folder, self.variables_file);
        let content = self.read(&relative)?;
        match serde_json::from_str(&content) {
            Ok(vars) => Some(vars),
            Err(e) => {
                warn!("Variables file {} is not a JSON object: {}", relative, e);
                None
            }
        }
    }
}

/// Demo content held in memory, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: BTreeMap<String, DemoFile>,
    snippets: BTreeMap<String, String>,
    variables: Option<BTreeMap<String, Value>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, file: DemoFile) -> Self {
        self.files.insert(path.into(), file);
        self
    }

    /// Register a snippet under the exact path steps reference it by
    pub fn with_snippet(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.snippets.insert(path.into(), content.into());
        self
    }

    pub fn with_variables(mut self, variables: BTreeMap<String, Value>) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn remove_file(&mut self, path: &str) -> Option<DemoFile> {
        self.files.remove(path)
    }
}

impl DemoSource for MemorySource {
    fn list_demo_files(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    fn load_demo_file(&self, path: &str) -> Option<DemoFile> {
        self.files.get(path).cloned()
    }

    fn load_snippet(&self, path: &str, _version: Version) -> Option<String> {
        self.snippets.get(path).cloned()
    }

    fn load_variables(&self) -> Option<BTreeMap<String, Value>> {
        self.variables.clone()
    }
}
