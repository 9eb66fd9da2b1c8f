//! Persistence collaborator
//!
//! The engine keeps three values per workspace: the execution cursor, the
//! `setState` map and the `executeScript` output map. All of them live behind
//! a [`KeyValueStore`], which the engine is the single writer of.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Key of the persisted execution cursor
pub const CURSOR_KEY: &str = "executingDemoFile";
/// Key of the `STATE_*` variable map
pub const STATE_VARIABLES_KEY: &str = "variables.state";
/// Key of the `SCRIPT_*` variable map
pub const SCRIPT_VARIABLES_KEY: &str = "variables.script";

/// Workspace-scoped key-value persistence.
///
/// `set` replaces the whole value for a key; readers never observe a
/// partially written value.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&mut self, key: &str, value: Value) -> Result<()>;
}

/// In-memory store, used when nothing should outlive the process
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// JSON file store (one object per workspace).
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so the file is always either the old or the new document.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist
    /// or cannot be parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    warn!("State file {:?} is unreadable, starting from an empty state", path);
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read state file {:?}", path));
            }
        };

        debug!("Opened state file {:?} ({} keys)", path, values.len());
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create state directory {:?}", dir))?;

        let json = serde_json::to_string_pretty(&self.values)
            .context("Failed to serialize workspace state")?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;
        tmp.write_all(json.as_bytes())
            .context("Failed to write workspace state")?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to replace state file {:?}", self.path))?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        self.flush()
    }
}
