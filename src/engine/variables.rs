//! Variable resolution and placeholder substitution
//!
//! The variable set is rebuilt on every run from four layers, highest
//! precedence first:
//!
//! 1. built-ins: `DT_CLIPBOARD` (clipboard text) and `DT_INPUT`
//! 2. persisted `setState` values (`STATE_<key>`)
//! 3. persisted `executeScript` output (`SCRIPT_<id>`)
//! 4. the workspace variables file
//!
//! Placeholders are written `{KEY}`; unknown keys are left untouched.

use crate::error::Result;
use crate::files::DemoSource;
use crate::host::{Clipboard, Prompter};
use crate::store::{KeyValueStore, SCRIPT_VARIABLES_KEY, STATE_VARIABLES_KEY};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const CLIPBOARD_KEY: &str = "DT_CLIPBOARD";
pub const INPUT_KEY: &str = "DT_INPUT";
pub const STATE_PREFIX: &str = "STATE_";
pub const SCRIPT_PREFIX: &str = "SCRIPT_";

const RESERVED_KEYS: [&str; 2] = [CLIPBOARD_KEY, INPUT_KEY];

/// Placeholder fragments whose values can change while a demo runs
const VOLATILE_MARKERS: [&str; 3] = ["{STATE_", "{SCRIPT_", "{DT_CLIPBOARD}"];

/// Flat key → text map used for substitution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSet {
    values: BTreeMap<String, String>,
    input_asked: bool,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variables from a snippet step's `args`
    pub fn from_args(args: &Map<String, Value>) -> Self {
        Self {
            values: args
                .iter()
                .map(|(key, value)| (key.clone(), value_to_text(value)))
                .collect(),
            input_asked: false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Fill `DT_INPUT` by asking the presenter, once per run, when `text`
    /// needs it and it has no value yet.
    pub fn prompt_for_input(&mut self, text: &str, prompter: &mut dyn Prompter) {
        let placeholder = format!("{{{}}}", INPUT_KEY);
        if self.input_asked || !text.contains(&placeholder) {
            return;
        }
        if self.get(INPUT_KEY).is_some_and(|v| !v.is_empty()) {
            return;
        }
        self.input_asked = true;
        let answer = prompter.ask_input("Enter a value").unwrap_or_default();
        debug!("DT_INPUT answered ({} chars)", answer.len());
        self.insert(INPUT_KEY, answer);
    }

    /// The set without `STATE_` and `SCRIPT_` values. Steps of the running
    /// demo may still change those, so they are filled in at dispatch time.
    pub fn without_run_outputs(&self) -> VariableSet {
        Self {
            values: self
                .values
                .iter()
                .filter(|(key, _)| !key.starts_with(STATE_PREFIX) && !key.starts_with(SCRIPT_PREFIX))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            input_asked: self.input_asked,
        }
    }

    /// Carry over the interactive answer from an earlier set
    pub fn keep_input_from(&mut self, earlier: &VariableSet) {
        if earlier.input_asked {
            self.input_asked = true;
            if let Some(value) = earlier.get(INPUT_KEY) {
                self.insert(INPUT_KEY, value);
            }
        }
    }
}

/// Text form of a variable value; strings are inserted without quotes
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// True when `text` still references state, script output or the clipboard
pub fn has_volatile_placeholders(text: &str) -> bool {
    VOLATILE_MARKERS.iter().any(|marker| text.contains(marker))
}

fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim();
    (trimmed.starts_with('{') || trimmed.starts_with('['))
        && (trimmed.ends_with('}') || trimmed.ends_with(']'))
}

fn escape_json_string(value: &str) -> String {
    // serde_json escapes every control character, not just the common ones
    let quoted = Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

/// Replace every known `{KEY}` in `text`.
///
/// Replacement is a single left-to-right pass, so inserted values are never
/// scanned again. Inside a JSON document values are string-escaped. With
/// `include_reserved` unset the built-in keys stay as placeholders.
pub fn substitute(text: &str, vars: &VariableSet, include_reserved: bool) -> String {
    if vars.is_empty() || !text.contains('{') {
        return text.to_string();
    }

    let json = looks_like_json(text);
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let key = &after[..close];

        let value = if key.is_empty() || key.contains('{') {
            None
        } else if !include_reserved && RESERVED_KEYS.contains(&key) {
            None
        } else {
            vars.get(key)
        };

        match value {
            Some(value) if json => {
                out.push_str(&escape_json_string(value));
                rest = &after[close + 1..];
            }
            Some(value) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Builds the variable set from its sources
pub struct VariableResolver<'a> {
    store: &'a dyn KeyValueStore,
    source: &'a dyn DemoSource,
    clipboard: &'a dyn Clipboard,
}

impl<'a> VariableResolver<'a> {
    pub fn new(
        store: &'a dyn KeyValueStore,
        source: &'a dyn DemoSource,
        clipboard: &'a dyn Clipboard,
    ) -> Self {
        Self { store, source, clipboard }
    }

    pub fn resolve(&self) -> VariableSet {
        let mut vars = VariableSet::new();

        // lowest precedence first, later layers overwrite
        if let Some(file_vars) = self.source.load_variables() {
            for (key, value) in &file_vars {
                vars.insert(key.clone(), value_to_text(value));
            }
        }
        for (key, value) in load_persisted(self.store, SCRIPT_VARIABLES_KEY) {
            vars.insert(key, value);
        }
        for (key, value) in load_persisted(self.store, STATE_VARIABLES_KEY) {
            vars.insert(key, value);
        }

        let clipboard = self.clipboard.read().unwrap_or_else(|e| {
            warn!("Could not read the clipboard: {:#}", e);
            String::new()
        });
        vars.insert(CLIPBOARD_KEY, clipboard);
        vars.insert(INPUT_KEY, "");

        debug!("Resolved {} variables", vars.len());
        vars
    }
}

/// One of the persisted variable maps; unreadable maps count as empty
pub fn load_persisted(store: &dyn KeyValueStore, key: &str) -> BTreeMap<String, String> {
    match store.get(key) {
        None => BTreeMap::new(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(name, value)| (name.clone(), value_to_text(value)))
            .collect(),
        Some(other) => {
            warn!("Ignoring malformed variable map {}: {}", key, other);
            BTreeMap::new()
        }
    }
}

fn record_persisted(store: &mut dyn KeyValueStore, key: &str, name: String, value: &str) -> Result<()> {
    let mut map = load_persisted(store, key);
    map.insert(name, value.to_string());
    store.set(key, serde_json::to_value(map)?)?;
    Ok(())
}

/// Persist a `setState` value; returns the variable name it is known by
pub fn record_state(store: &mut dyn KeyValueStore, key: &str, value: &str) -> Result<String> {
    let name = format!("{}{}", STATE_PREFIX, key);
    record_persisted(store, STATE_VARIABLES_KEY, name.clone(), value)?;
    Ok(name)
}

/// Persist `executeScript` output; returns the variable name it is known by
pub fn record_script_output(store: &mut dyn KeyValueStore, id: &str, output: &str) -> Result<String> {
    let name = format!("{}{}", SCRIPT_PREFIX, id);
    record_persisted(store, SCRIPT_VARIABLES_KEY, name.clone(), output)?;
    Ok(name)
}

/// Forget every persisted state and script value
pub fn clear_persisted(store: &mut dyn KeyValueStore) -> Result<()> {
    store.set(STATE_VARIABLES_KEY, Value::Object(Map::new()))?;
    store.set(SCRIPT_VARIABLES_KEY, Value::Object(Map::new()))?;
    Ok(())
}
