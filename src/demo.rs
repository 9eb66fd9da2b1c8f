//! Demo file records
//!
//! A demo file holds an ordered list of demos; a demo holds an ordered list of
//! steps. These records are delivered already parsed and are never mutated by
//! the engine.

use crate::step::Step;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Demo file format version.
///
/// Version 1 files resolve relative content paths (snippets, notes) against
/// the demo folder; version 2 files resolve them against the workspace root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Version {
    V1,
    #[default]
    V2,
}

impl Version {
    pub const fn number(self) -> u8 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }
}

impl TryFrom<u8> for Version {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(format!("unsupported demo file version {}", other)),
        }
    }
}

impl From<Version> for u8 {
    fn from(version: Version) -> Self {
        version.number()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}

/// One demo file (`.demo/*.json` or `.demo/*.yaml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoFile {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Files without a version predate version 2 and are treated as version 1
    #[serde(default)]
    pub version: Option<Version>,
    #[serde(default)]
    pub demos: Vec<Demo>,
}

impl DemoFile {
    /// Effective format version of this file
    pub fn version(&self) -> Version {
        self.version.unwrap_or(Version::V1)
    }

    /// Index of the first demo carrying `id`
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.demos
            .iter()
            .position(|demo| demo.id.as_deref() == Some(id))
    }

    /// First non-disabled demo at or after `from`
    pub fn first_enabled_from(&self, from: usize) -> Option<usize> {
        (from..self.demos.len()).find(|&idx| !self.demos[idx].disabled)
    }

    /// Nearest non-disabled demo strictly before `before`
    pub fn last_enabled_before(&self, before: usize) -> Option<usize> {
        (0..before.min(self.demos.len()))
            .rev()
            .find(|&idx| !self.demos[idx].disabled)
    }

    /// Last non-disabled demo in the file
    pub fn last_enabled(&self) -> Option<usize> {
        self.last_enabled_before(self.demos.len())
    }
}

/// A named, orderable unit of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Demo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Notes>,
}

impl Demo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: None,
            steps: Vec::new(),
            disabled: false,
            notes: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// Presenter notes attached to a demo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notes {
    pub path: String,
    #[serde(default)]
    pub show_on_trigger: bool,
}
