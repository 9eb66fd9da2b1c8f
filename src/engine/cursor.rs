//! Persisted execution cursor
//!
//! The cursor records which demo file is active and which of its demos have
//! run. Invariant maintained by [`ExecutionCursor::record`]: the history holds
//! at most one entry for the active demo and no entry positioned after it.

use crate::demo::{Demo, Version};
use crate::error::Result;
use crate::store::{CURSOR_KEY, KeyValueStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Reference to a demo that ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoRef {
    pub idx: usize,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl DemoRef {
    pub fn new(idx: usize, demo: &Demo) -> Self {
        Self {
            idx,
            title: demo.title.clone(),
            id: demo.id.clone(),
        }
    }

    /// Same demo as `other`: by id when both carry one, by position otherwise
    pub fn same_demo(&self, other: &DemoRef) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            _ => self.idx == other.idx,
        }
    }

    /// Position of the referenced demo in `demos`.
    ///
    /// Entries with an id are looked up by id only, so a demo that moved keeps
    /// its place in the history; entries without one fall back to `idx`.
    pub fn locate(&self, demos: &[Demo]) -> Option<usize> {
        match &self.id {
            Some(id) => demos.iter().position(|d| d.id.as_deref() == Some(id.as_str())),
            None => (self.idx < demos.len()).then_some(self.idx),
        }
    }
}

/// Which demo file is active and what has run in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionCursor {
    pub file_path: String,
    pub version: Version,
    #[serde(default)]
    pub history: Vec<DemoRef>,
}

impl Default for ExecutionCursor {
    fn default() -> Self {
        Self {
            file_path: String::new(),
            version: Version::V2,
            history: Vec::new(),
        }
    }
}

impl ExecutionCursor {
    /// Fresh cursor on `file_path` with an empty history
    pub fn for_file(file_path: impl Into<String>, version: Version) -> Self {
        Self {
            file_path: file_path.into(),
            version,
            history: Vec::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.file_path.is_empty()
    }

    pub fn last(&self) -> Option<&DemoRef> {
        self.history.last()
    }

    /// Append `idx` as the active demo and restore the history invariant
    pub fn record(&mut self, idx: usize, demo: &Demo) {
        self.history.push(DemoRef::new(idx, demo));
        self.dedup();
        self.truncate_after(idx);
    }

    /// Keep only the latest entry for each demo
    pub fn dedup(&mut self) {
        let mut kept: Vec<DemoRef> = Vec::with_capacity(self.history.len());
        for entry in self.history.drain(..).rev() {
            if !kept.iter().any(|k| k.same_demo(&entry)) {
                kept.push(entry);
            }
        }
        kept.reverse();
        self.history = kept;
    }

    /// Drop entries positioned after `idx`
    pub fn truncate_after(&mut self, idx: usize) {
        self.history.retain(|entry| entry.idx <= idx);
    }
}

/// Load/save/clear of the cursor against a [`KeyValueStore`]
pub struct CursorStore<'a> {
    store: &'a mut dyn KeyValueStore,
}

impl<'a> CursorStore<'a> {
    pub fn new(store: &'a mut dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// The persisted cursor, or the zero value when none is readable
    pub fn load(&self) -> ExecutionCursor {
        load_cursor(&*self.store)
    }

    pub fn save(&mut self, cursor: &ExecutionCursor) -> Result<()> {
        debug!(
            "Saving cursor {} ({} history entries)",
            cursor.file_path,
            cursor.history.len()
        );
        self.store.set(CURSOR_KEY, serde_json::to_value(cursor)?)?;
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.save(&ExecutionCursor::default())
    }
}

/// Read-only cursor lookup
pub fn load_cursor(store: &dyn KeyValueStore) -> ExecutionCursor {
    match store.get(CURSOR_KEY) {
        None => ExecutionCursor::default(),
        Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            warn!("Persisted cursor is unreadable, starting over: {}", e);
            ExecutionCursor::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn entry(idx: usize, id: Option<&str>) -> DemoRef {
        DemoRef {
            idx,
            title: format!("demo {}", idx),
            id: id.map(str::to_string),
        }
    }

    #[test]
    fn test_zero_value() {
        let cursor = ExecutionCursor::default();
        assert!(cursor.is_idle());
        assert_eq!(cursor.version, Version::V2);
        assert!(cursor.history.is_empty());
    }

    #[test]
    fn test_record_keeps_latest_entry_per_demo() {
        let mut cursor = ExecutionCursor::for_file("a.json", Version::V2);
        let demo = Demo::new("d");
        cursor.record(0, &demo);
        cursor.record(1, &demo);
        cursor.record(2, &demo);
        cursor.record(1, &demo);

        let idxs: Vec<usize> = cursor.history.iter().map(|e| e.idx).collect();
        assert_eq!(idxs, vec![0, 1]);
    }

    #[test]
    fn test_dedup_prefers_ids() {
        let mut cursor = ExecutionCursor::for_file("a.json", Version::V2);
        // the demo with id "x" moved from idx 0 to idx 3
        cursor.history = vec![entry(0, Some("x")), entry(1, None), entry(3, Some("x"))];
        cursor.dedup();
        assert_eq!(cursor.history, vec![entry(1, None), entry(3, Some("x"))]);
    }

    #[test]
    fn test_locate_by_id_then_index() {
        let demos = vec![
            Demo::new("a").with_id("first"),
            Demo::new("b"),
            Demo::new("c").with_id("third"),
        ];
        assert_eq!(entry(0, Some("third")).locate(&demos), Some(2));
        assert_eq!(entry(2, Some("gone")).locate(&demos), None);
        assert_eq!(entry(1, None).locate(&demos), Some(1));
        assert_eq!(entry(7, None).locate(&demos), None);
    }

    #[test]
    fn test_store_roundtrip_and_clear() {
        let mut store = MemoryStore::new();
        let mut cursors = CursorStore::new(&mut store);

        let mut cursor = ExecutionCursor::for_file(".demo/a.json", Version::V1);
        cursor.record(0, &Demo::new("intro").with_id("intro"));
        cursors.save(&cursor).unwrap();
        assert_eq!(cursors.load(), cursor);

        cursors.clear().unwrap();
        assert_eq!(cursors.load(), ExecutionCursor::default());
    }

    #[test]
    fn test_persisted_shape() {
        let mut cursor = ExecutionCursor::for_file(".demo/a.json", Version::V2);
        cursor.record(0, &Demo::new("intro"));
        let value = serde_json::to_value(&cursor).unwrap();
        assert_eq!(
            value,
            json!({"filePath": ".demo/a.json", "version": 2, "history": [{"idx": 0, "title": "intro"}]})
        );
    }

    #[test]
    fn test_unreadable_cursor_loads_as_zero_value() {
        let mut store = MemoryStore::new();
        store.set(CURSOR_KEY, json!({"filePath": 12})).unwrap();
        assert_eq!(load_cursor(&store), ExecutionCursor::default());
    }
}
