//! Demo navigation
//!
//! Decides which demo runs next, previously, or by id, and records the choice
//! in the persisted cursor before anything executes. Disabled demos are
//! invisible to advance/retreat but can still be run by id or position.
//! Crossing from one demo file to the next is transparent to callers.

use crate::demo::{Demo, DemoFile};
use crate::engine::cursor::{CursorStore, ExecutionCursor, load_cursor};
use crate::engine::file_order::FileSequencer;
use crate::engine::variables::clear_persisted;
use crate::error::Result;
use crate::files::DemoSource;
use crate::host::{FileChoice, Prompter};
use crate::store::KeyValueStore;
use tracing::{debug, info, warn};

/// A demo picked for execution
#[derive(Debug, Clone, PartialEq)]
pub struct Chosen {
    pub file_path: String,
    pub file: DemoFile,
    pub idx: usize,
    /// Cursor as persisted for this choice
    pub cursor: ExecutionCursor,
}

impl Chosen {
    pub fn demo(&self) -> &Demo {
        &self.file.demos[self.idx]
    }
}

/// Outcome of a navigation request
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Chosen(Box<Chosen>),
    /// Nothing left after the last demo of the last file
    Exhausted,
    /// Already at the first demo of the first file
    AtStart,
    NoDemoFile,
    UnknownDemo(String),
    PreviousDisabled,
}

/// Preview of the demo `advance` would pick
#[derive(Debug, Clone, PartialEq)]
pub struct Upcoming {
    pub file_path: String,
    pub idx: usize,
    pub demo: Demo,
}

pub struct DemoSequencer<'a> {
    source: &'a dyn DemoSource,
    store: &'a mut dyn KeyValueStore,
    prompter: &'a mut dyn Prompter,
    previous_enabled: bool,
}

impl<'a> DemoSequencer<'a> {
    pub fn new(
        source: &'a dyn DemoSource,
        store: &'a mut dyn KeyValueStore,
        prompter: &'a mut dyn Prompter,
    ) -> Self {
        Self {
            source,
            store,
            prompter,
            previous_enabled: true,
        }
    }

    pub fn previous_enabled(mut self, enabled: bool) -> Self {
        self.previous_enabled = enabled;
        self
    }

    fn files(&self) -> FileSequencer {
        FileSequencer::new(self.source.list_demo_files())
    }

    /// A file that failed to load counts as having no demos
    fn load_or_empty(&self, path: &str) -> DemoFile {
        self.source.load_demo_file(path).unwrap_or_else(|| {
            warn!("Demo file {} could not be loaded, skipping it", path);
            DemoFile {
                title: String::new(),
                description: None,
                version: None,
                demos: Vec::new(),
            }
        })
    }

    fn persist(&mut self, cursor: &ExecutionCursor) -> Result<()> {
        CursorStore::new(&mut *self.store).save(cursor)
    }

    fn commit(
        &mut self,
        mut cursor: ExecutionCursor,
        file_path: String,
        file: DemoFile,
        idx: usize,
    ) -> Result<Selection> {
        cursor.version = file.version();
        cursor.record(idx, &file.demos[idx]);
        self.persist(&cursor)?;
        info!("Selected demo {} \"{}\" in {}", idx, file.demos[idx].title, file_path);
        Ok(Selection::Chosen(Box::new(Chosen {
            file_path,
            file,
            idx,
            cursor,
        })))
    }

    /// The file `advance` starts from when no file is active
    fn starting_file(&mut self, files: &FileSequencer) -> Option<String> {
        match files.files() {
            [] => None,
            [only] => Some(only.clone()),
            all => {
                let choices: Vec<FileChoice> = all
                    .iter()
                    .map(|path| FileChoice {
                        path: path.clone(),
                        title: self.load_or_empty(path).title,
                    })
                    .collect();
                self.prompter.choose_demo_file(&choices)
            }
        }
    }

    /// First eligible demo after the cursor's last entry, crossing into
    /// later files as needed. Does not touch the store.
    fn scan_forward(
        &self,
        files: &FileSequencer,
        cursor: &ExecutionCursor,
        file: DemoFile,
    ) -> Option<(String, DemoFile, usize, bool)> {
        let mut path = cursor.file_path.clone();
        let mut file = file;
        let mut start = cursor
            .last()
            .and_then(|entry| entry.locate(&file.demos))
            .map_or(0, |idx| idx + 1);
        let mut crossed = false;

        loop {
            if let Some(idx) = file.first_enabled_from(start) {
                return Some((path, file, idx, crossed));
            }
            let next = files.next(&path)?.to_string();
            debug!("End of {} reached, moving on to {}", path, next);
            file = self.load_or_empty(&next);
            path = next;
            start = 0;
            crossed = true;
        }
    }

    /// Pick and record the next demo.
    ///
    /// `requested` names the file to run from; without it the cursor's file
    /// is used, then the only demo file, then the presenter's choice.
    pub fn advance(&mut self, requested: Option<&str>) -> Result<Selection> {
        let files = self.files();
        let mut cursor = load_cursor(&*self.store);

        let target = match requested {
            Some(path) => path.to_string(),
            None if !cursor.is_idle() => cursor.file_path.clone(),
            None => match self.starting_file(&files) {
                Some(path) => path,
                None => return Ok(Selection::NoDemoFile),
            },
        };

        let Some(file) = self.source.load_demo_file(&target) else {
            warn!("Demo file {} is not available", target);
            return Ok(Selection::NoDemoFile);
        };
        if cursor.file_path != target {
            debug!("Switching cursor to {}", target);
            cursor = ExecutionCursor::for_file(target, file.version());
        }

        match self.scan_forward(&files, &cursor, file) {
            None => {
                info!("No demo left after {}", cursor.file_path);
                Ok(Selection::Exhausted)
            }
            Some((path, file, idx, crossed)) => {
                if crossed {
                    cursor = ExecutionCursor::for_file(path.clone(), file.version());
                }
                self.commit(cursor, path, file, idx)
            }
        }
    }

    /// Step back to the nearest eligible demo before the active one
    pub fn retreat(&mut self) -> Result<Selection> {
        if !self.previous_enabled {
            return Ok(Selection::PreviousDisabled);
        }

        let mut cursor = load_cursor(&*self.store);
        if cursor.is_idle() {
            return Ok(Selection::AtStart);
        }
        let Some(file) = self.source.load_demo_file(&cursor.file_path) else {
            warn!("Demo file {} is not available", cursor.file_path);
            return Ok(Selection::NoDemoFile);
        };
        let Some(current) = cursor.last().cloned() else {
            return Ok(Selection::AtStart);
        };
        let current_idx = current.locate(&file.demos).unwrap_or(current.idx);

        if let Some(idx) = file.last_enabled_before(current_idx) {
            cursor.history.pop();
            let path = cursor.file_path.clone();
            return self.commit(cursor, path, file, idx);
        }

        let files = self.files();
        let mut path = cursor.file_path.clone();
        while let Some(previous) = files.previous(&path) {
            let previous = previous.to_string();
            let file = self.load_or_empty(&previous);
            if let Some(idx) = file.last_enabled() {
                debug!("Start of {} reached, moving back to {}", path, previous);
                let cursor = ExecutionCursor::for_file(previous.clone(), file.version());
                return self.commit(cursor, previous, file, idx);
            }
            path = previous;
        }

        Ok(Selection::AtStart)
    }

    /// Run the demo carrying `id`, wherever it is. Disabled demos qualify.
    pub fn run_by_id(&mut self, id: &str) -> Result<Selection> {
        let files = self.files();
        let found = files.files().iter().find_map(|path| {
            let file = self.source.load_demo_file(path)?;
            let idx = file.position_of(id)?;
            Some((path.clone(), file, idx))
        });

        match found {
            Some((path, file, idx)) => self.select(path, file, idx),
            None => {
                warn!("No demo with id {}", id);
                Ok(Selection::UnknownDemo(id.to_string()))
            }
        }
    }

    /// Run the demo at position `idx` of `path` directly
    pub fn jump(&mut self, path: &str, idx: usize) -> Result<Selection> {
        let Some(file) = self.source.load_demo_file(path) else {
            return Ok(Selection::NoDemoFile);
        };
        if idx >= file.demos.len() {
            return Ok(Selection::UnknownDemo(format!("{}#{}", path, idx)));
        }
        self.select(path.to_string(), file, idx)
    }

    fn select(&mut self, path: String, file: DemoFile, idx: usize) -> Result<Selection> {
        let mut cursor = load_cursor(&*self.store);
        if cursor.file_path != path {
            cursor = ExecutionCursor::for_file(path.clone(), file.version());
        }
        // recording truncates, so jumping backwards drops what ran after the target
        self.commit(cursor, path, file, idx)
    }

    /// What `advance` would run now, without recording anything
    pub fn peek_next(&self) -> Option<Upcoming> {
        let cursor = load_cursor(&*self.store);
        let files = self.files();
        let cursor = if cursor.is_idle() {
            match files.files() {
                [only] => ExecutionCursor::for_file(only.clone(), Default::default()),
                _ => return None,
            }
        } else {
            cursor
        };

        let file = self.source.load_demo_file(&cursor.file_path)?;
        let (file_path, file, idx, _) = self.scan_forward(&files, &cursor, file)?;
        Some(Upcoming {
            file_path,
            demo: file.demos[idx].clone(),
            idx,
        })
    }

    /// Forget the cursor and every persisted state and script value
    pub fn reset(&mut self) -> Result<()> {
        CursorStore::new(&mut *self.store).clear()?;
        clear_persisted(&mut *self.store)?;
        info!("Demo cursor reset");
        Ok(())
    }
}
