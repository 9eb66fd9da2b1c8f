//! Engine modules: the demo sequencing and execution core.
//!
//! The sequencer picks a demo and persists the cursor, the resolver and the
//! snippet expander rewrite its steps, and the dispatcher runs them.

pub mod cursor;
pub mod dispatcher;
pub mod file_order;
pub mod sequencer;
pub mod snippets;
pub mod variables;

use crate::files::DemoSource;
use crate::host::{Clipboard, Prompter, RunObserver};
use crate::store::KeyValueStore;

/// Borrowed collaborators for one request
pub struct Collaborators<'a> {
    pub store: &'a mut dyn KeyValueStore,
    pub source: &'a dyn DemoSource,
    pub clipboard: &'a dyn Clipboard,
    pub prompter: &'a mut dyn Prompter,
    pub observer: &'a dyn RunObserver,
}
