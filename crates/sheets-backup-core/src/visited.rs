//! Per-traversal record of folders already expanded.
//!
//! Keyed on the folder's own ID, so a folder reached through a shortcut and
//! the same folder reached directly share one entry. Shared by concurrent
//! folder scans; all mutations go through one mutex.

use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct VisitedSet {
    inner: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a folder as visited. Returns `true` if it was not seen before.
    pub fn insert(&self, folder_id: &str) -> bool {
        let mut set = self.inner.lock().expect("visited set poisoned");
        set.insert(folder_id.to_string())
    }

    pub fn contains(&self, folder_id: &str) -> bool {
        let set = self.inner.lock().expect("visited set poisoned");
        set.contains(folder_id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("visited set poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
