//! Staging index.
//!
//! Holds the additions and removals that the next commit folds into
//! the HEAD tree. A filename is never staged on both sides at once.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::commit::{FileTable, Snapshot};

/// Pending changes for the next commit.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StagingIndex {
    /// Files to insert or replace in the next commit.
    pub addition: BTreeMap<String, Snapshot>,
    /// Files to drop from the next commit.
    pub removal: BTreeMap<String, Snapshot>,
}

impl StagingIndex {
    /// Stage `name` for addition, replacing any previous entry.
    pub fn stage_addition(&mut self, name: &str, snapshot: Snapshot) {
        self.removal.remove(name);
        self.addition.insert(name.to_string(), snapshot);
    }

    /// Stage `name` for removal, dropping any pending addition.
    pub fn stage_removal(&mut self, name: &str, snapshot: Snapshot) {
        self.addition.remove(name);
        self.removal.insert(name.to_string(), snapshot);
    }

    pub fn unstage_addition(&mut self, name: &str) -> bool {
        self.addition.remove(name).is_some()
    }

    pub fn unstage_removal(&mut self, name: &str) -> bool {
        self.removal.remove(name).is_some()
    }

    pub fn is_staged_for_addition(&self, name: &str) -> bool {
        self.addition.contains_key(name)
    }

    pub fn is_staged_for_removal(&self, name: &str) -> bool {
        self.removal.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.addition.is_empty() && self.removal.is_empty()
    }

    pub fn clear(&mut self) {
        self.addition.clear();
        self.removal.clear();
    }

    /// Overlay this index onto `base`: additions replace, removals delete.
    pub fn apply_to(&self, base: &FileTable) -> FileTable {
        let mut files = base.clone();
        for (name, snapshot) in &self.addition {
            files.insert(name.clone(), snapshot.clone());
        }
        for name in self.removal.keys() {
            files.remove(name);
        }
        files
    }
}
