//! Branches: named, mutable pointers into the commit graph.

use serde::{Deserialize, Serialize};

/// Name of the branch created by `init` unless configured otherwise.
pub const DEFAULT_BRANCH: &str = "master";

/// A branch points at a commit by its short id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Branch {
    pub name: String,
    pub commit: String,
}

impl Branch {
    pub fn new(name: impl Into<String>, commit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commit: commit.into(),
        }
    }

    /// Re-point the branch at another commit.
    pub fn switch_pointer(&mut self, commit: impl Into<String>) {
        self.commit = commit.into();
    }
}

/// Name of the local branch that tracks `branch` on `remote`.
pub fn tracking_name(remote: &str, branch: &str) -> String {
    format!("{remote}/{branch}")
}
