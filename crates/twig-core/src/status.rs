//! Working tree status.
//!
//! Compares the files on disk against the HEAD commit and the staging
//! index. Scanning the disk and classifying are separate steps so the
//! classification stays a pure function of its inputs.
//!
//! Ignore rules only hide untracked files. A file tracked by HEAD or
//! staged for addition is always read, whatever the rules say.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use walkdir::WalkDir;

use crate::error::TwigResult;
use crate::fsutil::resolve_in;
use crate::ignore::IgnoreRules;
use crate::state::RepoState;

/// Relative path (with `/` separators) → raw file content.
pub type WorkingFiles = BTreeMap<String, Vec<u8>>;

/// How an unstaged file differs from what would be committed.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Modification {
    Modified,
    Deleted,
}

/// A change in the working tree that is not staged.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UnstagedChange {
    pub path: String,
    pub kind: Modification,
}

/// The full status report. Every list is in lexicographic order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WorkspaceStatus {
    pub branches: Vec<String>,
    pub current_branch: String,
    pub staged: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<UnstagedChange>,
    pub untracked: Vec<String>,
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Read every non-ignored file under `root`, plus every `tracked` name
/// present on disk even if a rule ignores it.
pub fn scan_workspace<'a>(
    root: &Path,
    rules: &IgnoreRules,
    tracked: impl IntoIterator<Item = &'a str>,
) -> TwigResult<WorkingFiles> {
    let mut files = WorkingFiles::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
        e.depth() == 0
            || relative_path(root, e.path()).is_some_and(|rel| !rules.is_ignored(&rel))
    });

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(rel) = relative_path(root, entry.path()) else {
            continue;
        };
        files.insert(rel, fs::read(entry.path())?);
    }

    for name in tracked {
        if files.contains_key(name) {
            continue;
        }
        let path = resolve_in(root, name)?;
        if path.is_file() {
            files.insert(name.to_string(), fs::read(&path)?);
        }
    }
    Ok(files)
}

/// Classify every file in the working tree, the staging index and HEAD.
pub fn compute_status(state: &RepoState, working: &WorkingFiles) -> TwigResult<WorkspaceStatus> {
    let head = state.head_commit()?;
    let stage = &state.stage;

    let every_file: BTreeSet<&String> = working
        .keys()
        .chain(stage.addition.keys())
        .chain(head.files.keys())
        .collect();

    let mut modified = Vec::new();
    for name in every_file {
        let on_disk = working.get(name).map(Vec::as_slice);
        let staged = stage.addition.get(name).map(|s| s.content().as_bytes());
        let committed = head.content(name).map(str::as_bytes);

        let kind = match (on_disk, staged, committed) {
            (None, Some(_), _) => Some(Modification::Deleted),
            (None, None, Some(_)) if !stage.is_staged_for_removal(name) => {
                Some(Modification::Deleted)
            }
            (Some(disk), None, Some(commit)) if disk != commit => Some(Modification::Modified),
            (Some(disk), Some(staged), _) if disk != staged => Some(Modification::Modified),
            _ => None,
        };
        if let Some(kind) = kind {
            modified.push(UnstagedChange {
                path: name.clone(),
                kind,
            });
        }
    }

    let untracked = working
        .keys()
        .filter(|name| !head.has_file(name) && !stage.is_staged_for_addition(name))
        .cloned()
        .collect();

    Ok(WorkspaceStatus {
        branches: state.branches.keys().cloned().collect(),
        current_branch: state.current_branch.clone(),
        staged: stage.addition.keys().cloned().collect(),
        removed: stage.removal.keys().cloned().collect(),
        modified,
        untracked,
    })
}
