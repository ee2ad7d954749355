//! Three-way merge reconciliation.
//!
//! Every file that appears at the split point, in the current tip or in
//! the given tip is classified by presence and content relative to the
//! split point. The result is a [`MergePlan`]: the working-tree writes
//! and staging-index updates that turn the current tree into the merged
//! tree. Applying the plan to disk is the repository's job.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::commit::{FileTable, Snapshot};
use crate::index::StagingIndex;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What the merge does with one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "content", rename_all = "kebab-case")]
pub enum FileAction {
    /// Only the given side changed it: write the given content and stage it.
    TakeGiven(String),
    /// The given side deleted an unmodified file: delete it and stage a removal.
    Remove(String),
    /// Both sides deleted it: stage a removal, the working tree is untouched.
    KeepRemoved(String),
    /// Both sides changed it differently: write conflict markers and stage them.
    Conflict(String),
}

impl FileAction {
    pub fn is_conflict(&self) -> bool {
        matches!(self, FileAction::Conflict(_))
    }
}

/// The reconciled changes for a whole tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergePlan {
    /// Filename → action. Files that need nothing are absent.
    pub actions: BTreeMap<String, FileAction>,
}

impl MergePlan {
    pub fn has_conflicts(&self) -> bool {
        self.actions.values().any(FileAction::is_conflict)
    }

    /// Files written with conflict markers, in lexicographic order.
    pub fn conflicted_files(&self) -> Vec<String> {
        self.actions
            .iter()
            .filter(|(_, action)| action.is_conflict())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Record the plan's additions and removals in `stage`.
    pub fn stage_into(&self, stage: &mut StagingIndex) {
        for (name, action) in &self.actions {
            match action {
                FileAction::TakeGiven(content) | FileAction::Conflict(content) => {
                    stage.stage_addition(name, Snapshot::new(content.clone()));
                }
                FileAction::Remove(content) | FileAction::KeepRemoved(content) => {
                    stage.stage_removal(name, Snapshot::new(content.clone()));
                }
            }
        }
    }
}

/// How a merge request was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum MergeOutcome {
    /// The given branch is already in the current branch's history.
    GivenIsAncestor,
    /// The current branch moved forward to the given tip.
    FastForwarded { commit: String },
    /// A merge commit was created. `conflicts` lists files written with
    /// conflict markers.
    Merged {
        commit: String,
        conflicts: Vec<String>,
    },
}

impl MergeOutcome {
    pub fn has_conflicts(&self) -> bool {
        matches!(self, MergeOutcome::Merged { conflicts, .. } if !conflicts.is_empty())
    }

    /// The one-line notice printed for this outcome, if any.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            MergeOutcome::GivenIsAncestor => {
                Some("Given branch is an ancestor of the current branch.")
            }
            MergeOutcome::FastForwarded { .. } => Some("Current branch fast-forwarded."),
            MergeOutcome::Merged { .. } if self.has_conflicts() => {
                Some("Encountered a merge conflict.")
            }
            MergeOutcome::Merged { .. } => None,
        }
    }
}

/// Message recorded on a merge commit.
pub fn merge_message(given_branch: &str, current_branch: &str) -> String {
    format!("Merged {given_branch} into {current_branch}.")
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Build the conflict-marker file for diverging versions of one file.
///
/// A missing side contributes empty content.
pub fn conflict_content(current: Option<&str>, given: Option<&str>) -> String {
    format!(
        "<<<<<<< HEAD\n{}=======\n{}>>>>>>>\n",
        current.unwrap_or(""),
        given.unwrap_or("")
    )
}

/// Classify a single file by its content at the split point and both tips.
///
/// `None` means absent. Returns `None` when the merged tree keeps the
/// current side's version.
pub fn classify(split: Option<&str>, current: Option<&str>, given: Option<&str>) -> Option<FileAction> {
    let current_modified = current != split;
    let given_modified = given != split;

    if !given_modified {
        // Unmodified by both, modified by current only, or removed by
        // current while given left it alone: current wins.
        return None;
    }

    if !current_modified {
        return match given {
            Some(content) => Some(FileAction::TakeGiven(content.to_string())),
            // given_modified with given absent means the split had it.
            None => split.map(|base| FileAction::Remove(base.to_string())),
        };
    }

    match (current, given) {
        (None, None) => split.map(|base| FileAction::KeepRemoved(base.to_string())),
        (Some(a), Some(b)) if a == b => None,
        _ => Some(FileAction::Conflict(conflict_content(current, given))),
    }
}

/// Reconcile the split-point, current and given trees.
pub fn plan_merge(split: &FileTable, current: &FileTable, given: &FileTable) -> MergePlan {
    let names: BTreeSet<&String> = split
        .keys()
        .chain(current.keys())
        .chain(given.keys())
        .collect();

    let mut actions = BTreeMap::new();
    for name in names {
        let action = classify(
            split.get(name).map(Snapshot::content),
            current.get(name).map(Snapshot::content),
            given.get(name).map(Snapshot::content),
        );
        if let Some(action) = action {
            actions.insert(name.clone(), action);
        }
    }
    MergePlan { actions }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &str)]) -> FileTable {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), Snapshot::new(*v)))
            .collect()
    }

    #[test]
    fn test_conflict_determinism() {
        let plan = plan_merge(
            &table(&[("A", "1")]),
            &table(&[("A", "2")]),
            &table(&[("A", "3")]),
        );
        assert!(plan.has_conflicts());
        assert_eq!(
            plan.actions["A"],
            FileAction::Conflict("<<<<<<< HEAD\n2=======\n3>>>>>>>\n".to_string())
        );
    }

    #[test]
    fn test_given_modified_only_takes_given() {
        assert_eq!(
            classify(Some("1"), Some("1"), Some("2")),
            Some(FileAction::TakeGiven("2".into()))
        );
    }

    #[test]
    fn test_current_modified_only_keeps_current() {
        assert_eq!(classify(Some("1"), Some("2"), Some("1")), None);
    }

    #[test]
    fn test_added_in_given_only() {
        assert_eq!(
            classify(None, None, Some("new")),
            Some(FileAction::TakeGiven("new".into()))
        );
    }

    #[test]
    fn test_added_in_current_only() {
        assert_eq!(classify(None, Some("mine"), None), None);
    }

    #[test]
    fn test_removed_by_given_unmodified_by_current() {
        assert_eq!(
            classify(Some("1"), Some("1"), None),
            Some(FileAction::Remove("1".into()))
        );
    }

    #[test]
    fn test_removed_by_current_unmodified_by_given() {
        assert_eq!(classify(Some("1"), None, Some("1")), None);
    }

    #[test]
    fn test_removed_by_both() {
        assert_eq!(
            classify(Some("1"), None, None),
            Some(FileAction::KeepRemoved("1".into()))
        );
    }

    #[test]
    fn test_same_change_on_both_sides() {
        assert_eq!(classify(Some("1"), Some("2"), Some("2")), None);
        assert_eq!(classify(None, Some("x"), Some("x")), None);
    }

    #[test]
    fn test_delete_versus_modify_conflicts() {
        assert_eq!(
            classify(Some("1"), None, Some("2")),
            Some(FileAction::Conflict("<<<<<<< HEAD\n=======\n2>>>>>>>\n".into()))
        );
        assert_eq!(
            classify(Some("1"), Some("2"), None),
            Some(FileAction::Conflict("<<<<<<< HEAD\n2=======\n>>>>>>>\n".into()))
        );
    }

    #[test]
    fn test_both_added_differently_conflicts() {
        assert!(classify(None, Some("a"), Some("b")).unwrap().is_conflict());
    }

    #[test]
    fn test_unmodified_by_both() {
        assert_eq!(classify(Some("1"), Some("1"), Some("1")), None);
    }

    #[test]
    fn test_stage_into_and_merged_tree() {
        let split = table(&[("keep", "k"), ("edit", "0"), ("drop", "d"), ("both", "b")]);
        let current = table(&[("keep", "k"), ("edit", "0"), ("drop", "d"), ("mine", "m")]);
        let given = table(&[("keep", "k"), ("edit", "1"), ("theirs", "t")]);

        let plan = plan_merge(&split, &current, &given);
        assert!(!plan.has_conflicts());

        let mut stage = StagingIndex::default();
        plan.stage_into(&mut stage);
        let merged = stage.apply_to(&current);

        assert_eq!(
            merged,
            table(&[("keep", "k"), ("edit", "1"), ("mine", "m"), ("theirs", "t")])
        );
        assert!(stage.is_staged_for_removal("both"));
        assert!(stage.is_staged_for_removal("drop"));
    }

    #[test]
    fn test_outcome_notices() {
        assert_eq!(
            MergeOutcome::FastForwarded { commit: "abc123".into() }.notice(),
            Some("Current branch fast-forwarded.")
        );
        let clean = MergeOutcome::Merged {
            commit: "abc123".into(),
            conflicts: vec![],
        };
        assert_eq!(clean.notice(), None);
        let conflicted = MergeOutcome::Merged {
            commit: "abc123".into(),
            conflicts: vec!["a".into()],
        };
        assert_eq!(conflicted.notice(), Some("Encountered a merge conflict."));
        assert_eq!(merge_message("b1", "master"), "Merged b1 into master.");
    }

    #[test]
    fn test_conflicted_files_sorted() {
        let plan = plan_merge(
            &table(&[("b", "0"), ("a", "0")]),
            &table(&[("b", "1"), ("a", "1")]),
            &table(&[("b", "2"), ("a", "2")]),
        );
        assert_eq!(plan.conflicted_files(), vec!["a".to_string(), "b".to_string()]);
    }
}
