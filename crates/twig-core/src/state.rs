//! Repository state: the aggregate root.
//!
//! `RepoState` owns every commit, branch, the staging index, HEAD, the
//! current branch name and the remote registry. It is purely in-memory;
//! loading and saving go through [`crate::store::StateStore`], and
//! working-tree effects live in [`crate::repo::Repository`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::branch::Branch;
use crate::commit::Commit;
use crate::error::{TwigError, TwigResult};
use crate::hash::{short_id, SHORT_ID_LEN};
use crate::index::StagingIndex;

/// The full persisted state of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoState {
    /// Short id → commit. Append-only.
    pub commits: BTreeMap<String, Commit>,
    /// Branch name → branch.
    pub branches: BTreeMap<String, Branch>,
    pub stage: StagingIndex,
    /// Short id of the checked-out commit.
    pub head: String,
    pub current_branch: String,
    /// Remote name → location of the remote repository.
    pub remotes: BTreeMap<String, String>,
}

impl RepoState {
    /// Fresh state: the root commit with one branch pointing at it.
    pub fn init(default_branch: &str) -> Self {
        let root = Commit::root();
        let key = root.short_id().to_string();
        let mut commits = BTreeMap::new();
        commits.insert(key.clone(), root);
        let mut branches = BTreeMap::new();
        branches.insert(
            default_branch.to_string(),
            Branch::new(default_branch, key.clone()),
        );
        RepoState {
            commits,
            branches,
            stage: StagingIndex::default(),
            head: key,
            current_branch: default_branch.to_string(),
            remotes: BTreeMap::new(),
        }
    }

    /// Look up a commit that the state itself references.
    ///
    /// A dangling internal reference means the state is corrupt.
    pub fn commit(&self, key: &str) -> TwigResult<&Commit> {
        self.commits
            .get(key)
            .ok_or_else(|| TwigError::Corrupt(format!("missing commit {key}")))
    }

    /// Resolve a user-supplied id (full, or any prefix of at least 6 chars).
    pub fn resolve_commit_id(&self, id: &str) -> TwigResult<&Commit> {
        if id.len() < SHORT_ID_LEN || !id.is_char_boundary(SHORT_ID_LEN) {
            return Err(TwigError::CommitNotFound(id.to_string()));
        }
        match self.commits.get(&id[..SHORT_ID_LEN]) {
            Some(commit) if commit.id.starts_with(id) => Ok(commit),
            _ => Err(TwigError::CommitNotFound(id.to_string())),
        }
    }

    /// Insert a commit into the store.
    ///
    /// Returns `Ok(false)` if the identical commit is already present.
    /// A different commit with the same short id is rejected.
    pub fn insert_commit(&mut self, commit: Commit) -> TwigResult<bool> {
        let key = commit.short_id().to_string();
        if let Some(existing) = self.commits.get(&key) {
            if existing.id == commit.id {
                return Ok(false);
            }
            return Err(TwigError::ShortIdCollision(key));
        }
        self.commits.insert(key, commit);
        Ok(true)
    }

    pub fn head_commit(&self) -> TwigResult<&Commit> {
        self.commit(&self.head)
    }

    pub fn branch(&self, name: &str) -> Option<&Branch> {
        self.branches.get(name)
    }

    /// The commit a branch points at.
    pub fn branch_tip(&self, name: &str) -> TwigResult<&Commit> {
        let branch = self
            .branches
            .get(name)
            .ok_or_else(|| TwigError::BranchNotFound(name.to_string()))?;
        self.commit(&branch.commit)
    }

    /// Create or re-point a branch.
    pub fn set_branch(&mut self, name: &str, commit: &str) {
        match self.branches.get_mut(name) {
            Some(branch) => branch.switch_pointer(commit),
            None => {
                self.branches
                    .insert(name.to_string(), Branch::new(name, commit));
            }
        }
    }

    /// Move HEAD and the current branch to `commit`.
    pub fn advance_head(&mut self, commit: &str) {
        let current = self.current_branch.clone();
        self.set_branch(&current, commit);
        self.head = commit.to_string();
    }

    /// Check the invariants a loaded state must satisfy.
    pub fn validate(&self) -> TwigResult<()> {
        for (key, commit) in &self.commits {
            if key != short_id(&commit.id) {
                return Err(TwigError::Corrupt(format!(
                    "commit {} stored under key {key}",
                    commit.id
                )));
            }
            if !commit.verify_id() {
                return Err(TwigError::Corrupt(format!(
                    "commit {} does not match its content",
                    commit.id
                )));
            }
            for parent in commit.parents() {
                self.commit(parent)?;
            }
        }
        for branch in self.branches.values() {
            self.commit(&branch.commit)?;
        }
        let current = self.branches.get(&self.current_branch).ok_or_else(|| {
            TwigError::Corrupt(format!("current branch {} missing", self.current_branch))
        })?;
        if current.commit != self.head {
            return Err(TwigError::Corrupt(format!(
                "HEAD {} does not match branch {} at {}",
                self.head, current.name, current.commit
            )));
        }
        Ok(())
    }
}
