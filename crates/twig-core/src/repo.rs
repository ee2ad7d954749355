//! Repository: the main entry point for twig operations.
//!
//! A Repository binds the persisted [`RepoState`] to a working tree.
//! Every operation is one load → mutate → write working tree → save
//! cycle; nothing is cached between calls.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::info;

use crate::commit::{Commit, FileTable, Snapshot};
use crate::config::{is_valid_branch_name, Config};
use crate::error::{TwigError, TwigResult};
use crate::fsutil::{read_bytes, read_text, remove_file, resolve_in, write_text};
use crate::graph;
use crate::ignore::IgnoreRules;
use crate::merge::{self, FileAction, MergeOutcome};
use crate::remote::{self, FetchResult, PullResult, PushResult};
use crate::state::RepoState;
use crate::status::{self, WorkingFiles, WorkspaceStatus};
use crate::store::{JsonFileStore, StateStore};

/// A twig repository.
pub struct Repository {
    config: Config,
    /// Path to the metadata directory.
    meta_dir: PathBuf,
    store: Box<dyn StateStore>,
}

impl Repository {
    /// Initialize a new repository in the configured working tree.
    ///
    /// Creates the metadata directory and the root commit on the default
    /// branch.
    pub fn init(config: &Config) -> TwigResult<Self> {
        let meta_dir = config.meta_dir();
        if meta_dir.exists() {
            return Err(TwigError::RepoAlreadyExists);
        }
        fs::create_dir_all(&meta_dir)?;

        let repo = Self::with_store(config, Box::new(JsonFileStore::new(&meta_dir)));
        let state = RepoState::init(&config.default_branch);
        repo.store.save(&state)?;
        info!(root = %config.work_tree.display(), branch = %config.default_branch, "initialized repository");
        Ok(repo)
    }

    /// Open an existing repository in the configured working tree.
    pub fn open(config: &Config) -> TwigResult<Self> {
        let meta_dir = config.meta_dir();
        if !meta_dir.is_dir() {
            return Err(TwigError::NotInitialized);
        }
        Ok(Self::with_store(config, Box::new(JsonFileStore::new(&meta_dir))))
    }

    fn with_store(config: &Config, store: Box<dyn StateStore>) -> Self {
        Repository {
            config: config.clone(),
            meta_dir: config.meta_dir(),
            store,
        }
    }

    /// Root of the working tree.
    pub fn root(&self) -> &Path {
        &self.config.work_tree
    }

    /// The persisted state.
    pub fn state(&self) -> TwigResult<RepoState> {
        self.store.load()?.ok_or(TwigError::NotInitialized)
    }

    fn save(&self, state: &RepoState) -> TwigResult<()> {
        self.store.save(state)
    }

    fn working_files(&self, state: &RepoState) -> TwigResult<WorkingFiles> {
        let rules = IgnoreRules::load(self.root(), &self.config.meta_dir_name);
        let tracked = state
            .head_commit()?
            .files
            .keys()
            .chain(state.stage.addition.keys())
            .map(String::as_str);
        status::scan_workspace(self.root(), &rules, tracked)
    }

    /// Normalize a user-supplied file argument to a tracked name and its path.
    fn resolve_file(&self, file: &str) -> TwigResult<(String, PathBuf)> {
        resolve_in(self.root(), file)?;
        let parts: Vec<String> = Path::new(file)
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if parts.is_empty() || parts[0] == self.config.meta_dir_name {
            return Err(TwigError::PathTraversal(file.to_string()));
        }
        let name = parts.join("/");
        let path = self.root().join(&name);
        Ok((name, path))
    }

    // -----------------------------------------------------------------------
    // Staging and committing
    // -----------------------------------------------------------------------

    /// Stage a file's current content for the next commit.
    ///
    /// A file whose content matches HEAD is un-staged instead. Content
    /// that is not UTF-8 text is refused.
    pub fn add(&self, file: &str) -> TwigResult<()> {
        let mut state = self.state()?;
        let (name, path) = self.resolve_file(file)?;
        if !path.is_file() {
            return Err(TwigError::FileNotFound);
        }
        let content = read_text(&path)?.ok_or(TwigError::FileNotFound)?;

        state.stage.unstage_removal(&name);
        if state.head_commit()?.content(&name) == Some(content.as_str()) {
            state.stage.unstage_addition(&name);
        } else {
            state.stage.stage_addition(&name, Snapshot::new(content));
        }
        self.save(&state)
    }

    /// Record the staged changes as a new commit on the current branch.
    pub fn commit(&self, message: &str) -> TwigResult<Commit> {
        if message.is_empty() {
            return Err(TwigError::EmptyMessage);
        }
        let mut state = self.state()?;
        if state.stage.is_empty() {
            return Err(TwigError::NothingToCommit);
        }

        let files = state.stage.apply_to(&state.head_commit()?.files);
        let commit = Commit::new(message, Some(state.head.clone()), None, files);
        let key = commit.short_id().to_string();
        state.insert_commit(commit.clone())?;
        state.advance_head(&key);
        state.stage.clear();
        self.save(&state)?;

        info!(commit = %key, branch = %state.current_branch, "committed");
        Ok(commit)
    }

    /// Un-stage a file, and stop tracking it if HEAD tracks it.
    pub fn rm(&self, file: &str) -> TwigResult<()> {
        let mut state = self.state()?;
        let (name, path) = self.resolve_file(file)?;
        let committed = state.head_commit()?.files.get(&name).cloned();

        if !state.stage.is_staged_for_addition(&name) && committed.is_none() {
            return Err(TwigError::NoReasonToRemove);
        }
        state.stage.unstage_addition(&name);

        if let Some(committed) = committed {
            state.stage.stage_removal(&name, committed);
            remove_file(&path, self.root())?;
        }
        self.save(&state)
    }

    // -----------------------------------------------------------------------
    // History queries
    // -----------------------------------------------------------------------

    /// First-parent history from HEAD back to the root commit.
    pub fn log(&self) -> TwigResult<Vec<Commit>> {
        let state = self.state()?;
        let chain = graph::first_parent_chain(&state.commits, &state.head)?;
        Ok(chain.into_iter().cloned().collect())
    }

    /// Every commit ever made, ordered by short id.
    pub fn global_log(&self) -> TwigResult<Vec<Commit>> {
        Ok(self.state()?.commits.into_values().collect())
    }

    /// Full ids of the commits whose message is exactly `message`.
    pub fn find(&self, message: &str) -> TwigResult<Vec<String>> {
        let ids: Vec<String> = self
            .state()?
            .commits
            .into_values()
            .filter(|c| c.message == message)
            .map(|c| c.id)
            .collect();
        if ids.is_empty() {
            return Err(TwigError::MessageNotFound);
        }
        Ok(ids)
    }

    pub fn status(&self) -> TwigResult<WorkspaceStatus> {
        let state = self.state()?;
        status::compute_status(&state, &self.working_files(&state)?)
    }

    // -----------------------------------------------------------------------
    // Checkout, branches, reset
    // -----------------------------------------------------------------------

    /// Restore one file from HEAD. The staging index is untouched.
    pub fn checkout_file(&self, file: &str) -> TwigResult<()> {
        let state = self.state()?;
        let head = state.head.clone();
        self.restore_file(&state, &head, file)
    }

    /// Restore one file from the commit `id` (full or abbreviated).
    pub fn checkout_commit_file(&self, id: &str, file: &str) -> TwigResult<()> {
        let state = self.state()?;
        let key = state.resolve_commit_id(id)?.short_id().to_string();
        self.restore_file(&state, &key, file)
    }

    fn restore_file(&self, state: &RepoState, commit: &str, file: &str) -> TwigResult<()> {
        let (name, path) = self.resolve_file(file)?;
        let content = state
            .commit(commit)?
            .content(&name)
            .ok_or(TwigError::FileNotInCommit)?;
        write_text(&path, content)
    }

    /// Switch to another branch, replacing the working tree with its tip.
    pub fn checkout_branch(&self, name: &str) -> TwigResult<()> {
        let mut state = self.state()?;
        let target = state
            .branch(name)
            .ok_or_else(|| TwigError::NoSuchBranch(name.to_string()))?
            .commit
            .clone();
        if name == state.current_branch {
            return Err(TwigError::AlreadyOnBranch);
        }

        self.switch_tree(&mut state, &target)?;
        state.current_branch = name.to_string();
        state.head = target;
        self.save(&state)?;
        info!(branch = name, "checked out branch");
        Ok(())
    }

    /// Create a branch at HEAD. Does not switch to it.
    pub fn branch(&self, name: &str) -> TwigResult<()> {
        if !is_valid_branch_name(name) {
            return Err(TwigError::InvalidBranchName(name.to_string()));
        }
        let mut state = self.state()?;
        if state.branch(name).is_some() {
            return Err(TwigError::BranchAlreadyExists(name.to_string()));
        }
        let head = state.head.clone();
        state.set_branch(name, &head);
        self.save(&state)
    }

    /// Delete a branch pointer. Its commits stay in the store.
    pub fn rm_branch(&self, name: &str) -> TwigResult<()> {
        let mut state = self.state()?;
        if state.branch(name).is_none() {
            return Err(TwigError::BranchNotFound(name.to_string()));
        }
        if name == state.current_branch {
            return Err(TwigError::CannotRemoveCurrentBranch);
        }
        state.branches.remove(name);
        self.save(&state)
    }

    /// Move the current branch to `id` and check out its tree.
    pub fn reset(&self, id: &str) -> TwigResult<()> {
        let mut state = self.state()?;
        let target = state.resolve_commit_id(id)?.short_id().to_string();
        self.switch_tree(&mut state, &target)?;
        state.advance_head(&target);
        self.save(&state)?;
        info!(commit = %target, branch = %state.current_branch, "reset");
        Ok(())
    }

    /// Refuse to touch a working file that is untracked by `current` and
    /// would be overwritten with different content from `target`.
    ///
    /// Reads the disk directly: ignore rules do not protect a file from
    /// being overwritten.
    fn check_untracked(&self, current: &FileTable, target: &FileTable) -> TwigResult<()> {
        for (name, snapshot) in target {
            if current.contains_key(name) {
                continue;
            }
            let on_disk = read_bytes(&resolve_in(self.root(), name)?)?;
            if on_disk.is_some_and(|bytes| bytes != snapshot.content().as_bytes()) {
                return Err(TwigError::UntrackedFileConflict);
            }
        }
        Ok(())
    }

    /// Replace the working tree of HEAD with the tree of `target` and clear
    /// the staging index. The caller moves HEAD and the branch pointer.
    fn switch_tree(&self, state: &mut RepoState, target: &str) -> TwigResult<()> {
        let current = state.head_commit()?.files.clone();
        let target = state.commit(target)?.files.clone();
        self.check_untracked(&current, &target)?;

        for name in current.keys() {
            if !target.contains_key(name) {
                remove_file(&resolve_in(self.root(), name)?, self.root())?;
            }
        }
        for (name, snapshot) in &target {
            write_text(&resolve_in(self.root(), name)?, snapshot.content())?;
        }
        state.stage.clear();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Merge
    // -----------------------------------------------------------------------

    /// Merge the branch `given` into the current branch.
    pub fn merge(&self, given: &str) -> TwigResult<MergeOutcome> {
        let mut state = self.state()?;
        let given_key = state
            .branch(given)
            .ok_or_else(|| TwigError::BranchNotFound(given.to_string()))?
            .commit
            .clone();
        if given == state.current_branch {
            return Err(TwigError::MergeWithSelf);
        }
        let current_key = state.head.clone();
        let current = state.head_commit()?.files.clone();
        let given_files = state.commit(&given_key)?.files.clone();
        self.check_untracked(&current, &given_files)?;
        if !state.stage.is_empty() {
            return Err(TwigError::UncommittedChanges);
        }

        let split = graph::split_point(&state.commits, &current_key, &given_key)?;
        if split == given_key {
            return Ok(MergeOutcome::GivenIsAncestor);
        }
        if split == current_key {
            self.switch_tree(&mut state, &given_key)?;
            state.advance_head(&given_key);
            self.save(&state)?;
            info!(branch = %state.current_branch, commit = %given_key, "fast-forwarded");
            return Ok(MergeOutcome::FastForwarded { commit: given_key });
        }

        let plan = merge::plan_merge(&state.commit(&split)?.files, &current, &given_files);
        for (name, action) in &plan.actions {
            let path = resolve_in(self.root(), name)?;
            match action {
                FileAction::TakeGiven(content) | FileAction::Conflict(content) => {
                    write_text(&path, content)?;
                }
                FileAction::Remove(_) => {
                    remove_file(&path, self.root())?;
                }
                FileAction::KeepRemoved(_) => {}
            }
        }
        plan.stage_into(&mut state.stage);

        let files = state.stage.apply_to(&current);
        let message = merge::merge_message(given, &state.current_branch);
        let commit = Commit::new(message, Some(current_key), Some(given_key), files);
        let key = commit.short_id().to_string();
        state.insert_commit(commit.clone())?;
        state.advance_head(&key);
        state.stage.clear();
        self.save(&state)?;

        let conflicts = plan.conflicted_files();
        info!(commit = %key, given, conflicts = conflicts.len(), "merged");
        Ok(MergeOutcome::Merged {
            commit: commit.id,
            conflicts,
        })
    }

    // -----------------------------------------------------------------------
    // Remotes
    // -----------------------------------------------------------------------

    /// Register a remote repository at `location`.
    ///
    /// The location may name the remote's working tree or its metadata
    /// directory; relative locations are resolved against this working tree.
    pub fn add_remote(&self, name: &str, location: &str) -> TwigResult<()> {
        let mut state = self.state()?;
        if state.remotes.contains_key(name) {
            return Err(TwigError::RemoteAlreadyExists(name.to_string()));
        }
        state.remotes.insert(name.to_string(), location.to_string());
        self.save(&state)
    }

    pub fn rm_remote(&self, name: &str) -> TwigResult<()> {
        let mut state = self.state()?;
        if state.remotes.remove(name).is_none() {
            return Err(TwigError::RemoteNotFound(name.to_string()));
        }
        self.save(&state)
    }

    fn open_remote(&self, state: &RepoState, name: &str) -> TwigResult<Repository> {
        let location = state
            .remotes
            .get(name)
            .ok_or_else(|| TwigError::RemoteNotFound(name.to_string()))?;
        let mut work_tree = self.root().join(location);
        if work_tree
            .file_name()
            .is_some_and(|f| f == self.config.meta_dir_name.as_str())
        {
            if let Some(parent) = work_tree.parent() {
                work_tree = parent.to_path_buf();
            }
        }
        let config = self.config.with_work_tree(&work_tree);
        if !config.meta_dir().is_dir() {
            return Err(TwigError::RemoteDirNotFound(location.clone()));
        }
        Repository::open(&config)
    }

    /// Push the local branch `branch` to the same-named branch of a remote.
    pub fn push(&self, remote_name: &str, branch: &str) -> TwigResult<PushResult> {
        let local = self.state()?;
        let remote_repo = self.open_remote(&local, remote_name)?;
        let mut remote_state = remote_repo.state()?;

        let result = remote::push_branch(&local, &mut remote_state, remote_name, branch)?;
        if result.branch_updated {
            remote_repo.save(&remote_state)?;
        }
        info!(
            remote = remote_name,
            branch,
            commits = result.commits_pushed,
            "pushed"
        );
        Ok(result)
    }

    /// Copy a remote branch into the local branch `{remote}/{branch}`.
    pub fn fetch(&self, remote_name: &str, branch: &str) -> TwigResult<FetchResult> {
        let mut local = self.state()?;
        let remote_state = self.open_remote(&local, remote_name)?.state()?;

        let result = remote::fetch_branch(&mut local, &remote_state, remote_name, branch)?;
        self.save(&local)?;
        info!(
            remote = remote_name,
            branch,
            commits = result.commits_fetched,
            "fetched"
        );
        Ok(result)
    }

    /// Fetch a remote branch, then merge its tracking branch.
    pub fn pull(&self, remote_name: &str, branch: &str) -> TwigResult<PullResult> {
        let fetch = self.fetch(remote_name, branch)?;
        let merge = self.merge(&fetch.tracking_branch)?;
        Ok(PullResult { fetch, merge })
    }

    /// Path to the metadata directory.
    pub fn meta_dir(&self) -> &Path {
        &self.meta_dir
    }
}
