//! Remote synchronization: moving commit subgraphs between two states.
//!
//! A remote is another repository on the local filesystem, loaded
//! through the same [`crate::store::StateStore`] as the local one. The
//! functions here are pure: they mutate one in-memory `RepoState` from
//! another, and the repository takes care of loading and saving both.

use serde::Serialize;
use tracing::debug;

use crate::branch::tracking_name;
use crate::error::{TwigError, TwigResult};
use crate::graph;
use crate::merge::MergeOutcome;
use crate::state::RepoState;

// ---------------------------------------------------------------------------
// Operation results
// ---------------------------------------------------------------------------

/// Result of a push operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushResult {
    pub remote: String,
    pub branch: String,
    pub commits_pushed: usize,
    pub branch_created: bool,
    /// False when the remote branch already pointed at the local tip.
    pub branch_updated: bool,
}

/// Result of a fetch operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchResult {
    pub remote: String,
    pub branch: String,
    /// Local branch that now tracks the remote tip.
    pub tracking_branch: String,
    pub commits_fetched: usize,
    pub branch_created: bool,
}

/// Result of a pull: the fetch, then the merge of the tracking branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullResult {
    pub fetch: FetchResult,
    pub merge: MergeOutcome,
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

/// Copy `tip` and every ancestor of it from `src` into `dst`.
///
/// Returns the number of commits `dst` did not already have.
pub fn copy_closure(src: &RepoState, dst: &mut RepoState, tip: &str) -> TwigResult<usize> {
    let mut copied = 0;
    for key in graph::ancestor_sequence(&src.commits, tip)? {
        if dst.insert_commit(src.commit(&key)?.clone())? {
            copied += 1;
        }
    }
    Ok(copied)
}

/// Push `branch` from `local` into `remote`.
///
/// A branch the remote lacks is created with the full ancestor closure of
/// the local tip. An existing remote branch only moves forward: its tip
/// must be an ancestor of the local tip. The remote's HEAD follows the
/// branch when it is the remote's current branch.
pub fn push_branch(
    local: &RepoState,
    remote: &mut RepoState,
    remote_name: &str,
    branch: &str,
) -> TwigResult<PushResult> {
    let local_tip = local
        .branch(branch)
        .ok_or_else(|| TwigError::NoSuchBranch(branch.to_string()))?
        .commit
        .clone();

    let mut result = PushResult {
        remote: remote_name.to_string(),
        branch: branch.to_string(),
        commits_pushed: 0,
        branch_created: false,
        branch_updated: false,
    };

    match remote.branch(branch).map(|b| b.commit.clone()) {
        None => {
            result.commits_pushed = copy_closure(local, remote, &local_tip)?;
            result.branch_created = true;
        }
        Some(remote_tip) if remote_tip == local_tip => return Ok(result),
        Some(remote_tip) => {
            if !graph::is_ancestor(&local.commits, &remote_tip, &local_tip)? {
                return Err(TwigError::RejectedNonFastForward);
            }
            let generations =
                graph::generations_until(&local.commits, &local_tip, |key| key == remote_tip)?;
            for key in generations.iter().flatten() {
                if remote.insert_commit(local.commit(key)?.clone())? {
                    result.commits_pushed += 1;
                }
            }
        }
    }

    remote.set_branch(branch, &local_tip);
    if remote.current_branch == branch {
        remote.head = local_tip.clone();
    }
    result.branch_updated = true;
    debug!(remote = remote_name, branch, commits = result.commits_pushed, "pushed branch");
    Ok(result)
}

/// Fetch `branch` from `remote` into `local` as `{remote_name}/{branch}`.
///
/// The working tree is not touched.
pub fn fetch_branch(
    local: &mut RepoState,
    remote: &RepoState,
    remote_name: &str,
    branch: &str,
) -> TwigResult<FetchResult> {
    let remote_tip = remote
        .branch(branch)
        .ok_or_else(|| TwigError::RemoteBranchNotFound(branch.to_string()))?
        .commit
        .clone();

    let commits_fetched = copy_closure(remote, local, &remote_tip)?;
    let tracking_branch = tracking_name(remote_name, branch);
    let branch_created = local.branch(&tracking_branch).is_none();
    local.set_branch(&tracking_branch, &remote_tip);
    if local.current_branch == tracking_branch {
        local.head = remote_tip.clone();
    }
    debug!(remote = remote_name, branch, commits = commits_fetched, "fetched branch");

    Ok(FetchResult {
        remote: remote_name.to_string(),
        branch: branch.to_string(),
        tracking_branch,
        commits_fetched,
        branch_created,
    })
}
