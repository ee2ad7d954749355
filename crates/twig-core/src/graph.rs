//! Commit-graph traversal and split-point search.
//!
//! History is walked breadth-first over an explicit worklist. Merge
//! commits contribute both parents, first parent before second, and a
//! commit is enqueued at most once, at the earliest generation it is
//! reached.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::commit::Commit;
use crate::error::{TwigError, TwigResult};

/// Short id → commit, as held by [`crate::state::RepoState`].
pub type CommitStore = BTreeMap<String, Commit>;

fn lookup<'a>(commits: &'a CommitStore, key: &str) -> TwigResult<&'a Commit> {
    commits
        .get(key)
        .ok_or_else(|| TwigError::Corrupt(format!("missing commit {key}")))
}

/// Breadth-first generations of `tip`'s ancestry, `tip` first.
///
/// Traversal does not continue through any commit for which `stop`
/// returns true; such commits are left out of the result.
pub fn generations_until<F>(
    commits: &CommitStore,
    tip: &str,
    stop: F,
) -> TwigResult<Vec<Vec<String>>>
where
    F: Fn(&str) -> bool,
{
    let mut result = Vec::new();
    if stop(tip) {
        return Ok(result);
    }
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(tip.to_string());
    let mut layer = vec![tip.to_string()];

    while !layer.is_empty() {
        let mut next = Vec::new();
        for key in &layer {
            let commit = lookup(commits, key)?;
            for parent in commit.parents() {
                if stop(parent) || seen.contains(parent) {
                    continue;
                }
                seen.insert(parent.to_string());
                next.push(parent.to_string());
            }
        }
        result.push(layer);
        layer = next;
    }
    Ok(result)
}

/// Breadth-first generations of `tip`'s full ancestry.
pub fn generations(commits: &CommitStore, tip: &str) -> TwigResult<Vec<Vec<String>>> {
    generations_until(commits, tip, |_| false)
}

/// Every ancestor of `tip` (inclusive), closest generations first.
pub fn ancestor_sequence(commits: &CommitStore, tip: &str) -> TwigResult<Vec<String>> {
    Ok(generations(commits, tip)?.into_iter().flatten().collect())
}

/// True if `ancestor` is reachable from `tip` (a commit is its own ancestor).
pub fn is_ancestor(commits: &CommitStore, ancestor: &str, tip: &str) -> TwigResult<bool> {
    Ok(ancestor_sequence(commits, tip)?
        .iter()
        .any(|key| key == ancestor))
}

/// Find the merge base of `current` and `given`.
///
/// Walks `current`'s ancestor sequence in order and returns the first
/// commit that also appears in `given`'s sequence. This is deterministic
/// but order-dependent: in criss-cross histories it can pick a common
/// ancestor that is not the lowest one. Merge relies on this exact
/// tie-break to recognize fast-forwards, so it is kept as is.
pub fn split_point(commits: &CommitStore, current: &str, given: &str) -> TwigResult<String> {
    if current == given {
        return Ok(current.to_string());
    }
    let given_ancestors: HashSet<String> = ancestor_sequence(commits, given)?.into_iter().collect();
    let split = ancestor_sequence(commits, current)?
        .into_iter()
        .find(|key| given_ancestors.contains(key))
        .ok_or_else(|| {
            TwigError::Corrupt(format!("{current} and {given} share no common ancestor"))
        })?;
    debug!(current, given, split = %split, "found split point");
    Ok(split)
}

/// First-parent history from `tip` back to the root.
pub fn first_parent_chain<'a>(commits: &'a CommitStore, tip: &str) -> TwigResult<Vec<&'a Commit>> {
    let mut chain = Vec::new();
    let mut next = Some(tip.to_string());
    while let Some(key) = next {
        let commit = lookup(commits, &key)?;
        next = commit.parent.clone();
        chain.push(commit);
    }
    Ok(chain)
}
