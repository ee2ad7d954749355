//! Runtime configuration.
//!
//! A `Config` names the working tree explicitly; nothing in the library
//! reads the process's current directory on its own. Environment
//! variables override the defaults, and invalid values are ignored with
//! a warning.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use crate::branch::DEFAULT_BRANCH;

/// Name of the metadata directory at the working-tree root.
pub const META_DIR: &str = ".twig";

/// Overrides the working tree location.
pub const ENV_WORK_TREE: &str = "TWIG_WORK_TREE";
/// Overrides the branch `init` creates.
pub const ENV_DEFAULT_BRANCH: &str = "TWIG_DEFAULT_BRANCH";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root of the working tree; the metadata directory lives directly in it.
    pub work_tree: PathBuf,
    pub meta_dir_name: String,
    /// Branch created by `init`.
    pub default_branch: String,
}

impl Config {
    /// Defaults for a working tree rooted at `work_tree`.
    pub fn new(work_tree: impl Into<PathBuf>) -> Self {
        Config {
            work_tree: work_tree.into(),
            meta_dir_name: META_DIR.to_string(),
            default_branch: DEFAULT_BRANCH.to_string(),
        }
    }

    /// Configuration for the current directory with environment overrides.
    pub fn from_env() -> io::Result<Self> {
        let mut config = Config::new(env::current_dir()?);
        apply_env_overrides(&mut config);
        Ok(config)
    }

    pub fn meta_dir(&self) -> PathBuf {
        self.work_tree.join(&self.meta_dir_name)
    }

    /// Same settings, rooted at another working tree.
    pub fn with_work_tree(&self, work_tree: &Path) -> Self {
        Config {
            work_tree: work_tree.to_path_buf(),
            ..self.clone()
        }
    }
}

/// A branch name must be non-empty and free of whitespace and `/`.
///
/// Names containing `/` are reserved for remote-tracking branches.
pub fn is_valid_branch_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| c.is_whitespace() || c == '/')
}

pub fn apply_env_overrides(config: &mut Config) {
    apply_env_overrides_from(config, |key| env::var(key).ok());
}

fn apply_env_overrides_from<F>(config: &mut Config, mut lookup: F)
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(ENV_WORK_TREE) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let path = config.work_tree.join(trimmed);
            if path.is_dir() {
                config.work_tree = path;
            } else {
                tracing::warn!("invalid {ENV_WORK_TREE}, not a directory, ignoring: {raw}");
            }
        }
    }

    if let Some(raw) = lookup(ENV_DEFAULT_BRANCH) {
        let trimmed = raw.trim();
        if is_valid_branch_name(trimmed) {
            config.default_branch = trimmed.to_string();
        } else {
            tracing::warn!("invalid {ENV_DEFAULT_BRANCH}, ignoring: {raw:?}");
        }
    }
}
