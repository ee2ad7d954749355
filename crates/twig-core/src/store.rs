//! State persistence.
//!
//! The whole [`RepoState`] aggregate is loaded at the start of every
//! operation and saved at the end. `StateStore` is the seam; the only
//! implementation writes one JSON document into the metadata directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{TwigError, TwigResult};
use crate::fsutil::atomic_write;
use crate::state::RepoState;

/// File name of the state document inside the metadata directory.
pub const STATE_FILE: &str = "state.json";

/// Loads and saves a repository's state.
pub trait StateStore {
    /// The persisted state, or `None` if nothing has been saved yet.
    fn load(&self) -> TwigResult<Option<RepoState>>;

    fn save(&self, state: &RepoState) -> TwigResult<()>;
}

/// Stores the state as pretty-printed JSON, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// A store for the repository whose metadata lives in `meta_dir`.
    pub fn new(meta_dir: &Path) -> Self {
        JsonFileStore {
            path: meta_dir.join(STATE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> TwigResult<Option<RepoState>> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state: RepoState = serde_json::from_str(&data)?;
        state.validate()?;
        debug!(path = %self.path.display(), commits = state.commits.len(), "loaded state");
        Ok(Some(state))
    }

    fn save(&self, state: &RepoState) -> TwigResult<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| TwigError::Corrupt(format!("no parent for {}", self.path.display())))?;
        if !parent.is_dir() {
            return Err(TwigError::NotInitialized);
        }
        let json = serde_json::to_string_pretty(state)?;
        atomic_write(&self.path, json.as_bytes())?;
        debug!(path = %self.path.display(), "saved state");
        Ok(())
    }
}
