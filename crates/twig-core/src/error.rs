//! Error types for twig operations.

use std::fmt;
use std::io;

/// Broad category of a [`TwigError`].
///
/// Everything except `Fatal` is a user-correctable condition: the CLI
/// prints the message and exits normally with a nonzero status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotInitialized,
    NotFound,
    AlreadyExists,
    PreconditionFailed,
    UntrackedFileConflict,
    /// The environment is broken (I/O or encoding failure).
    Fatal,
}

/// All possible twig errors.
#[derive(Debug)]
pub enum TwigError {
    /// The working tree has no `.twig/` directory.
    NotInitialized,
    /// A repository already exists in this directory.
    RepoAlreadyExists,
    /// The named file is not in the working tree.
    FileNotFound,
    /// The named file is not tracked by the requested commit.
    FileNotInCommit,
    /// No commit matches the given id.
    CommitNotFound(String),
    /// No branch with this name (checkout).
    NoSuchBranch(String),
    /// No branch with this name (branch removal, merge).
    BranchNotFound(String),
    BranchAlreadyExists(String),
    /// Branch names must be non-empty, without whitespace or `/`.
    InvalidBranchName(String),
    RemoteNotFound(String),
    RemoteAlreadyExists(String),
    /// The remote location holds no initialized repository.
    RemoteDirNotFound(String),
    /// The remote repository has no branch with this name.
    RemoteBranchNotFound(String),
    /// No commit carries the searched message.
    MessageNotFound,
    EmptyMessage,
    NothingToCommit,
    NoReasonToRemove,
    CannotRemoveCurrentBranch,
    AlreadyOnBranch,
    MergeWithSelf,
    UncommittedChanges,
    /// The remote tip is not an ancestor of the local tip.
    RejectedNonFastForward,
    /// Two different commits would share one short id.
    ShortIdCollision(String),
    /// Applying the operation would overwrite untracked work.
    UntrackedFileConflict,
    /// A path escapes the working tree.
    PathTraversal(String),
    /// The file's content is not valid UTF-8.
    NotText(String),
    Io(io::Error),
    Json(serde_json::Error),
    /// Persisted state violates a repository invariant.
    Corrupt(String),
}

impl TwigError {
    /// Map this error onto the user-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TwigError::NotInitialized => ErrorKind::NotInitialized,
            TwigError::FileNotFound
            | TwigError::FileNotInCommit
            | TwigError::CommitNotFound(_)
            | TwigError::NoSuchBranch(_)
            | TwigError::BranchNotFound(_)
            | TwigError::RemoteNotFound(_)
            | TwigError::RemoteDirNotFound(_)
            | TwigError::RemoteBranchNotFound(_)
            | TwigError::MessageNotFound => ErrorKind::NotFound,
            TwigError::RepoAlreadyExists
            | TwigError::BranchAlreadyExists(_)
            | TwigError::RemoteAlreadyExists(_) => ErrorKind::AlreadyExists,
            TwigError::EmptyMessage
            | TwigError::NothingToCommit
            | TwigError::NoReasonToRemove
            | TwigError::CannotRemoveCurrentBranch
            | TwigError::AlreadyOnBranch
            | TwigError::MergeWithSelf
            | TwigError::UncommittedChanges
            | TwigError::RejectedNonFastForward
            | TwigError::ShortIdCollision(_)
            | TwigError::InvalidBranchName(_)
            | TwigError::PathTraversal(_)
            | TwigError::NotText(_) => ErrorKind::PreconditionFailed,
            TwigError::UntrackedFileConflict => ErrorKind::UntrackedFileConflict,
            TwigError::Io(_) | TwigError::Json(_) | TwigError::Corrupt(_) => ErrorKind::Fatal,
        }
    }

    /// True for errors that indicate a broken environment rather than bad input.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

impl fmt::Display for TwigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TwigError::NotInitialized => write!(f, "Not in an initialized Twig directory."),
            TwigError::RepoAlreadyExists => write!(
                f,
                "A Twig version-control system already exists in the current directory."
            ),
            TwigError::FileNotFound => write!(f, "File does not exist."),
            TwigError::FileNotInCommit => write!(f, "File does not exist in that commit."),
            TwigError::CommitNotFound(_) => write!(f, "No commit with that id exists."),
            TwigError::NoSuchBranch(_) => write!(f, "No such branch exists."),
            TwigError::BranchNotFound(_) => write!(f, "A branch with that name does not exist."),
            TwigError::BranchAlreadyExists(_) => {
                write!(f, "A branch with that name already exists.")
            }
            TwigError::RemoteNotFound(_) => write!(f, "A remote with that name does not exist."),
            TwigError::RemoteAlreadyExists(_) => {
                write!(f, "A remote with that name already exists.")
            }
            TwigError::RemoteDirNotFound(_) => write!(f, "Remote directory not found."),
            TwigError::RemoteBranchNotFound(_) => {
                write!(f, "That remote does not have that branch.")
            }
            TwigError::MessageNotFound => write!(f, "Found no commit with that message."),
            TwigError::EmptyMessage => write!(f, "Please enter a commit message."),
            TwigError::NothingToCommit => write!(f, "No changes added to the commit."),
            TwigError::NoReasonToRemove => write!(f, "No reason to remove the file."),
            TwigError::CannotRemoveCurrentBranch => write!(f, "Cannot remove the current branch."),
            TwigError::AlreadyOnBranch => write!(f, "No need to checkout the current branch."),
            TwigError::MergeWithSelf => write!(f, "Cannot merge a branch with itself."),
            TwigError::UncommittedChanges => write!(f, "You have uncommitted changes."),
            TwigError::RejectedNonFastForward => {
                write!(f, "Please pull down remote changes before pushing.")
            }
            TwigError::ShortIdCollision(id) => {
                write!(f, "Commit id collision on abbreviated id {id}.")
            }
            TwigError::UntrackedFileConflict => write!(
                f,
                "There is an untracked file in the way; delete it, or add and commit it first."
            ),
            TwigError::InvalidBranchName(name) => write!(f, "Invalid branch name: {name}"),
            TwigError::PathTraversal(path) => write!(f, "Path escapes the working tree: {path}"),
            TwigError::NotText(path) => write!(f, "File is not UTF-8 text: {path}"),
            TwigError::Io(e) => write!(f, "I/O error: {e}"),
            TwigError::Json(e) => write!(f, "state encoding error: {e}"),
            TwigError::Corrupt(msg) => write!(f, "corrupt repository state: {msg}"),
        }
    }
}

impl std::error::Error for TwigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TwigError::Io(e) => Some(e),
            TwigError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TwigError {
    fn from(e: io::Error) -> Self {
        TwigError::Io(e)
    }
}

impl From<serde_json::Error> for TwigError {
    fn from(e: serde_json::Error) -> Self {
        TwigError::Json(e)
    }
}

/// Convenience alias for Results in twig.
pub type TwigResult<T> = Result<T, TwigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_taxonomy() {
        assert_eq!(TwigError::NotInitialized.kind(), ErrorKind::NotInitialized);
        assert_eq!(TwigError::FileNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(
            TwigError::BranchAlreadyExists("b".into()).kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(TwigError::NothingToCommit.kind(), ErrorKind::PreconditionFailed);
        assert_eq!(
            TwigError::NotText("bin.dat".into()).kind(),
            ErrorKind::PreconditionFailed
        );
        assert_eq!(
            TwigError::UntrackedFileConflict.kind(),
            ErrorKind::UntrackedFileConflict
        );
        let io = TwigError::from(io::Error::new(io::ErrorKind::Other, "disk"));
        assert!(io.is_fatal());
    }

    #[test]
    fn test_messages_are_single_line() {
        let errors = [
            TwigError::EmptyMessage,
            TwigError::UncommittedChanges,
            TwigError::RejectedNonFastForward,
            TwigError::UntrackedFileConflict,
        ];
        for e in &errors {
            assert!(!e.to_string().contains('\n'));
        }
    }
}
