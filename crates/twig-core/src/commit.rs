//! Commits: immutable nodes of the history DAG.
//!
//! A commit records a message, a timestamp, up to two parents and the
//! complete table of tracked files at that point in history (a full
//! snapshot, not a delta).

use std::collections::BTreeMap;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::hash::{hash_fields, short_id};

/// Message of the root commit created by `init`.
pub const ROOT_MESSAGE: &str = "initial commit";

/// Timestamp of the root commit (the Unix epoch, UTC).
pub const ROOT_TIMESTAMP: &str = "Thu Jan 1 00:00:00 1970 +0000";

/// `chrono` format used for every commit timestamp.
pub const TIMESTAMP_FORMAT: &str = "%a %b %-d %H:%M:%S %Y %z";

/// The content of one file at one point in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    pub content: String,
}

impl Snapshot {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Filename → snapshot table of a commit.
pub type FileTable = BTreeMap<String, Snapshot>;

/// An immutable commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Commit {
    /// Full SHA-256 identity.
    pub id: String,
    pub message: String,
    pub timestamp: String,
    /// Short id of the first parent (None only for the root commit).
    pub parent: Option<String>,
    /// Short id of the merged-in parent (merge commits only).
    pub second_parent: Option<String>,
    /// Every tracked file at this point in history.
    pub files: FileTable,
}

impl Commit {
    /// The root commit every repository starts from.
    ///
    /// Its identity is the same in every repository, which lets
    /// independently initialized repositories exchange history.
    pub fn root() -> Self {
        Self::with_timestamp(ROOT_MESSAGE, ROOT_TIMESTAMP, None, None, FileTable::new())
    }

    /// Create a commit stamped with the local wall clock.
    pub fn new(
        message: impl Into<String>,
        parent: Option<String>,
        second_parent: Option<String>,
        files: FileTable,
    ) -> Self {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        Self::with_timestamp(message, timestamp, parent, second_parent, files)
    }

    /// Create a commit with an explicit timestamp and compute its id.
    ///
    /// The id covers the message, timestamp, both parents and the full
    /// file table, so two distinct trees never share an identity.
    pub fn with_timestamp(
        message: impl Into<String>,
        timestamp: impl Into<String>,
        parent: Option<String>,
        second_parent: Option<String>,
        files: FileTable,
    ) -> Self {
        let message = message.into();
        let timestamp = timestamp.into();
        let id = Self::compute_id(
            &message,
            &timestamp,
            parent.as_deref(),
            second_parent.as_deref(),
            &files,
        );
        Commit {
            id,
            message,
            timestamp,
            parent,
            second_parent,
            files,
        }
    }

    fn compute_id(
        message: &str,
        timestamp: &str,
        parent: Option<&str>,
        second_parent: Option<&str>,
        files: &FileTable,
    ) -> String {
        let mut fields: Vec<&[u8]> = vec![
            message.as_bytes(),
            timestamp.as_bytes(),
            parent.unwrap_or("").as_bytes(),
            second_parent.unwrap_or("").as_bytes(),
        ];
        for (name, snapshot) in files {
            fields.push(name.as_bytes());
            fields.push(snapshot.content.as_bytes());
        }
        hash_fields(fields)
    }

    /// True if the stored id matches the commit's content.
    pub fn verify_id(&self) -> bool {
        self.id
            == Self::compute_id(
                &self.message,
                &self.timestamp,
                self.parent.as_deref(),
                self.second_parent.as_deref(),
                &self.files,
            )
    }

    /// The 6-character primary key of this commit.
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    pub fn is_merge(&self) -> bool {
        self.second_parent.is_some()
    }

    /// Parents in traversal order: first parent, then second.
    pub fn parents(&self) -> impl Iterator<Item = &str> {
        self.parent
            .as_deref()
            .into_iter()
            .chain(self.second_parent.as_deref())
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Content of a tracked file, if present.
    pub fn content(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(Snapshot::content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn table(entries: &[(&str, &str)]) -> FileTable {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), Snapshot::new(*v)))
            .collect()
    }

    #[test]
    fn test_root_is_deterministic() {
        let a = Commit::root();
        let b = Commit::root();
        assert_eq!(a.id, b.id);
        assert_eq!(a.timestamp, ROOT_TIMESTAMP);
        assert!(a.parent.is_none());
        assert!(a.files.is_empty());
    }

    #[test]
    fn test_root_timestamp_matches_format() {
        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(epoch.format(TIMESTAMP_FORMAT).to_string(), ROOT_TIMESTAMP);
    }

    #[test]
    fn test_id_covers_file_table() {
        let parent = Some(Commit::root().short_id().to_string());
        let a = Commit::with_timestamp("m", "t", parent.clone(), None, table(&[("a", "1")]));
        let b = Commit::with_timestamp("m", "t", parent, None, table(&[("a", "2")]));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_id_covers_message_and_parents() {
        let a = Commit::with_timestamp("m1", "t", Some("aaaaaa".into()), None, FileTable::new());
        let b = Commit::with_timestamp("m2", "t", Some("aaaaaa".into()), None, FileTable::new());
        let c = Commit::with_timestamp(
            "m1",
            "t",
            Some("aaaaaa".into()),
            Some("bbbbbb".into()),
            FileTable::new(),
        );
        assert_ne!(a.id, b.id);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn test_parents_order() {
        let c = Commit::with_timestamp(
            "merge",
            "t",
            Some("aaaaaa".into()),
            Some("bbbbbb".into()),
            FileTable::new(),
        );
        assert!(c.is_merge());
        assert_eq!(c.parents().collect::<Vec<_>>(), vec!["aaaaaa", "bbbbbb"]);
        assert_eq!(Commit::root().parents().count(), 0);
    }

    #[test]
    fn test_verify_id_detects_tampering() {
        let mut c = Commit::with_timestamp("m", "t", None, None, table(&[("a", "1")]));
        assert!(c.verify_id());
        c.files.insert("b".into(), Snapshot::new("2"));
        assert!(!c.verify_id());
    }

    #[test]
    fn test_new_uses_wall_clock() {
        let c = Commit::new("m", Some("aaaaaa".into()), None, FileTable::new());
        assert_ne!(c.timestamp, ROOT_TIMESTAMP);
        assert_eq!(c.short_id().len(), 6);
    }
}
