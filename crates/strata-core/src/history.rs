//! Immutable in-memory commit history.
//!
//! Raw descriptors supplied by the version-control collaborator are checked,
//! normalized and frozen into a [`CommitHistory`] in a single pass.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StrataError;

/// Kind of change a commit made to a file.
///
/// # Examples
///
/// ```
/// use strata_core::ChangeKind;
///
/// let kind: ChangeKind = serde_json::from_str("\"renamed\"").unwrap();
/// assert_eq!(kind, ChangeKind::Renamed);
/// assert_eq!(kind.to_string(), "renamed");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// New file.
    Added,
    /// Existing file modified.
    #[default]
    Modified,
    /// File removed.
    Deleted,
    /// File moved from `old_path`.
    Renamed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "added"),
            ChangeKind::Modified => write!(f, "modified"),
            ChangeKind::Deleted => write!(f, "deleted"),
            ChangeKind::Renamed => write!(f, "renamed"),
        }
    }
}

/// Diff-hunk coordinates, 1-based as in a unified diff header.
///
/// # Examples
///
/// ```
/// use strata_core::Hunk;
///
/// let hunk = Hunk::new(10, 2, 10, 5);
/// assert_eq!(hunk.line_delta(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hunk {
    /// First line of the range in the pre-commit file.
    pub old_start: u32,
    /// Lines of the pre-commit file the hunk replaces.
    pub old_count: u32,
    /// First line of the range in the post-commit file.
    pub new_start: u32,
    /// Lines of the post-commit file the hunk produces.
    pub new_count: u32,
}

impl Hunk {
    /// Build a hunk from its four header numbers.
    pub fn new(old_start: u32, old_count: u32, new_start: u32, new_count: u32) -> Self {
        Self {
            old_start,
            old_count,
            new_start,
            new_count,
        }
    }

    /// How much the hunk grows (or shrinks) the file.
    pub fn line_delta(&self) -> i64 {
        i64::from(self.new_count) - i64::from(self.old_count)
    }
}

/// Line-level diff payload of a file change.
///
/// Hunks are optional: the collaborator may hand them over parsed, as raw
/// unified-diff text, or not at all.
///
/// # Examples
///
/// ```
/// use strata_core::{DiffData, Hunk};
///
/// let parsed = DiffData::Hunks(vec![Hunk::new(1, 0, 1, 3)]);
/// assert!(matches!(parsed, DiffData::Hunks(ref h) if h.len() == 1));
/// assert_eq!(DiffData::default(), DiffData::Unavailable);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffData {
    /// Already-parsed hunks.
    Hunks(Vec<Hunk>),
    /// Unified-diff text for this file, parsed on demand.
    Patch(String),
    /// Binary content; no line information exists.
    Binary,
    /// The collaborator could not compute hunks.
    #[default]
    Unavailable,
}

/// A raw file change as supplied by the version-control collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFileChange {
    /// Path after the change.
    pub path: String,
    /// Type of change.
    #[serde(default)]
    pub kind: ChangeKind,
    /// Path before a rename.
    #[serde(default)]
    pub old_path: Option<String>,
    /// Lines added.
    #[serde(default)]
    pub lines_added: u64,
    /// Lines removed.
    #[serde(default)]
    pub lines_removed: u64,
    /// Line-level payload.
    #[serde(default)]
    pub diff: DiffData,
}

/// A raw commit descriptor as supplied by the version-control collaborator.
///
/// # Examples
///
/// ```
/// use strata_core::RawCommit;
///
/// let raw: RawCommit = serde_json::from_str(r#"{
///     "hash": "abc123",
///     "author": "alice",
///     "timestamp": "2024-03-20T14:32:15Z",
///     "files": [{ "path": "src/lib.rs", "linesAdded": 4 }]
/// }"#).unwrap();
/// assert_eq!(raw.files[0].lines_added, 4);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCommit {
    /// Commit id.
    #[serde(default)]
    pub hash: Option<String>,
    /// Author name.
    #[serde(default)]
    pub author: String,
    /// Author email.
    #[serde(default)]
    pub email: Option<String>,
    /// Author timestamp in UTC.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// First line of the commit message.
    #[serde(default)]
    pub message: Option<String>,
    /// Files touched by the commit.
    #[serde(default)]
    pub files: Vec<RawFileChange>,
}

/// Who made a commit.
///
/// # Examples
///
/// ```
/// use strata_core::Author;
///
/// let author = Author::new("alice", Some("alice@example.com".into()));
/// assert_eq!(author.to_string(), "alice <alice@example.com>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Author {
    /// Display name.
    pub name: String,
    /// Email, when known.
    pub email: Option<String>,
}

impl Author {
    /// Build an author identity.
    pub fn new(name: impl Into<String>, email: Option<String>) -> Self {
        Self {
            name: name.into(),
            email,
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.email {
            Some(email) => write!(f, "{} <{}>", self.name, email),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A single file change within an ingested commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    /// Repository-relative POSIX path after the change.
    pub path: String,
    /// Type of change.
    pub kind: ChangeKind,
    /// Normalized path before a rename.
    pub old_path: Option<String>,
    /// Lines added.
    pub lines_added: u64,
    /// Lines removed.
    pub lines_removed: u64,
    /// Line-level payload.
    pub diff: DiffData,
}

impl FileChange {
    /// Lines added plus lines removed.
    pub fn lines_changed(&self) -> u64 {
        self.lines_added + self.lines_removed
    }
}

/// One ingested commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    /// Commit id, unique within its history.
    pub hash: String,
    /// Commit author.
    pub author: Author,
    /// Author timestamp.
    pub timestamp: DateTime<Utc>,
    /// First line of the commit message.
    pub message: Option<String>,
    /// File changes in the order supplied.
    pub changes: Vec<FileChange>,
}

/// Order in which raw descriptors arrive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputOrder {
    /// Oldest commit first.
    #[default]
    OldestFirst,
    /// Newest commit first, as `git log` prints them.
    NewestFirst,
}

/// Options for [`CommitHistory::ingest`].
///
/// # Examples
///
/// ```
/// use strata_core::{IngestOptions, InputOrder};
///
/// let opts = IngestOptions::default();
/// assert!(!opts.strict);
/// assert_eq!(opts.order, InputOrder::OldestFirst);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Fail on repeated hashes instead of keeping the first occurrence.
    pub strict: bool,
    /// Order of the incoming descriptors.
    pub order: InputOrder,
}

/// Chronologically ordered, immutable sequence of commits.
///
/// Hashes are unique. Timestamps are kept as supplied and may be out of
/// order; analyzers that need time order sort on their own.
#[derive(Debug, Clone, Default)]
pub struct CommitHistory {
    commits: Vec<CommitRecord>,
    positions: HashMap<String, usize>,
}

impl CommitHistory {
    /// Build a history from raw descriptors in one pass.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::MalformedInput`] when a descriptor lacks a hash
    /// or timestamp, a file change has an empty path, or a rename has no old
    /// path. Returns [`StrataError::DuplicateCommit`] on a repeated hash when
    /// `options.strict` is set.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use strata_core::{CommitHistory, IngestOptions, RawCommit, RawFileChange};
    ///
    /// let raw = vec![RawCommit {
    ///     hash: Some("c1".into()),
    ///     author: "alice".into(),
    ///     timestamp: Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
    ///     files: vec![RawFileChange { path: "./src\\main.rs".into(), ..Default::default() }],
    ///     ..Default::default()
    /// }];
    /// let history = CommitHistory::ingest(raw, IngestOptions::default()).unwrap();
    /// assert_eq!(history.len(), 1);
    /// assert_eq!(history.commits()[0].changes[0].path, "src/main.rs");
    /// ```
    pub fn ingest(
        raw: impl IntoIterator<Item = RawCommit>,
        options: IngestOptions,
    ) -> Result<Self, StrataError> {
        let mut commits = Vec::new();
        let mut positions = HashMap::new();
        let mut duplicates = 0usize;

        for (index, descriptor) in raw.into_iter().enumerate() {
            let record = build_record(index, descriptor)?;
            if positions.contains_key(&record.hash) {
                if options.strict {
                    return Err(StrataError::DuplicateCommit(record.hash));
                }
                tracing::debug!(hash = %record.hash, index, "dropping repeated commit");
                duplicates += 1;
                continue;
            }
            positions.insert(record.hash.clone(), commits.len());
            commits.push(record);
        }

        if options.order == InputOrder::NewestFirst {
            commits.reverse();
            let last = commits.len().saturating_sub(1);
            for position in positions.values_mut() {
                *position = last - *position;
            }
        }

        tracing::debug!(commits = commits.len(), duplicates, "ingested commit history");
        Ok(Self { commits, positions })
    }

    /// Deserialize a JSON array of [`RawCommit`] and ingest it.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Serialization`] for invalid JSON, otherwise the
    /// same errors as [`CommitHistory::ingest`].
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_core::{CommitHistory, IngestOptions};
    ///
    /// let json = r#"[{"hash": "c1", "author": "bob", "timestamp": "2024-01-01T00:00:00Z"}]"#;
    /// let history = CommitHistory::from_json(json, IngestOptions::default()).unwrap();
    /// assert_eq!(history.commits()[0].author.name, "bob");
    /// ```
    pub fn from_json(json: &str, options: IngestOptions) -> Result<Self, StrataError> {
        let raw: Vec<RawCommit> = serde_json::from_str(json)?;
        Self::ingest(raw, options)
    }

    /// All commits in history order.
    pub fn commits(&self) -> &[CommitRecord] {
        &self.commits
    }

    /// Commit at `index`.
    pub fn get(&self, index: usize) -> Option<&CommitRecord> {
        self.commits.get(index)
    }

    /// Number of commits.
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// Whether the history has no commits.
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Position of a commit, by full hash or by an unambiguous prefix of at
    /// least four characters.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_core::{CommitHistory, IngestOptions};
    ///
    /// let json = r#"[
    ///     {"hash": "a1b2c3d4", "timestamp": "2024-01-01T00:00:00Z"},
    ///     {"hash": "a1b2ffff", "timestamp": "2024-01-02T00:00:00Z"}
    /// ]"#;
    /// let history = CommitHistory::from_json(json, IngestOptions::default()).unwrap();
    /// assert_eq!(history.position("a1b2ffff"), Some(1));
    /// assert_eq!(history.position("a1b2c"), Some(0));
    /// assert_eq!(history.position("a1b2"), None);
    /// ```
    pub fn position(&self, hash: &str) -> Option<usize> {
        if let Some(&index) = self.positions.get(hash) {
            return Some(index);
        }
        if hash.len() < 4 {
            return None;
        }
        let mut matches = self
            .commits
            .iter()
            .enumerate()
            .filter(|(_, c)| c.hash.starts_with(hash))
            .map(|(i, _)| i);
        match (matches.next(), matches.next()) {
            (Some(index), None) => Some(index),
            _ => None,
        }
    }

    /// Latest author timestamp, regardless of history order.
    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.commits.iter().map(|c| c.timestamp).max()
    }
}

fn build_record(index: usize, raw: RawCommit) -> Result<CommitRecord, StrataError> {
    let malformed = |reason: String| StrataError::MalformedInput { index, reason };

    let hash = raw
        .hash
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .ok_or_else(|| malformed("missing hash".into()))?;
    let timestamp = raw
        .timestamp
        .ok_or_else(|| malformed(format!("commit {hash} has no timestamp")))?;

    let mut changes = Vec::with_capacity(raw.files.len());
    for file in raw.files {
        let path = normalize_path(&file.path);
        if path.is_empty() {
            return Err(malformed(format!("commit {hash} has a file change without a path")));
        }
        let old_path = file
            .old_path
            .as_deref()
            .map(normalize_path)
            .filter(|p| !p.is_empty());
        if file.kind == ChangeKind::Renamed && old_path.is_none() {
            return Err(malformed(format!(
                "commit {hash} renames {path} without an old path"
            )));
        }
        changes.push(FileChange {
            path,
            kind: file.kind,
            old_path,
            lines_added: file.lines_added,
            lines_removed: file.lines_removed,
            diff: file.diff,
        });
    }

    let name = raw.author.trim();
    let author = Author::new(
        if name.is_empty() { "unknown" } else { name },
        raw.email.filter(|e| !e.trim().is_empty()),
    );

    Ok(CommitRecord {
        hash,
        author,
        timestamp,
        message: raw.message,
        changes,
    })
}

/// Normalize a path to repository-relative POSIX form.
///
/// # Examples
///
/// ```
/// use strata_core::normalize_path;
///
/// assert_eq!(normalize_path("./src//lib.rs"), "src/lib.rs");
/// assert_eq!(normalize_path("src\\bin\\main.rs"), "src/bin/main.rs");
/// assert_eq!(normalize_path("/README.md"), "README.md");
/// ```
pub fn normalize_path(raw: &str) -> String {
    raw.trim()
        .replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}
