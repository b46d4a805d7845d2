//! Inverted index from file path to the commits touching it.

use std::collections::{BTreeMap, HashSet};

use crate::history::CommitHistory;

/// Path → commit indices, built once per history and shared read-only.
///
/// Commit lists are in history order and contain each commit at most once.
///
/// # Examples
///
/// ```
/// use strata_core::{CommitHistory, FileIndex, IngestOptions};
///
/// let json = r#"[
///     {"hash": "c1", "timestamp": "2024-01-01T00:00:00Z", "files": [{"path": "a.rs"}, {"path": "b.rs"}]},
///     {"hash": "c2", "timestamp": "2024-01-02T00:00:00Z", "files": [{"path": "a.rs"}]}
/// ]"#;
/// let history = CommitHistory::from_json(json, IngestOptions::default()).unwrap();
/// let index = FileIndex::build(&history);
/// assert_eq!(index.commits_touching("a.rs"), &[0, 1]);
/// assert_eq!(index.change_count("b.rs"), 1);
/// assert_eq!(index.files_of(0), &["a.rs".to_string(), "b.rs".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    by_path: BTreeMap<String, Vec<usize>>,
    by_commit: Vec<Vec<String>>,
}

impl FileIndex {
    /// Build the index in O(total file changes).
    pub fn build(history: &CommitHistory) -> Self {
        let mut by_path: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut by_commit = Vec::with_capacity(history.len());

        for (index, commit) in history.commits().iter().enumerate() {
            let mut seen = HashSet::with_capacity(commit.changes.len());
            let mut files = Vec::with_capacity(commit.changes.len());
            for change in &commit.changes {
                if seen.insert(change.path.as_str()) {
                    files.push(change.path.clone());
                    by_path.entry(change.path.clone()).or_default().push(index);
                }
            }
            files.sort();
            by_commit.push(files);
        }

        tracing::trace!(
            files = by_path.len(),
            commits = by_commit.len(),
            "built file index"
        );
        Self { by_path, by_commit }
    }

    /// Commits touching `path`, in history order.
    pub fn commits_touching(&self, path: &str) -> &[usize] {
        self.by_path.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of commits touching `path`.
    pub fn change_count(&self, path: &str) -> usize {
        self.commits_touching(path).len()
    }

    /// Distinct paths changed by the commit at `commit`, sorted.
    pub fn files_of(&self, commit: usize) -> &[String] {
        self.by_commit.get(commit).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All indexed paths, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.by_path.keys().map(String::as_str)
    }

    /// `(path, commits)` entries, sorted by path.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.by_path.iter().map(|(p, c)| (p.as_str(), c.as_slice()))
    }

    /// Number of distinct paths.
    pub fn file_count(&self) -> usize {
        self.by_path.len()
    }

    /// Number of commits the index was built from.
    pub fn commit_count(&self) -> usize {
        self.by_commit.len()
    }
}
