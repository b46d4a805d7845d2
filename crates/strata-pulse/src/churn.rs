//! File and line-level churn.
//!
//! File-level churn counts commits and lines per file. Line hotspots replay
//! every hunk of a file's history, oldest first, so that counters follow
//! their lines as the file grows and shrinks. Counts are reported against
//! the latest revision.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_core::{
    normalize_path, Author, CancelToken, ChangeKind, ChurnConfig, CommitHistory, FileIndex, Hunk,
    StrataError,
};

use crate::patch::resolve_hunks;

/// A commit left out of hotspot tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedCommit {
    /// Full hash of the skipped commit.
    pub hash: String,
    /// Name the file had in that commit.
    pub path: String,
    /// Why the hunks could not be used.
    pub reason: String,
}

/// Change count of one line in the latest revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChurn {
    /// 1-based line number.
    pub line: u32,
    /// Times the line was touched, carried across edits that moved it.
    pub count: u32,
}

/// A maximal run of lines whose counts all reach the hot threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotRange {
    /// First line, inclusive.
    pub start: u32,
    /// Last line, inclusive.
    pub end: u32,
    /// Highest count in the range.
    pub peak: u32,
    /// Sum of counts in the range.
    pub total: u64,
}

impl HotRange {
    /// Number of lines covered.
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Always false; ranges hold at least one line.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Churn of a single file across its renames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurnReport {
    /// Path in the latest revision.
    pub path: String,
    /// Earlier names reached through renames, newest first.
    pub aliases: Vec<String>,
    /// Cutoff applied, if any.
    pub since: Option<DateTime<Utc>>,
    /// Commits touching the file, skipped ones included.
    pub commits: u32,
    /// Lines added over those commits.
    pub lines_added: u64,
    /// Lines removed over those commits.
    pub lines_removed: u64,
    /// Distinct authors, sorted.
    pub authors: Vec<Author>,
    /// Oldest qualifying commit in history order.
    pub first_commit: Option<String>,
    /// Newest qualifying commit in history order.
    pub last_commit: Option<String>,
    /// Latest commit timestamp.
    pub last_modified: Option<DateTime<Utc>>,
    /// Line increments applied over all tracked commits.
    pub line_touches: u64,
    /// Non-zero line counts ordered by line.
    pub lines: Vec<LineChurn>,
    /// Threshold used for `hot_ranges`.
    pub hot_threshold: u32,
    /// Hotspot ranges ordered by line.
    pub hot_ranges: Vec<HotRange>,
    /// Commits excluded from line tracking.
    pub skipped: Vec<SkippedCommit>,
}

impl ChurnReport {
    /// Lines added plus removed.
    pub fn total_churn(&self) -> u64 {
        self.lines_added + self.lines_removed
    }

    /// Change count of `line`, 0 if never touched.
    pub fn count_at(&self, line: u32) -> u32 {
        self.lines
            .binary_search_by_key(&line, |l| l.line)
            .map_or(0, |i| self.lines[i].count)
    }
}

/// Furthest a hunk may reach past the known end of the file, and the most
/// lines a single hunk may produce.
const MAX_LINE_JUMP: usize = 1 << 20;

/// Per-line counters of the current revision. `counts[i]` belongs to line
/// `i + 1`; lines past the end are implicitly zero.
#[derive(Debug, Default, Clone)]
struct LineCounters {
    counts: Vec<u32>,
}

/// Zero-based index of the first line a hunk rewrites.
fn anchor(hunk: &Hunk) -> usize {
    if hunk.new_count == 0 {
        hunk.new_start as usize
    } else {
        hunk.new_start.max(1) as usize - 1
    }
}

impl LineCounters {
    /// Check that `hunks`, applied in order, stay within reach of the known
    /// lines.
    fn check(&self, hunks: &[Hunk]) -> Result<(), String> {
        let mut len = self.counts.len();
        for hunk in hunks {
            let start = anchor(hunk);
            if start > len + MAX_LINE_JUMP {
                return Err(format!(
                    "hunk at line {} is far past the {len} known lines",
                    hunk.new_start
                ));
            }
            if hunk.new_count as usize > MAX_LINE_JUMP {
                return Err(format!("hunk spans {} new lines", hunk.new_count));
            }
            let padded = len.max(start);
            let end = (start + hunk.old_count as usize).min(padded);
            len = padded - (end - start) + hunk.new_count as usize;
        }
        Ok(())
    }

    /// Apply one hunk in the current line space, returning the number of
    /// lines incremented.
    fn apply(&mut self, hunk: &Hunk) -> u64 {
        let new_count = hunk.new_count as usize;
        let start = anchor(hunk);
        if self.counts.len() < start {
            self.counts.resize(start, 0);
        }
        let end = (start + hunk.old_count as usize).min(self.counts.len());

        let mut replacement = vec![0u32; new_count];
        if new_count > 0 {
            for (offset, &count) in self.counts[start..end].iter().enumerate() {
                let slot = &mut replacement[offset.min(new_count - 1)];
                *slot = (*slot).max(count);
            }
            for slot in &mut replacement {
                *slot += 1;
            }
        }
        let touched = replacement.len() as u64;
        self.counts.splice(start..end, replacement);
        touched
    }

    fn lines(&self) -> Vec<LineChurn> {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .map(|(i, &count)| LineChurn {
                line: i as u32 + 1,
                count,
            })
            .collect()
    }
}

/// Group `lines` into maximal runs of consecutive lines with count at least
/// `threshold`.
///
/// # Examples
///
/// ```
/// use strata_pulse::churn::{hot_ranges, LineChurn};
///
/// let lines = [
///     LineChurn { line: 1, count: 3 },
///     LineChurn { line: 2, count: 5 },
///     LineChurn { line: 3, count: 1 },
///     LineChurn { line: 7, count: 4 },
/// ];
/// let ranges = hot_ranges(&lines, 3);
/// assert_eq!(ranges.len(), 2);
/// assert_eq!((ranges[0].start, ranges[0].end, ranges[0].peak), (1, 2, 5));
/// assert_eq!((ranges[1].start, ranges[1].end), (7, 7));
/// ```
pub fn hot_ranges(lines: &[LineChurn], threshold: u32) -> Vec<HotRange> {
    let mut ranges: Vec<HotRange> = Vec::new();
    for l in lines.iter().filter(|l| l.count >= threshold) {
        match ranges.last_mut() {
            Some(range) if range.end + 1 == l.line => {
                range.end = l.line;
                range.peak = range.peak.max(l.count);
                range.total += u64::from(l.count);
            }
            _ => ranges.push(HotRange {
                start: l.line,
                end: l.line,
                peak: l.count,
                total: u64::from(l.count),
            }),
        }
    }
    ranges
}

/// Commits touching `path` under each name it has had, newest first, with
/// the name in force at that commit.
///
/// An earlier name only applies to commits before the rename away from it,
/// so a later, unrelated file reusing that name is not picked up.
fn lineage(history: &CommitHistory, index: &FileIndex, path: &str) -> Vec<(usize, String)> {
    let mut touches = Vec::new();
    let mut name = path.to_string();
    let mut before = usize::MAX;

    loop {
        let mut renamed_from = None;
        for &position in index.commits_touching(&name).iter().rev() {
            if position >= before {
                continue;
            }
            touches.push((position, name.clone()));
            let old = history.get(position).and_then(|commit| {
                commit
                    .changes
                    .iter()
                    .find(|c| c.kind == ChangeKind::Renamed && c.path == name)
                    .and_then(|c| c.old_path.clone())
            });
            if let Some(old) = old.filter(|old| *old != name) {
                renamed_from = Some((position, old));
                break;
            }
        }
        match renamed_from {
            Some((position, old)) => {
                before = position;
                name = old;
            }
            None => return touches,
        }
    }
}

/// Every earlier name of `path`, found by following renames backwards.
///
/// Newest alias first; `path` itself is not included.
///
/// # Examples
///
/// ```
/// use strata_core::{CommitHistory, FileIndex, IngestOptions};
/// use strata_pulse::churn::rename_aliases;
///
/// let json = r#"[
///     {"hash": "c1", "timestamp": "2024-01-01T00:00:00Z", "files": [{"path": "a.rs"}]},
///     {"hash": "c2", "timestamp": "2024-01-02T00:00:00Z",
///      "files": [{"path": "b.rs", "kind": "renamed", "oldPath": "a.rs"}]}
/// ]"#;
/// let history = CommitHistory::from_json(json, IngestOptions::default()).unwrap();
/// let index = FileIndex::build(&history);
/// assert_eq!(rename_aliases(&history, &index, "b.rs"), vec!["a.rs"]);
/// ```
pub fn rename_aliases(history: &CommitHistory, index: &FileIndex, path: &str) -> Vec<String> {
    let path = normalize_path(path);
    aliases_in(&lineage(history, index, &path), &path)
}

fn aliases_in(touches: &[(usize, String)], path: &str) -> Vec<String> {
    let mut aliases: Vec<String> = Vec::new();
    for (_, name) in touches {
        if name != path && !aliases.contains(name) {
            aliases.push(name.clone());
        }
    }
    aliases
}

/// Compute file-level churn and line hotspots of `path`.
///
/// Commits whose hunks cannot be resolved still count toward the file-level
/// totals and are listed in [`ChurnReport::skipped`].
///
/// # Errors
///
/// Returns [`StrataError::Config`] for invalid settings and
/// [`StrataError::Cancelled`] if `cancel` fires. Unparseable hunks never
/// surface as errors.
///
/// # Examples
///
/// ```
/// use strata_core::{CancelToken, ChurnConfig, CommitHistory, FileIndex, IngestOptions};
/// use strata_pulse::churn::analyze_churn;
///
/// let json = r#"[
///     {"hash": "c1", "timestamp": "2024-01-01T00:00:00Z", "files": [
///         {"path": "lib.rs", "linesAdded": 3, "diff": {"hunks": [
///             {"oldStart": 0, "oldCount": 0, "newStart": 1, "newCount": 3}]}}]},
///     {"hash": "c2", "timestamp": "2024-01-02T00:00:00Z", "files": [
///         {"path": "lib.rs", "linesAdded": 1, "linesRemoved": 1, "diff": {"hunks": [
///             {"oldStart": 2, "oldCount": 1, "newStart": 2, "newCount": 1}]}}]}
/// ]"#;
/// let history = CommitHistory::from_json(json, IngestOptions::default()).unwrap();
/// let index = FileIndex::build(&history);
/// let report = analyze_churn(&history, &index, "lib.rs", &ChurnConfig::default(), &CancelToken::new()).unwrap();
/// assert_eq!(report.commits, 2);
/// assert_eq!(report.count_at(1), 1);
/// assert_eq!(report.count_at(2), 2);
/// ```
pub fn analyze_churn(
    history: &CommitHistory,
    index: &FileIndex,
    path: &str,
    config: &ChurnConfig,
    cancel: &CancelToken,
) -> Result<ChurnReport, StrataError> {
    config.validate()?;

    let path = normalize_path(path);
    let mut touches = lineage(history, index, &path);
    let aliases = aliases_in(&touches, &path);
    touches.reverse();

    let mut report = ChurnReport {
        path: path.clone(),
        aliases,
        since: config.since,
        commits: 0,
        lines_added: 0,
        lines_removed: 0,
        authors: Vec::new(),
        first_commit: None,
        last_commit: None,
        last_modified: None,
        line_touches: 0,
        lines: Vec::new(),
        hot_threshold: config.hot_threshold,
        hot_ranges: Vec::new(),
        skipped: Vec::new(),
    };
    let mut authors = BTreeSet::new();
    let mut counters = LineCounters::default();

    for (position, name) in &touches {
        cancel.check()?;
        let Some(commit) = history.get(*position) else {
            continue;
        };
        if config.since.is_some_and(|since| commit.timestamp < since) {
            continue;
        }

        let changes: Vec<_> = commit.changes.iter().filter(|c| c.path == *name).collect();

        report.commits += 1;
        for change in &changes {
            report.lines_added += change.lines_added;
            report.lines_removed += change.lines_removed;
        }
        authors.insert(&commit.author);
        report.first_commit.get_or_insert_with(|| commit.hash.clone());
        report.last_commit = Some(commit.hash.clone());
        report.last_modified = report.last_modified.max(Some(commit.timestamp));

        let resolved = changes
            .iter()
            .map(|change| resolve_hunks(commit, change))
            .collect::<Result<Vec<Vec<Hunk>>, StrataError>>()
            .and_then(|per_change| {
                let hunks: Vec<Hunk> = per_change.into_iter().flatten().collect();
                counters
                    .check(&hunks)
                    .map_err(|reason| StrataError::UnparseableHunk {
                        hash: commit.hash.clone(),
                        path: name.clone(),
                        reason,
                    })?;
                Ok(hunks)
            });
        match resolved {
            Ok(hunks) => {
                for hunk in &hunks {
                    report.line_touches += counters.apply(hunk);
                }
            }
            Err(StrataError::UnparseableHunk { hash, path, reason }) => {
                tracing::debug!(hash = %hash, path = %path, reason = %reason, "skipping hunks");
                report.skipped.push(SkippedCommit { hash, path, reason });
            }
            Err(other) => return Err(other),
        }
    }

    report.authors = authors.into_iter().cloned().collect();
    report.lines = counters.lines();
    report.hot_ranges = hot_ranges(&report.lines, config.hot_threshold);

    tracing::trace!(
        path = %report.path,
        commits = report.commits,
        skipped = report.skipped.len(),
        hot_ranges = report.hot_ranges.len(),
        "churn analyzed"
    );

    Ok(report)
}

/// File-level churn of one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChurn {
    /// File path relative to repo root.
    pub path: String,
    /// Number of commits touching this file.
    pub revisions: u32,
    /// Total lines added + removed across all commits.
    pub total_churn: u64,
    /// Number of distinct authors.
    pub authors: u32,
    /// Most recent change.
    pub last_modified: DateTime<Utc>,
}

/// Rank every indexed file by churn, highest first.
///
/// Commits older than `since` are ignored; files with no remaining commits
/// are left out.
///
/// # Examples
///
/// ```
/// use strata_core::{CommitHistory, FileIndex, IngestOptions};
/// use strata_pulse::churn::file_churn_table;
///
/// let json = r#"[
///     {"hash": "c1", "author": "alice", "timestamp": "2024-01-01T00:00:00Z",
///      "files": [{"path": "a.rs", "linesAdded": 10}, {"path": "b.rs", "linesAdded": 1}]},
///     {"hash": "c2", "author": "bob", "timestamp": "2024-01-02T00:00:00Z",
///      "files": [{"path": "a.rs", "linesRemoved": 4}]}
/// ]"#;
/// let history = CommitHistory::from_json(json, IngestOptions::default()).unwrap();
/// let table = file_churn_table(&history, &FileIndex::build(&history), None);
/// assert_eq!(table[0].path, "a.rs");
/// assert_eq!((table[0].revisions, table[0].total_churn, table[0].authors), (2, 14, 2));
/// ```
pub fn file_churn_table(
    history: &CommitHistory,
    index: &FileIndex,
    since: Option<DateTime<Utc>>,
) -> Vec<FileChurn> {
    let mut table = Vec::new();

    for (path, positions) in index.entries() {
        let mut revisions = 0u32;
        let mut total_churn = 0u64;
        let mut authors: BTreeSet<&Author> = BTreeSet::new();
        let mut last_modified: Option<DateTime<Utc>> = None;

        for commit in positions.iter().filter_map(|&i| history.get(i)) {
            if since.is_some_and(|s| commit.timestamp < s) {
                continue;
            }
            revisions += 1;
            total_churn += commit
                .changes
                .iter()
                .filter(|c| c.path == path)
                .map(|c| c.lines_changed())
                .sum::<u64>();
            authors.insert(&commit.author);
            last_modified = last_modified.max(Some(commit.timestamp));
        }

        if let Some(last_modified) = last_modified {
            table.push(FileChurn {
                path: path.to_string(),
                revisions,
                total_churn,
                authors: authors.len() as u32,
                last_modified,
            });
        }
    }

    table.sort_by(|a, b| {
        b.total_churn
            .cmp(&a.total_churn)
            .then_with(|| b.revisions.cmp(&a.revisions))
            .then_with(|| a.path.cmp(&b.path))
    });
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, commit, file, history, indexed, with_hunks, BASE, DAY};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use strata_core::{DiffData, RawFileChange};

    fn churn(h: &CommitHistory, path: &str, config: &ChurnConfig) -> ChurnReport {
        analyze_churn(h, &indexed(h), path, config, &CancelToken::new()).unwrap()
    }

    fn counts(report: &ChurnReport) -> Vec<(u32, u32)> {
        report.lines.iter().map(|l| (l.line, l.count)).collect()
    }

    fn replay(hunks: &[(u32, u32, u32, u32)]) -> Vec<u32> {
        let mut counters = LineCounters::default();
        for &(a, b, c, d) in hunks {
            counters.apply(&Hunk::new(a, b, c, d));
        }
        counters.counts
    }

    #[test]
    fn new_file_touches_every_line_once() {
        assert_eq!(replay(&[(0, 0, 1, 3)]), vec![1, 1, 1]);
    }

    #[test]
    fn insertion_shifts_later_lines() {
        let counts = replay(&[(0, 0, 1, 3), (2, 1, 2, 1), (0, 0, 1, 2)]);
        // Line 2 was edited twice, then two lines were prepended.
        assert_eq!(counts, vec![1, 1, 1, 2, 1]);
    }

    #[test]
    fn pure_deletion_drops_counters() {
        let counts = replay(&[(0, 0, 1, 4), (2, 1, 2, 1), (2, 2, 1, 0)]);
        // Lines 2..=3 are removed; old line 4 moves up to line 2.
        assert_eq!(counts, vec![1, 1]);
    }

    #[test]
    fn shrinking_replacement_keeps_max_of_folded_lines() {
        let counts = replay(&[(0, 0, 1, 4), (3, 1, 3, 1), (3, 1, 3, 1), (2, 3, 2, 1)]);
        // Lines 2..=4 (counts 1, 3, 1) fold into one line: max 3, plus 1.
        assert_eq!(counts, vec![1, 4]);
    }

    #[test]
    fn hunk_beyond_known_lines_pads_with_zeros() {
        let mut expected = vec![0; 10];
        expected.extend([1, 1]);
        assert_eq!(replay(&[(10, 0, 11, 2)]), expected);
    }

    #[test]
    fn hunks_in_one_commit_apply_sequentially() {
        let h = history(vec![
            commit("c1", "alice", BASE, vec![with_hunks("lib.rs", &[(0, 0, 1, 6)])]),
            commit(
                "c2",
                "alice",
                BASE + DAY,
                vec![with_hunks("lib.rs", &[(1, 1, 1, 2), (5, 1, 6, 1)])],
            ),
        ]);
        let report = churn(&h, "lib.rs", &ChurnConfig::default());
        assert_eq!(
            counts(&report),
            vec![(1, 2), (2, 1), (3, 1), (4, 1), (5, 1), (6, 2), (7, 1)]
        );
    }

    #[test]
    fn hot_ranges_use_threshold() {
        let edit = || with_hunks("lib.rs", &[(2, 2, 2, 2)]);
        let h = history(vec![
            commit("c1", "alice", BASE, vec![with_hunks("lib.rs", &[(0, 0, 1, 5)])]),
            commit("c2", "bob", BASE + DAY, vec![edit()]),
            commit("c3", "alice", BASE + 2 * DAY, vec![edit()]),
        ]);
        let report = churn(&h, "lib.rs", &ChurnConfig::default());
        assert_eq!(
            report.hot_ranges,
            vec![HotRange {
                start: 2,
                end: 3,
                peak: 3,
                total: 6
            }]
        );
        assert_eq!(report.hot_ranges[0].len(), 2);
    }

    #[test]
    fn binary_and_missing_diffs_are_skipped_but_counted() {
        let binary = RawFileChange {
            diff: DiffData::Binary,
            ..file("lib.rs", 0, 0)
        };
        let h = history(vec![
            commit("c1", "alice", BASE, vec![with_hunks("lib.rs", &[(0, 0, 1, 2)])]),
            commit("c2", "bob", BASE + DAY, vec![binary]),
            commit("c3", "carol", BASE + 2 * DAY, vec![file("lib.rs", 4, 1)]),
        ]);
        let report = churn(&h, "lib.rs", &ChurnConfig::default());
        assert_eq!(report.commits, 3);
        assert_eq!(report.lines_added, 6);
        assert_eq!(report.lines_removed, 1);
        assert_eq!(report.authors.len(), 3);
        assert_eq!(counts(&report), vec![(1, 1), (2, 1)]);
        assert_eq!(report.line_touches, 2);
        let skipped: Vec<(&str, &str)> = report
            .skipped
            .iter()
            .map(|s| (s.hash.as_str(), s.reason.as_str()))
            .collect();
        assert_eq!(skipped, vec![("c2", "binary diff"), ("c3", "no diff available")]);
    }

    #[test]
    fn invalid_hunks_are_skipped() {
        let h = history(vec![commit(
            "c1",
            "alice",
            BASE,
            vec![with_hunks("lib.rs", &[(1, 1, 0, 2)])],
        )]);
        let report = churn(&h, "lib.rs", &ChurnConfig::default());
        assert_eq!(report.commits, 1);
        assert!(report.lines.is_empty());
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn unparseable_patch_text_is_skipped() {
        let bad = RawFileChange {
            diff: DiffData::Patch("@@ -1,2 +1,2 @@\n-a\n".into()),
            ..file("lib.rs", 1, 1)
        };
        let h = history(vec![commit("c1", "alice", BASE, vec![bad])]);
        let report = churn(&h, "lib.rs", &ChurnConfig::default());
        assert_eq!(report.skipped[0].hash, "c1");
    }

    #[test]
    fn renames_are_followed_backwards() {
        let rename = RawFileChange {
            kind: ChangeKind::Renamed,
            old_path: Some("old.rs".into()),
            ..with_hunks("new.rs", &[(1, 1, 1, 1)])
        };
        let h = history(vec![
            commit("c1", "alice", BASE, vec![with_hunks("old.rs", &[(0, 0, 1, 2)])]),
            commit("c2", "bob", BASE + DAY, vec![rename]),
            commit("c3", "alice", BASE + 2 * DAY, vec![with_hunks("other.rs", &[(0, 0, 1, 1)])]),
        ]);
        let report = churn(&h, "new.rs", &ChurnConfig::default());
        assert_eq!(report.aliases, vec!["old.rs"]);
        assert_eq!(report.commits, 2);
        assert_eq!(report.first_commit.as_deref(), Some("c1"));
        assert_eq!(report.last_commit.as_deref(), Some("c2"));
        assert_eq!(counts(&report), vec![(1, 2), (2, 1)]);
    }

    #[test]
    fn reused_old_name_after_rename_is_a_different_file() {
        let rename = RawFileChange {
            kind: ChangeKind::Renamed,
            old_path: Some("old.rs".into()),
            ..file("new.rs", 0, 0)
        };
        let h = history(vec![
            commit("c1", "alice", BASE, vec![with_hunks("old.rs", &[(0, 0, 1, 2)])]),
            commit("c2", "bob", BASE + DAY, vec![rename]),
            commit("c3", "carol", BASE + 2 * DAY, vec![with_hunks("old.rs", &[(0, 0, 1, 50)])]),
        ]);
        let report = churn(&h, "new.rs", &ChurnConfig::default());
        assert_eq!(report.aliases, vec!["old.rs"]);
        assert_eq!(report.commits, 2);
        assert_eq!(report.lines_added, 2);
        assert_eq!(report.last_commit.as_deref(), Some("c2"));
        assert_eq!(report.authors.len(), 2);
        assert_eq!(counts(&report), vec![(1, 1), (2, 1)]);

        let reused = churn(&h, "old.rs", &ChurnConfig::default());
        assert!(reused.aliases.is_empty());
        assert_eq!(reused.commits, 1);
        assert_eq!(reused.lines_added, 50);
        assert_eq!(rename_aliases(&h, &indexed(&h), "old.rs"), Vec::<String>::new());
    }

    #[test]
    fn chained_renames_are_followed_in_order() {
        let renamed = |from: &str, to: &str| RawFileChange {
            kind: ChangeKind::Renamed,
            old_path: Some(from.into()),
            ..file(to, 0, 0)
        };
        let h = history(vec![
            commit("c1", "alice", BASE, vec![file("a.rs", 3, 0)]),
            commit("c2", "alice", BASE + DAY, vec![renamed("a.rs", "b.rs")]),
            commit("c3", "alice", BASE + 2 * DAY, vec![renamed("b.rs", "c.rs")]),
            commit("c4", "alice", BASE + 3 * DAY, vec![file("b.rs", 7, 0)]),
        ]);
        let report = churn(&h, "c.rs", &ChurnConfig::default());
        assert_eq!(report.aliases, vec!["b.rs", "a.rs"]);
        assert_eq!(report.commits, 3);
        assert_eq!(report.lines_added, 3);
    }

    #[test]
    fn far_away_hunk_is_skipped_without_allocating() {
        let h = history(vec![
            commit("c1", "alice", BASE, vec![with_hunks("lib.rs", &[(0, 0, 1, 2)])]),
            commit(
                "c2",
                "bob",
                BASE + DAY,
                vec![with_hunks("lib.rs", &[(1, 1, 4_000_000_000, 1)])],
            ),
            commit(
                "c3",
                "carol",
                BASE + 2 * DAY,
                vec![with_hunks("lib.rs", &[(0, 0, 1, u32::MAX)])],
            ),
        ]);
        let report = churn(&h, "lib.rs", &ChurnConfig::default());
        assert_eq!(report.commits, 3);
        assert_eq!(counts(&report), vec![(1, 1), (2, 1)]);
        assert_eq!(report.line_touches, 2);
        let skipped: Vec<&str> = report.skipped.iter().map(|s| s.hash.as_str()).collect();
        assert_eq!(skipped, vec!["c2", "c3"]);
    }

    #[test]
    fn far_away_patch_header_is_skipped() {
        let bad = RawFileChange {
            diff: DiffData::Patch("@@ -1 +4000000000 @@\n-a\n+b\n".into()),
            ..file("lib.rs", 1, 1)
        };
        let h = history(vec![commit("c1", "alice", BASE, vec![bad])]);
        let report = churn(&h, "lib.rs", &ChurnConfig::default());
        assert!(report.lines.is_empty());
        assert_eq!(report.skipped[0].hash, "c1");
    }

    /// Hunks that never shrink their range: `(old_start, old_count, new_start, extra)`.
    fn growing_hunks() -> impl Strategy<Value = Vec<Hunk>> {
        prop::collection::vec((1u32..30, 0u32..5, 1u32..30, 1u32..5), 1..12).prop_map(|raw| {
            raw.into_iter()
                .map(|(a, b, c, extra)| Hunk::new(a, b, c, b + extra))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn growing_hunks_add_one_per_covered_line(base in 0usize..20, hunks in growing_hunks()) {
            let mut counters = LineCounters { counts: vec![1; base] };
            for hunk in &hunks {
                let before: u64 = counters.counts.iter().map(|&c| u64::from(c)).sum();
                counters.apply(hunk);
                let after: u64 = counters.counts.iter().map(|&c| u64::from(c)).sum();
                prop_assert_eq!(after - before, u64::from(hunk.new_count));

                let start = anchor(hunk);
                let rewritten = &counters.counts[start..start + hunk.new_count as usize];
                prop_assert!(rewritten.iter().all(|&c| c >= 1));
            }
        }

        #[test]
        fn counters_never_exceed_touches(hunks in prop::collection::vec(
            (1u32..30, 0u32..6, 1u32..30, 0u32..6), 1..12,
        )) {
            let mut counters = LineCounters::default();
            let mut touches = 0u64;
            for &(a, b, c, d) in &hunks {
                let hunk = Hunk::new(a, b, c, d);
                prop_assert!(counters.check(std::slice::from_ref(&hunk)).is_ok());
                touches += counters.apply(&hunk);
                let total: u64 = counters.counts.iter().map(|&c| u64::from(c)).sum();
                prop_assert!(total <= touches);
            }
        }
    }

    #[test]
    fn since_filters_commits() {
        let h = history(vec![
            commit("c1", "alice", BASE, vec![with_hunks("lib.rs", &[(0, 0, 1, 2)])]),
            commit("c2", "bob", BASE + DAY, vec![with_hunks("lib.rs", &[(1, 1, 1, 1)])]),
        ]);
        let config = ChurnConfig {
            since: Some(at(BASE + DAY)),
            ..ChurnConfig::default()
        };
        let report = churn(&h, "lib.rs", &config);
        assert_eq!(report.commits, 1);
        assert_eq!(counts(&report), vec![(1, 1)]);
        assert_eq!(report.last_modified, Some(at(BASE + DAY)));
    }

    #[test]
    fn empty_history_gives_zero_report() {
        let report = churn(&CommitHistory::default(), "lib.rs", &ChurnConfig::default());
        assert_eq!(report.commits, 0);
        assert_eq!(report.total_churn(), 0);
        assert!(report.first_commit.is_none());
        assert!(report.hot_ranges.is_empty());
    }

    #[test]
    fn churn_table_ranks_by_total_churn() {
        let h = history(vec![
            commit("c1", "alice", BASE, vec![file("a.rs", 5, 0), file("b.rs", 50, 0)]),
            commit("c2", "bob", BASE + DAY, vec![file("a.rs", 5, 5)]),
            commit("c3", "bob", BASE + 2 * DAY, vec![file("c.rs", 1, 0)]),
        ]);
        let table = file_churn_table(&h, &indexed(&h), None);
        let order: Vec<&str> = table.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(order, vec!["b.rs", "a.rs", "c.rs"]);
        assert_eq!(table[1].revisions, 2);
        assert_eq!(table[1].authors, 2);
        assert_eq!(table[1].last_modified, at(BASE + DAY));

        let recent = file_churn_table(&h, &indexed(&h), Some(at(BASE + DAY)));
        let order: Vec<&str> = recent.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(order, vec!["a.rs", "c.rs"]);
    }
}
