//! Shared builders for unit tests.

use chrono::{DateTime, TimeZone, Utc};
use strata_core::{
    ChangeKind, CommitHistory, DiffData, FileIndex, Hunk, IngestOptions, RawCommit, RawFileChange,
};

/// 2024-01-01T00:00:00Z, a Monday.
pub(crate) const BASE: i64 = 1_704_067_200;
pub(crate) const HOUR: i64 = 3600;
pub(crate) const DAY: i64 = 86_400;

pub(crate) fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub(crate) fn file(path: &str, added: u64, removed: u64) -> RawFileChange {
    RawFileChange {
        path: path.into(),
        kind: ChangeKind::Modified,
        old_path: None,
        lines_added: added,
        lines_removed: removed,
        diff: DiffData::Unavailable,
    }
}

pub(crate) fn with_hunks(path: &str, hunks: &[(u32, u32, u32, u32)]) -> RawFileChange {
    let added = hunks.iter().map(|h| u64::from(h.3)).sum();
    let removed = hunks.iter().map(|h| u64::from(h.1)).sum();
    RawFileChange {
        diff: DiffData::Hunks(hunks.iter().map(|&(a, b, c, d)| Hunk::new(a, b, c, d)).collect()),
        ..file(path, added, removed)
    }
}

pub(crate) fn commit(hash: &str, author: &str, secs: i64, files: Vec<RawFileChange>) -> RawCommit {
    RawCommit {
        hash: Some(hash.into()),
        author: author.into(),
        email: Some(format!("{author}@example.com")),
        timestamp: Some(at(secs)),
        message: None,
        files,
    }
}

/// Commits `c0, c1, ...` by alice, one minute apart, touching the given paths.
pub(crate) fn touching(paths: &[&[&str]]) -> CommitHistory {
    history(
        paths
            .iter()
            .enumerate()
            .map(|(i, files)| {
                commit(
                    &format!("c{i}"),
                    "alice",
                    BASE + i as i64 * 60,
                    files.iter().map(|p| file(p, 1, 0)).collect(),
                )
            })
            .collect(),
    )
}

pub(crate) fn history(raw: Vec<RawCommit>) -> CommitHistory {
    CommitHistory::ingest(raw, IngestOptions::default()).unwrap()
}

pub(crate) fn indexed(history: &CommitHistory) -> FileIndex {
    FileIndex::build(history)
}
