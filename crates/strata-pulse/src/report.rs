//! One-shot runner over every analyzer.
//!
//! The analyzers only read the history and index, so they run side by side
//! on the rayon pool. The first error wins; partial results are discarded.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strata_core::{CancelToken, CommitHistory, FileIndex, StrataConfig, StrataError};

use crate::activity::{analyze_activity, ActivityHistogram};
use crate::churn::{analyze_churn, file_churn_table, ChurnReport, FileChurn};
use crate::cochange::{analyze_co_changes, CoChangeMatrix};
use crate::deps::{build_dependency_graph, DependencyGraph};
use crate::ownership::{analyze_ownership, summarize_ownership, OwnershipSummary, OwnershipTable};

/// Churn and ownership of one requested file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    /// Normalized path.
    pub path: String,
    /// Churn and hotspots, following renames.
    pub churn: ChurnReport,
    /// Recency-weighted ownership.
    pub ownership: OwnershipTable,
}

/// Results of every analyzer over one history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PulseReport {
    /// Commits in the history.
    pub commits: usize,
    /// Distinct paths in the index.
    pub files: usize,
    /// Co-change pairs.
    pub co_changes: CoChangeMatrix,
    /// Weekday and hour histogram with bursts.
    pub activity: ActivityHistogram,
    /// Commit similarity graph.
    pub dependencies: DependencyGraph,
    /// Files ranked by churn.
    pub churn_table: Vec<FileChurn>,
    /// Knowledge silos and bus factor.
    pub ownership: OwnershipSummary,
    /// Detailed reports for the requested paths, in request order.
    pub file_reports: Vec<FileReport>,
}

/// Run every analyzer over `history`, with per-file churn and ownership for
/// each of `paths`.
///
/// # Errors
///
/// Returns the first error raised by any analyzer, typically
/// [`StrataError::Config`], [`StrataError::TargetNotFound`] or
/// [`StrataError::Cancelled`].
///
/// # Examples
///
/// ```
/// use strata_core::{CancelToken, CommitHistory, FileIndex, IngestOptions, StrataConfig};
/// use strata_pulse::report::analyze_all;
///
/// let json = r#"[
///     {"hash": "c1", "author": "alice", "timestamp": "2024-01-01T09:00:00Z",
///      "files": [{"path": "a.rs", "linesAdded": 3}, {"path": "b.rs", "linesAdded": 1}]},
///     {"hash": "c2", "author": "bob", "timestamp": "2024-01-01T09:10:00Z",
///      "files": [{"path": "a.rs", "linesAdded": 1}]}
/// ]"#;
/// let history = CommitHistory::from_json(json, IngestOptions::default()).unwrap();
/// let index = FileIndex::build(&history);
/// let report = analyze_all(&history, &index, &StrataConfig::default(), &["a.rs"], &CancelToken::new()).unwrap();
/// assert_eq!(report.commits, 2);
/// assert_eq!(report.activity.bursts.len(), 1);
/// assert_eq!(report.file_reports[0].churn.commits, 2);
/// ```
pub fn analyze_all(
    history: &CommitHistory,
    index: &FileIndex,
    config: &StrataConfig,
    paths: &[&str],
    cancel: &CancelToken,
) -> Result<PulseReport, StrataError> {
    config.validate()?;
    tracing::debug!(
        commits = history.len(),
        files = index.file_count(),
        requested = paths.len(),
        "running all analyzers"
    );

    let ((co_changes, activity), ((dependencies, ownership), (churn_table, file_reports))) =
        rayon::join(
            || {
                rayon::join(
                    || analyze_co_changes(history, index, &config.cochange, cancel),
                    || analyze_activity(history, &config.activity, cancel),
                )
            },
            || {
                rayon::join(
                    || {
                        rayon::join(
                            || build_dependency_graph(history, index, &config.deps, cancel),
                            || summarize_ownership(history, index, &config.ownership, cancel),
                        )
                    },
                    || {
                        rayon::join(
                            || file_churn_table(history, index, config.churn.since),
                            || per_file_reports(history, index, config, paths, cancel),
                        )
                    },
                )
            },
        );

    Ok(PulseReport {
        commits: history.len(),
        files: index.file_count(),
        co_changes: co_changes?,
        activity: activity?,
        dependencies: dependencies?,
        churn_table,
        ownership: ownership?,
        file_reports: file_reports?,
    })
}

fn per_file_reports(
    history: &CommitHistory,
    index: &FileIndex,
    config: &StrataConfig,
    paths: &[&str],
    cancel: &CancelToken,
) -> Result<Vec<FileReport>, StrataError> {
    paths
        .par_iter()
        .map(|path| {
            let churn = analyze_churn(history, index, path, &config.churn, cancel)?;
            let ownership = analyze_ownership(history, index, path, &config.ownership, cancel)?;
            Ok(FileReport {
                path: churn.path.clone(),
                churn,
                ownership,
            })
        })
        .collect()
}
