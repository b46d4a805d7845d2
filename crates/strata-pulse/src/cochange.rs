//! File co-change correlation.
//!
//! Identifies pairs of files that frequently change together in commits,
//! which may indicate hidden dependencies or architectural coupling.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use strata_core::{CancelToken, CoChangeConfig, CommitHistory, FileIndex, StrataError};

use crate::matrix::{DensePairCounts, PairCounts, SparsePairCounts};

/// Above this many pairable files the dense backend would allocate too much.
const DENSE_FILE_LIMIT: usize = 2048;

/// How tightly two files are coupled.
///
/// # Examples
///
/// ```
/// use strata_pulse::cochange::CouplingStrength;
///
/// assert_eq!(CouplingStrength::from_correlation(0.75), CouplingStrength::Strong);
/// assert_eq!(CouplingStrength::from_correlation(0.45), CouplingStrength::Moderate);
/// assert_eq!(CouplingStrength::from_correlation(0.30), CouplingStrength::Weak);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouplingStrength {
    /// Correlation of at least 0.60.
    Strong,
    /// Correlation in `[0.40, 0.60)`.
    Moderate,
    /// Correlation below 0.40.
    Weak,
}

impl CouplingStrength {
    /// Band a correlation score.
    pub fn from_correlation(correlation: f64) -> Self {
        if correlation >= 0.60 {
            CouplingStrength::Strong
        } else if correlation >= 0.40 {
            CouplingStrength::Moderate
        } else {
            CouplingStrength::Weak
        }
    }
}

/// A pair of files that change together.
///
/// # Examples
///
/// ```
/// use strata_pulse::cochange::{CoChangePair, CouplingStrength};
///
/// let pair = CoChangePair {
///     file_a: "src/auth.rs".into(),
///     file_b: "src/session.rs".into(),
///     co_occurrence: 6,
///     correlation: 0.75,
///     changes_a: 8,
///     changes_b: 20,
///     strength: CouplingStrength::Strong,
/// };
/// assert!(pair.correlation > 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoChangePair {
    /// First file in the pair (lexicographically smaller).
    pub file_a: String,
    /// Second file in the pair.
    pub file_b: String,
    /// Number of paired commits touching both files.
    pub co_occurrence: u32,
    /// `co_occurrence / min(changes_a, changes_b)`.
    pub correlation: f64,
    /// Total commits touching `file_a`.
    pub changes_a: u32,
    /// Total commits touching `file_b`.
    pub changes_b: u32,
    /// Band of `correlation`.
    pub strength: CouplingStrength,
}

/// Result of co-change analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoChangeMatrix {
    /// Commits in the analyzed history.
    pub commits_analyzed: usize,
    /// Commits whose file pairs were counted.
    pub commits_paired: usize,
    /// Commits skipped for touching more than `max_files_per_commit` files.
    pub commits_oversized: usize,
    /// Retained pairs, strongest first.
    pub pairs: Vec<CoChangePair>,
}

impl CoChangeMatrix {
    /// Pairs involving `path`, in result order.
    pub fn partners_of<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a CoChangePair> + 'a {
        self.pairs
            .iter()
            .filter(move |p| p.file_a == path || p.file_b == path)
    }

    /// The pair `{a, b}`, in either order.
    pub fn get(&self, a: &str, b: &str) -> Option<&CoChangePair> {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        self.pairs
            .iter()
            .find(|p| p.file_a == lo && p.file_b == hi)
    }
}

/// Detect co-changing file pairs.
///
/// Picks the dense pair-count backend for small file sets and the sparse one
/// otherwise; both give identical results.
///
/// # Errors
///
/// Returns [`StrataError::Config`] for invalid settings and
/// [`StrataError::Cancelled`] if `cancel` fires.
///
/// # Examples
///
/// ```
/// use strata_core::{CancelToken, CoChangeConfig, CommitHistory, FileIndex, IngestOptions};
/// use strata_pulse::cochange::analyze_co_changes;
///
/// let json = r#"[
///     {"hash": "c1", "timestamp": "2024-01-01T00:00:00Z", "files": [{"path": "a.rs"}, {"path": "b.rs"}]},
///     {"hash": "c2", "timestamp": "2024-01-02T00:00:00Z", "files": [{"path": "a.rs"}, {"path": "b.rs"}]}
/// ]"#;
/// let history = CommitHistory::from_json(json, IngestOptions::default()).unwrap();
/// let index = FileIndex::build(&history);
/// let matrix = analyze_co_changes(&history, &index, &CoChangeConfig::default(), &CancelToken::new()).unwrap();
/// assert_eq!(matrix.pairs.len(), 1);
/// assert_eq!(matrix.pairs[0].correlation, 1.0);
/// ```
pub fn analyze_co_changes(
    history: &CommitHistory,
    index: &FileIndex,
    config: &CoChangeConfig,
    cancel: &CancelToken,
) -> Result<CoChangeMatrix, StrataError> {
    let pairable = pairable_files(history, index, config);
    if pairable.len() <= DENSE_FILE_LIMIT {
        analyze_co_changes_with::<DensePairCounts>(history, index, config, cancel)
    } else {
        analyze_co_changes_with::<SparsePairCounts>(history, index, config, cancel)
    }
}

/// [`analyze_co_changes`] with an explicit pair-count backend.
///
/// # Errors
///
/// Same as [`analyze_co_changes`].
pub fn analyze_co_changes_with<C: PairCounts>(
    history: &CommitHistory,
    index: &FileIndex,
    config: &CoChangeConfig,
    cancel: &CancelToken,
) -> Result<CoChangeMatrix, StrataError> {
    config.validate()?;

    let files: Vec<&str> = pairable_files(history, index, config).into_iter().collect();
    let ids: HashMap<&str, usize> = files.iter().enumerate().map(|(i, f)| (*f, i)).collect();
    let mut counts = C::with_size(files.len());

    let mut commits_paired = 0usize;
    let mut commits_oversized = 0usize;

    for commit in 0..history.len() {
        cancel.check()?;
        let touched = index.files_of(commit);
        if touched.len() > config.max_files_per_commit {
            commits_oversized += 1;
            continue;
        }
        if touched.len() < 2 {
            continue;
        }
        commits_paired += 1;

        for i in 0..touched.len() {
            for j in (i + 1)..touched.len() {
                counts.increment(ids[touched[i].as_str()], ids[touched[j].as_str()]);
            }
        }
    }

    let mut pairs = Vec::new();
    for (lo, hi, co_occurrence) in counts.nonzero() {
        if co_occurrence < config.min_co_occurrence {
            continue;
        }

        // Ids follow sorted path order, so `lo` is the lexicographically smaller file.
        let (file_a, file_b) = (files[lo], files[hi]);
        let changes_a = index.change_count(file_a) as u32;
        let changes_b = index.change_count(file_b) as u32;
        let min_changes = changes_a.min(changes_b);
        if min_changes == 0 {
            continue;
        }

        let correlation = f64::from(co_occurrence) / f64::from(min_changes);
        if correlation < config.min_correlation {
            continue;
        }

        pairs.push(CoChangePair {
            file_a: file_a.to_string(),
            file_b: file_b.to_string(),
            co_occurrence,
            correlation,
            changes_a,
            changes_b,
            strength: CouplingStrength::from_correlation(correlation),
        });
    }

    pairs.sort_by(|a, b| {
        b.correlation
            .total_cmp(&a.correlation)
            .then_with(|| b.co_occurrence.cmp(&a.co_occurrence))
            .then_with(|| a.file_a.cmp(&b.file_a))
            .then_with(|| a.file_b.cmp(&b.file_b))
    });
    if let Some(limit) = config.max_pairs {
        pairs.truncate(limit);
    }

    tracing::debug!(
        pairs = pairs.len(),
        commits_paired,
        commits_oversized,
        "co-change analysis complete"
    );

    Ok(CoChangeMatrix {
        commits_analyzed: history.len(),
        commits_paired,
        commits_oversized,
        pairs,
    })
}

/// Files appearing in at least one pairable commit, sorted.
fn pairable_files<'a>(
    history: &CommitHistory,
    index: &'a FileIndex,
    config: &CoChangeConfig,
) -> BTreeSet<&'a str> {
    (0..history.len())
        .map(|commit| index.files_of(commit))
        .filter(|files| (2..=config.max_files_per_commit).contains(&files.len()))
        .flat_map(|files| files.iter().map(String::as_str))
        .collect()
}
